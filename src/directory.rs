//! Shared user/channel registry
//!
//! The Directory is the single source of truth for who is online and who is
//! in which channel. All state sits behind one `RwLock`: every mutation,
//! including multi-step ones like join (check channel, update two relations),
//! runs under a single write-lock acquisition, and read-only queries share
//! the read lock.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::channel::Channel;
use crate::error::ChatError;
use crate::mailbox::Mailbox;
use crate::types::SessionId;

/// Directory record of a registered user
#[derive(Debug)]
struct UserEntry {
    session_id: SessionId,
    mailbox: Mailbox,
    /// Joined channels in join order; mirror of the channel member lists
    channels: Vec<String>,
}

#[derive(Debug, Default)]
struct Registry {
    /// All online users: username -> entry
    users: HashMap<String, UserEntry>,
    /// All channels: name -> channel, kept sorted for listing
    channels: BTreeMap<String, Channel>,
}

/// Process-wide registry of users and channels
#[derive(Debug, Default)]
pub struct Directory {
    inner: RwLock<Registry>,
}

impl Directory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a username with its mailbox
    ///
    /// The existence check and the insert happen under one write lock, so
    /// concurrent attempts for the same name see exactly one success.
    pub async fn register(&self, name: &str, mailbox: Mailbox) -> Result<SessionId, ChatError> {
        let mut reg = self.inner.write().await;
        if reg.users.contains_key(name) {
            return Err(ChatError::UserAlreadyExists(name.to_string()));
        }

        let session_id = SessionId::new();
        reg.users.insert(
            name.to_string(),
            UserEntry {
                session_id,
                mailbox,
                channels: Vec::new(),
            },
        );
        info!("User '{}' registered (session {})", name, session_id);
        debug!(
            "Total users: {}, Total channels: {}",
            reg.users.len(),
            reg.channels.len()
        );
        Ok(session_id)
    }

    /// Remove a user and purge it from every channel it joined
    ///
    /// Only the session that registered the name can remove it; returns
    /// false if the name is free or now held by another session.
    pub async fn unregister(&self, name: &str, session_id: SessionId) -> bool {
        let mut reg = self.inner.write().await;
        match reg.users.get(name) {
            Some(entry) if entry.session_id == session_id => {}
            _ => return false,
        }
        let Some(entry) = reg.users.remove(name) else {
            return false;
        };

        for channel_name in &entry.channels {
            if let Some(channel) = reg.channels.get_mut(channel_name) {
                channel.remove_member(name);
            }
        }

        info!("User '{}' unregistered (session {})", name, entry.session_id);
        true
    }

    /// Create a new, empty channel
    pub async fn create_channel(&self, name: &str) -> Result<(), ChatError> {
        let mut reg = self.inner.write().await;
        if reg.channels.contains_key(name) {
            return Err(ChatError::ChannelAlreadyExists(name.to_string()));
        }
        reg.channels.insert(name.to_string(), Channel::new(name));
        info!("Channel '{}' created", name);
        Ok(())
    }

    /// Add a user to a channel
    ///
    /// Updates the channel's member list and the user's joined set together.
    pub async fn join(&self, name: &str, channel_name: &str) -> Result<(), ChatError> {
        let mut reg = self.inner.write().await;
        let Registry { users, channels } = &mut *reg;

        let entry = users
            .get_mut(name)
            .ok_or_else(|| ChatError::UserNotFound(name.to_string()))?;
        let channel = channels
            .get_mut(channel_name)
            .ok_or_else(|| ChatError::ChannelNotFound(channel_name.to_string()))?;

        if !channel.add_member(name) {
            return Err(ChatError::AlreadyJoined(channel_name.to_string()));
        }
        entry.channels.push(channel_name.to_string());

        debug!("User '{}' joined channel '{}'", name, channel_name);
        Ok(())
    }

    /// Remove a user from a channel; inverse of [`Directory::join`]
    pub async fn leave(&self, name: &str, channel_name: &str) -> Result<(), ChatError> {
        let mut reg = self.inner.write().await;
        let Registry { users, channels } = &mut *reg;

        let channel = channels
            .get_mut(channel_name)
            .ok_or_else(|| ChatError::ChannelNotFound(channel_name.to_string()))?;

        if !channel.remove_member(name) {
            return Err(ChatError::NotMember(channel_name.to_string()));
        }
        if let Some(entry) = users.get_mut(name) {
            entry.channels.retain(|c| c != channel_name);
        }

        debug!("User '{}' left channel '{}'", name, channel_name);
        Ok(())
    }

    /// Look up a user's mailbox
    pub async fn lookup_user(&self, name: &str) -> Option<Mailbox> {
        self.inner
            .read()
            .await
            .users
            .get(name)
            .map(|entry| entry.mailbox.clone())
    }

    /// Snapshot of a channel (name and members)
    pub async fn lookup_channel(&self, name: &str) -> Option<Channel> {
        self.inner.read().await.channels.get(name).cloned()
    }

    /// Check whether a channel exists
    pub async fn has_channel(&self, name: &str) -> bool {
        self.inner.read().await.channels.contains_key(name)
    }

    /// All online usernames, sorted
    pub async fn list_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.inner.read().await.users.keys().cloned().collect();
        users.sort();
        users
    }

    /// All channel names, sorted
    pub async fn list_channels(&self) -> Vec<String> {
        self.inner.read().await.channels.keys().cloned().collect()
    }

    /// Channels a user has joined, in join order
    pub async fn user_channels(&self, name: &str) -> Option<Vec<String>> {
        self.inner
            .read()
            .await
            .users
            .get(name)
            .map(|entry| entry.channels.clone())
    }

    /// Number of online users and of channels
    pub async fn counts(&self) -> (usize, usize) {
        let reg = self.inner.read().await;
        (reg.users.len(), reg.channels.len())
    }

    /// Mailboxes of every registered user, for broadcast
    pub async fn all_mailboxes(&self) -> Vec<(String, Mailbox)> {
        self.inner
            .read()
            .await
            .users
            .iter()
            .map(|(name, entry)| (name.clone(), entry.mailbox.clone()))
            .collect()
    }

    /// Mailboxes of a channel's members at this moment
    ///
    /// Returns None if the channel does not exist.
    pub async fn channel_mailboxes(&self, channel_name: &str) -> Option<Vec<(String, Mailbox)>> {
        let reg = self.inner.read().await;
        let channel = reg.channels.get(channel_name)?;
        Some(
            channel
                .members()
                .iter()
                .filter_map(|member| {
                    reg.users
                        .get(member)
                        .map(|entry| (member.clone(), entry.mailbox.clone()))
                })
                .collect(),
        )
    }
}

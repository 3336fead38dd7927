//! Message routing
//!
//! Resolves a send target into mailboxes and enqueues one formatted record
//! into each. Enqueueing never waits: a full or closed mailbox is logged
//! and skipped so one stuck recipient cannot hold up the rest.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::directory::Directory;
use crate::error::ChatError;
use crate::mailbox::Mailbox;
use crate::message::Record;
use crate::stats::Stats;
use crate::types::Origin;

/// Routes messages from sessions and the control plane into mailboxes
#[derive(Debug, Clone)]
pub struct Router {
    directory: Arc<Directory>,
    stats: Arc<Stats>,
}

impl Router {
    pub fn new(directory: Arc<Directory>, stats: Arc<Stats>) -> Self {
        Self { directory, stats }
    }

    /// Send to every registered session, the sender included
    ///
    /// Returns the number of mailboxes that accepted the record.
    pub async fn send_to_all(&self, origin: &Origin, body: &str) -> usize {
        let record = Record::new(origin, None, body);
        let recipients = self.directory.all_mailboxes().await;
        let delivered = fan_out(&record, recipients, None);

        self.stats.record_message();
        debug!("Message sent to all ({} recipients): {}", delivered, record.line);
        delivered
    }

    /// Send to the members of a channel as of this call
    ///
    /// The sending user is not delivered its own record. Returns the
    /// number of mailboxes that accepted the record.
    pub async fn send_to_channel(
        &self,
        origin: &Origin,
        body: &str,
        channel: &str,
    ) -> Result<usize, ChatError> {
        let recipients = self
            .directory
            .channel_mailboxes(channel)
            .await
            .ok_or_else(|| ChatError::ChannelNotFound(channel.to_string()))?;

        let record = Record::new(origin, Some(channel), body);
        let delivered = fan_out(&record, recipients, origin.username());

        self.stats.record_message();
        debug!(
            "Message sent to channel '{}' ({} recipients): {}",
            channel, delivered, record.line
        );
        Ok(delivered)
    }

    /// Send to exactly one user
    pub async fn send_to_user(
        &self,
        origin: &Origin,
        body: &str,
        username: &str,
    ) -> Result<(), ChatError> {
        let mailbox = self
            .directory
            .lookup_user(username)
            .await
            .ok_or_else(|| ChatError::UserNotFound(username.to_string()))?;

        let record = Record::new(origin, None, body);
        enqueue(username, &mailbox, record.clone());

        self.stats.record_message();
        debug!("Message sent to user '{}': {}", username, record.line);
        Ok(())
    }
}

/// Enqueue into every recipient except `skip`; returns accepted count
fn fan_out(record: &Record, recipients: Vec<(String, Mailbox)>, skip: Option<&str>) -> usize {
    recipients
        .iter()
        .filter(|(name, _)| Some(name.as_str()) != skip)
        .filter(|(name, mailbox)| enqueue(name, mailbox, record.clone()))
        .count()
}

fn enqueue(name: &str, mailbox: &Mailbox, record: Record) -> bool {
    match mailbox.deliver(record) {
        Ok(()) => true,
        Err(e) => {
            warn!("Skipping delivery to '{}': {}", name, e);
            false
        }
    }
}

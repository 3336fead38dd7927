//! Channel struct definition
//!
//! Represents a named chat channel and its member list.

/// Named chat channel
///
/// Members are stored by username only; the Directory owns the users and
/// keeps this list consistent with each user's joined-channel set.
/// A channel outlives its members and is never deleted automatically.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Channel name (unique key)
    pub name: String,
    /// Member usernames in join order
    members: Vec<String>,
}

impl Channel {
    /// Create a new, empty channel
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Check if a user is a member
    pub fn contains(&self, username: &str) -> bool {
        self.members.iter().any(|m| m == username)
    }

    /// Add a member
    ///
    /// Returns false if the user was already a member.
    pub fn add_member(&mut self, username: &str) -> bool {
        if self.contains(username) {
            return false;
        }
        self.members.push(username.to_string());
        true
    }

    /// Remove a member
    ///
    /// Returns false if the user was not a member.
    pub fn remove_member(&mut self, username: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != username);
        self.members.len() != before
    }

    /// Member usernames in join order
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Check if the channel has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

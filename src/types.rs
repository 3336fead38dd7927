//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `SessionId`: UUID-based unique session identifier
//! - `Origin`: who a routed message comes from

use uuid::Uuid;

use crate::error::ChatError;

/// Sender label used for messages injected through the control plane
pub const CONTROL_LABEL: &str = "http";

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4 so log lines from the reader and drainer tasks of
/// one connection can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Originator of a routed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A registered chat user
    User(String),
    /// The control plane
    Control,
}

impl Origin {
    /// Label written into the record's sender field
    pub fn label(&self) -> &str {
        match self {
            Origin::User(name) => name.as_str(),
            Origin::Control => CONTROL_LABEL,
        }
    }

    /// Username of the sender, if the message comes from a session
    pub fn username(&self) -> Option<&str> {
        match self {
            Origin::User(name) => Some(name.as_str()),
            Origin::Control => None,
        }
    }
}

/// Check a username or channel name typed by a client.
///
/// Names are trimmed, must be non-empty and may not contain the record
/// field separator `|`.
pub fn validate_name(name: &str) -> Result<&str, ChatError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChatError::InvalidName("name cannot be empty".to_string()));
    }
    if name.contains('|') {
        return Err(ChatError::InvalidName(format!("'{}' contains '|'", name)));
    }
    Ok(name)
}

/// Check a username; the control-plane label is reserved.
pub fn validate_username(name: &str) -> Result<&str, ChatError> {
    let name = validate_name(name)?;
    if name == CONTROL_LABEL {
        return Err(ChatError::InvalidName(format!("'{}' is reserved", name)));
    }
    Ok(name)
}

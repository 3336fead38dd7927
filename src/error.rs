//! Error types for the chat server
//!
//! Defines session-level errors and mailbox delivery errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Session and service errors
///
/// Covers both fatal errors (connection termination) and
/// user errors (reported back to the invoking session).
#[derive(Debug, Error)]
pub enum ChatError {
    /// IO error (fatal for the session, or the listener)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the connection
    #[error("connection closed by peer")]
    Disconnected,

    /// Peer sent a line longer than the session accepts
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Line started with `/` but matched no known command
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Channel does not exist
    #[error("channel does not exist: {0}")]
    ChannelNotFound(String),

    /// User is not online
    #[error("user does not exist: {0}")]
    UserNotFound(String),

    /// Username already registered
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    /// Channel name already taken
    #[error("channel already exists: {0}")]
    ChannelAlreadyExists(String),

    /// Session is already a member of the channel
    #[error("already in channel: {0}")]
    AlreadyJoined(String),

    /// Session is not a member of the channel
    #[error("not in channel: {0}")]
    NotMember(String),

    /// User is not on the ignore list
    #[error("user is not ignored: {0}")]
    NotIgnored(String),

    /// Empty or reserved username / channel name
    #[error("invalid name: {0}")]
    InvalidName(String),
}

impl ChatError {
    /// Whether this error is caused by user input and should be reported
    /// back to the session instead of terminating it.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            ChatError::Io(_)
                | ChatError::Disconnected
                | ChatError::LineTooLong(_)
                | ChatError::Config(_)
        )
    }
}

/// Mailbox delivery errors
///
/// Occurs when a record cannot be enqueued without blocking.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The mailbox is at capacity
    #[error("mailbox full")]
    Full,
    /// The receiving session has gone away
    #[error("mailbox closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_not_fatal() {
        assert!(ChatError::UnknownCommand("/foo".into()).is_user_error());
        assert!(ChatError::ChannelNotFound("x".into()).is_user_error());
        assert!(ChatError::NotIgnored("x".into()).is_user_error());
        assert!(!ChatError::Disconnected.is_user_error());
        assert!(!ChatError::LineTooLong(8).is_user_error());
        assert!(!ChatError::Io(std::io::Error::other("boom")).is_user_error());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ChatError::ChannelAlreadyExists("foochannel".into()).to_string(),
            "channel already exists: foochannel"
        );
        assert_eq!(DeliveryError::Full.to_string(), "mailbox full");
    }
}

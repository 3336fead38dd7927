//! Command protocol
//!
//! Turns an input line into either a chat line or a tagged [`Command`].
//! The command set is a fixed table; the same table drives parsing and
//! the help menu.

use crate::error::ChatError;
use crate::message::{listing, BANNER_HELP};

/// Marker that starts a command line
pub const COMMAND_MARKER: char = '/';

/// Client command, one variant per protocol token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ListChannels,
    ListUsers,
    Create,
    Join,
    Leave,
    IgnoreUser,
    UnignoreUser,
    PrivateMessage,
    SendChannel,
    ListMyChannels,
    Help,
}

/// Entry of the command table
pub struct CommandSpec {
    pub token: &'static str,
    pub command: Command,
    pub description: &'static str,
}

/// Every command the server understands, in help-menu order
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        token: "/quit",
        command: Command::Quit,
        description: "quit chat",
    },
    CommandSpec {
        token: "/listchannels",
        command: Command::ListChannels,
        description: "list all channels",
    },
    CommandSpec {
        token: "/listusers",
        command: Command::ListUsers,
        description: "list all active users",
    },
    CommandSpec {
        token: "/create",
        command: Command::Create,
        description: "create a new channel",
    },
    CommandSpec {
        token: "/join",
        command: Command::Join,
        description: "join a channel",
    },
    CommandSpec {
        token: "/leave",
        command: Command::Leave,
        description: "leave a channel",
    },
    CommandSpec {
        token: "/ignoreuser",
        command: Command::IgnoreUser,
        description: "ignore messages from a user",
    },
    CommandSpec {
        token: "/unignoreuser",
        command: Command::UnignoreUser,
        description: "receive messages from ignored user",
    },
    CommandSpec {
        token: "/pm",
        command: Command::PrivateMessage,
        description: "send private message to user",
    },
    CommandSpec {
        token: "/sendchannel",
        command: Command::SendChannel,
        description: "send message into channel",
    },
    CommandSpec {
        token: "/listmychannels",
        command: Command::ListMyChannels,
        description: "list channels you're subscribed to",
    },
    CommandSpec {
        token: "/help",
        command: Command::Help,
        description: "display help menu",
    },
];

/// A classified input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Blank line; ignored
    Empty,
    /// Plain text to broadcast
    Chat(String),
    /// A known command
    Command(Command),
}

impl Command {
    /// Parse a command token such as `/join`
    pub fn parse(token: &str) -> Result<Self, ChatError> {
        let token = token.trim();
        COMMANDS
            .iter()
            .find(|entry| entry.token == token)
            .map(|entry| entry.command)
            .ok_or_else(|| ChatError::UnknownCommand(token.to_string()))
    }

    /// Protocol token of this command
    pub fn token(self) -> &'static str {
        COMMANDS
            .iter()
            .find(|entry| entry.command == self)
            .map(|entry| entry.token)
            .unwrap_or("/help")
    }
}

/// Classify one input line
///
/// Lines starting with the command marker must name a known command;
/// anything else non-blank is chat.
pub fn parse_input(line: &str) -> Result<Input, ChatError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Input::Empty);
    }
    if trimmed.starts_with(COMMAND_MARKER) {
        return Command::parse(trimmed).map(Input::Command);
    }
    Ok(Input::Chat(trimmed.to_string()))
}

/// Render the help menu
pub fn help_menu() -> String {
    listing(
        BANNER_HELP,
        COMMANDS
            .iter()
            .map(|entry| format!("{} | {}", entry.token, entry.description)),
    )
}

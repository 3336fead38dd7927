//! Message definitions
//!
//! Routed chat records and the fixed text of the line protocol
//! (prompts, banners, status lines).

use chrono::{DateTime, Local};

use crate::types::Origin;

/// Timestamp layout of every routed record (day/month/year)
pub const TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Closing banner shared by every listing
pub const BANNER_END: &str = "/**************************************/";
pub const BANNER_CHANNELS: &str = "/**************Channels****************/";
pub const BANNER_USERS: &str = "/****************Users*****************/";
pub const BANNER_MY_CHANNELS: &str = "/************My Channels***************/";
pub const BANNER_HELP: &str = "/**************Help Menu***************/";

pub const PROMPT_USERNAME: &str = "Enter username: ";
pub const PROMPT_NEW_CHANNEL: &str = "Enter new channel name: ";
pub const PROMPT_JOIN: &str = "Enter channel name to join: ";
pub const PROMPT_LEAVE: &str = "Enter channel to leave: ";
pub const PROMPT_IGNORE: &str = "Enter user to ignore: ";
pub const PROMPT_UNIGNORE: &str = "Enter user to unignore: ";
pub const PROMPT_PM_USER: &str = "Enter user to send pm to: ";
pub const PROMPT_SEND_CHANNEL: &str = "Enter channel to send message to: ";
pub const PROMPT_MESSAGE: &str = "Enter message: ";

pub const USERNAME_TAKEN: &str = "user already exists, please pick another user name";
pub const WELCOME: &str = "Welcome to the chat service";
pub const FAREWELL: &str =
    "You have quit the chat. Escape character is '^]', then enter 'close' to exit telnet";

/// A formatted message waiting in a mailbox
///
/// `sender` is kept next to the rendered line so the drainer can apply
/// the ignore list without re-parsing the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Sender label (username or the control-plane label)
    pub sender: String,
    /// Rendered `timestamp|sender|[channel|]body` line, without newline
    pub line: String,
}

impl Record {
    /// Build a record stamped with the current local time
    pub fn new(origin: &Origin, channel: Option<&str>, body: &str) -> Self {
        Self::at(Local::now(), origin, channel, body)
    }

    /// Build a record with an explicit timestamp
    pub fn at(time: DateTime<Local>, origin: &Origin, channel: Option<&str>, body: &str) -> Self {
        let stamp = time.format(TIME_FORMAT);
        let sender = origin.label();
        let line = match channel {
            Some(channel) => format!("{}|{}|{}|{}", stamp, sender, channel, body),
            None => format!("{}|{}|{}", stamp, sender, body),
        };
        Self {
            sender: sender.to_string(),
            line,
        }
    }
}

/// Render a titled listing framed by banner lines, one entry per line
pub fn listing<I, S>(banner: &str, entries: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    out.push_str(banner);
    out.push('\n');
    for entry in entries {
        out.push_str(entry.as_ref());
        out.push('\n');
    }
    out.push_str(BANNER_END);
    out.push('\n');
    out
}

//! Line-oriented TCP Chat Server Library
//!
//! A telnet-friendly chat server: clients register a unique username,
//! create/join/leave channels, and exchange broadcast, channel and private
//! messages. An HTTP control plane injects messages and reports stats.
//!
//! # Architecture
//! - `Directory` is the shared registry of users and channels behind one
//!   reader/writer lock
//! - Each session owns a bounded `Mailbox`; the `Router` enqueues into
//!   mailboxes without ever blocking
//! - Each connection runs two tasks: an input reader/command dispatcher
//!   and a mailbox drainer, stopped by a shared close signal
//!
//! # Example
//! ```ignore
//! use linechat::{ChatServer, ChatService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = ChatServer::bind("127.0.0.1:8181", ChatService::default())
//!         .await
//!         .unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod channel;
pub mod command;
pub mod config;
pub mod control;
pub mod directory;
pub mod error;
pub mod http;
pub mod logging;
pub mod mailbox;
pub mod message;
pub mod router;
pub mod server;
pub mod service;
pub mod session;
pub mod stats;
pub mod types;

// Re-export main types for convenience
pub use channel::Channel;
pub use command::{parse_input, Command, Input};
pub use config::Config;
pub use control::{ControlPlane, InjectOutcome, InjectRequest, StatsSnapshot};
pub use directory::Directory;
pub use error::{ChatError, DeliveryError};
pub use mailbox::{mailbox, Mailbox, MailboxReceiver};
pub use message::Record;
pub use router::Router;
pub use server::{handle_connection, ChatServer};
pub use service::ChatService;
pub use session::run_session;
pub use stats::Stats;
pub use types::{Origin, SessionId};

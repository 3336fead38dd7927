//! Runtime configuration
//!
//! Read from environment variables, then an optional `config.env` file,
//! falling back to defaults.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::ChatError;
use crate::mailbox::DEFAULT_MAILBOX_CAPACITY;

/// Dotenv file read by [`Config::from_env`]
pub const CONFIG_FILE: &str = "config.env";

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Chat listener address (`TELNET_IP:TELNET_PORT`)
    pub chat_addr: String,
    /// Control-plane address (`HTTP_IP:HTTP_PORT`)
    pub http_addr: String,
    /// Log file, appended to and served by `/getLogs`
    pub log_file: PathBuf,
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
    /// Records a mailbox holds before enqueues are refused
    pub mailbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat_addr: "127.0.0.1:8181".to_string(),
            http_addr: "127.0.0.1:8080".to_string(),
            log_file: PathBuf::from("chat.log"),
            log_level: "info".to_string(),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl Config {
    /// Load from the process environment and `./config.env`
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_env_file(CONFIG_FILE)
    }

    /// Load from the process environment, filling gaps from a dotenv file
    ///
    /// A missing file is not an error. Variables already set in the
    /// environment win over the file.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let file = read_env_file(path.as_ref())?;
        Self::from_lookup(|key| env::var(key).ok().or_else(|| file.get(key).cloned()))
    }

    /// Load using `lookup` to resolve variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let chat_port = parse_port("TELNET_PORT", &get("TELNET_PORT", "8181"))?;
        let http_port = parse_port("HTTP_PORT", &get("HTTP_PORT", "8080"))?;

        let capacity = get("MAILBOX_CAPACITY", &DEFAULT_MAILBOX_CAPACITY.to_string());
        let mailbox_capacity = match capacity.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(ChatError::Config(format!(
                    "MAILBOX_CAPACITY must be a positive integer, got '{}'",
                    capacity
                )))
            }
        };

        Ok(Self {
            chat_addr: format!("{}:{}", get("TELNET_IP", "127.0.0.1"), chat_port),
            http_addr: format!("{}:{}", get("HTTP_IP", "127.0.0.1"), http_port),
            log_file: PathBuf::from(get("LOG_FILE", "chat.log")),
            log_level: get("LOG_LEVEL", "info"),
            mailbox_capacity,
        })
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ChatError> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => return Err(ChatError::Config(format!("{}: {}", path.display(), e))),
    };
    entries
        .map(|entry| entry.map_err(|e| ChatError::Config(format!("{}: {}", path.display(), e))))
        .collect()
}

fn parse_port(key: &str, value: &str) -> Result<u16, ChatError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| ChatError::Config(format!("{} must be a port number, got '{}'", key, value)))
}

//! Control-plane operations
//!
//! Message injection and statistics for external callers. The HTTP layer
//! in [`crate::http`] is a thin wrapper over these.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ChatError;
use crate::service::ChatService;
use crate::types::Origin;

/// Message injection request
///
/// `channel` takes precedence over `user`; with neither the message is
/// broadcast. Empty strings count as unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InjectRequest {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Outcome of a message injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    Delivered,
    ChannelNotFound,
    UserNotFound,
}

/// Aggregate statistics
///
/// Field order matches the JSON served at `/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub channels: usize,
    pub messages_sent: u64,
    pub users: usize,
}

/// Control-plane entry point over the shared chat state
#[derive(Debug, Clone)]
pub struct ControlPlane {
    service: ChatService,
    log_file: PathBuf,
}

impl ControlPlane {
    pub fn new(service: ChatService, log_file: impl Into<PathBuf>) -> Self {
        Self {
            service,
            log_file: log_file.into(),
        }
    }

    /// Route a message on behalf of the control plane
    ///
    /// Missing targets are reported as an outcome; any other routing error
    /// is returned.
    pub async fn inject_message(&self, request: &InjectRequest) -> Result<InjectOutcome, ChatError> {
        let router = self.service.router();
        let origin = Origin::Control;

        let result = if let Some(channel) = non_empty(&request.channel) {
            router
                .send_to_channel(&origin, &request.message, channel)
                .await
                .map(|_| ())
        } else if let Some(user) = non_empty(&request.user) {
            router.send_to_user(&origin, &request.message, user).await
        } else {
            router.send_to_all(&origin, &request.message).await;
            Ok(())
        };

        match result {
            Ok(()) => {
                info!("Control plane message submitted");
                Ok(InjectOutcome::Delivered)
            }
            Err(ChatError::ChannelNotFound(_)) => Ok(InjectOutcome::ChannelNotFound),
            Err(ChatError::UserNotFound(_)) => Ok(InjectOutcome::UserNotFound),
            Err(e) => Err(e),
        }
    }

    /// Current user, channel and message counts
    pub async fn read_stats(&self) -> StatsSnapshot {
        let (users, channels) = self.service.directory().counts().await;
        StatsSnapshot {
            channels,
            messages_sent: self.service.stats().messages_sent(),
            users,
        }
    }

    /// Raw contents of the service log file
    pub async fn read_recent_log(&self) -> Result<Vec<u8>, ChatError> {
        Ok(tokio::fs::read(&self.log_file).await?)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

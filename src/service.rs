//! Shared chat state handed to every session and to the control plane

use std::sync::Arc;

use crate::directory::Directory;
use crate::mailbox::DEFAULT_MAILBOX_CAPACITY;
use crate::router::Router;
use crate::stats::Stats;

/// Handle to the process-wide chat state
///
/// Cloning is cheap; all clones see the same Directory and counter.
#[derive(Debug, Clone)]
pub struct ChatService {
    directory: Arc<Directory>,
    stats: Arc<Stats>,
    router: Router,
    mailbox_capacity: usize,
}

impl ChatService {
    /// Create a service whose sessions get mailboxes of `mailbox_capacity` records
    pub fn new(mailbox_capacity: usize) -> Self {
        let directory = Arc::new(Directory::new());
        let stats = Arc::new(Stats::new());
        let router = Router::new(directory.clone(), stats.clone());
        Self {
            directory,
            stats,
            router,
            mailbox_capacity: mailbox_capacity.max(1),
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity
    }
}

impl Default for ChatService {
    fn default() -> Self {
        Self::new(DEFAULT_MAILBOX_CAPACITY)
    }
}

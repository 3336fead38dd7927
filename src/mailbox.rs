//! Per-session mailbox
//!
//! A bounded queue of formatted records. Any session or the control plane
//! may enqueue; only the owning session's drainer dequeues.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::DeliveryError;
use crate::message::Record;

/// Default number of records a mailbox holds before enqueues are refused
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Producer handle of a session's mailbox
///
/// Cheap to clone; the Directory stores one per registered user.
#[derive(Debug, Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Record>,
}

/// Consumer side of a mailbox, owned by the session's drainer
#[derive(Debug)]
pub struct MailboxReceiver {
    receiver: mpsc::Receiver<Record>,
}

/// Create a mailbox holding at most `capacity` records
pub fn mailbox(capacity: usize) -> (Mailbox, MailboxReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (Mailbox { sender }, MailboxReceiver { receiver })
}

impl Mailbox {
    /// Enqueue a record without waiting
    ///
    /// Returns an error if the mailbox is full or its session has gone away.
    pub fn deliver(&self, record: Record) -> Result<(), DeliveryError> {
        self.sender.try_send(record).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Check if the receiving side has been dropped or closed
    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl MailboxReceiver {
    /// Wait for the next record, in enqueue order
    ///
    /// Returns None once the mailbox is closed and empty.
    pub async fn next(&mut self) -> Option<Record> {
        self.receiver.recv().await
    }

    /// Take a record if one is queued
    pub fn try_next(&mut self) -> Option<Record> {
        self.receiver.try_recv().ok()
    }

    /// Refuse further records
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

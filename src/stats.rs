//! Delivered-message counter
//!
//! Kept apart from the Directory lock so the hot send path never contends
//! with registry mutations.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide count of routed messages; only ever increases
#[derive(Debug, Default)]
pub struct Stats {
    messages_sent: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one successfully routed message
    pub fn record_message(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Current count
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_counter_starts_at_zero() {
        let stats = Stats::new();
        assert_eq!(stats.messages_sent(), 0);
        stats.record_message();
        assert_eq!(stats.messages_sent(), 1);
    }

    #[test]
    fn test_concurrent_increments() {
        let stats = Arc::new(Stats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_message();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.messages_sent(), 8000);
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Tracks message traffic and match counts for one pipeline run
#[derive(Debug, Clone)]
pub struct RunMetrics {
    lines_sent: Arc<AtomicU64>,
    oversized_skipped: Arc<AtomicU64>,
    messages_received: Arc<AtomicU64>,
    matches_received: Arc<AtomicU64>,
}

impl RunMetrics {
    /// Creates a new RunMetrics instance
    pub fn new() -> Self {
        Self {
            lines_sent: Arc::new(AtomicU64::new(0)),
            oversized_skipped: Arc::new(AtomicU64::new(0)),
            messages_received: Arc::new(AtomicU64::new(0)),
            matches_received: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records one line pushed through the downstream channel
    pub fn record_line_sent(&self) {
        self.lines_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one line skipped because it did not fit the slot
    pub fn record_oversized(&self) {
        self.oversized_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one message pulled out of the downstream channel
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one match received through the upstream channel
    pub fn record_match_received(&self) {
        self.matches_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets current traffic statistics
    pub fn get_stats(&self) -> RunStats {
        RunStats {
            lines_sent: self.lines_sent.load(Ordering::Relaxed),
            oversized_skipped: self.oversized_skipped.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            matches_received: self.matches_received.load(Ordering::Relaxed),
        }
    }

    /// Logs current traffic statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Mailbox traffic stats:\n\
             Lines sent: {}\n\
             Oversized skipped: {}\n\
             Messages received: {}\n\
             Matches received: {}",
            stats.lines_sent,
            stats.oversized_skipped,
            stats.messages_received,
            stats.matches_received
        );
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about mailbox traffic
#[derive(Debug, Clone, Copy)]
pub struct RunStats {
    pub lines_sent: u64,
    pub oversized_skipped: u64,
    pub messages_received: u64,
    pub matches_received: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traffic_tracking() {
        let metrics = RunMetrics::new();

        metrics.record_line_sent();
        metrics.record_line_sent();
        metrics.record_oversized();
        metrics.record_message_received();
        metrics.record_match_received();

        let stats = metrics.get_stats();
        assert_eq!(stats.lines_sent, 2);
        assert_eq!(stats.oversized_skipped, 1);
        assert_eq!(stats.messages_received, 1);
        assert_eq!(stats.matches_received, 1);
    }

    #[test]
    fn test_clone_shares_counters() {
        let metrics = RunMetrics::new();
        let clone = metrics.clone();

        metrics.record_line_sent();
        clone.record_line_sent();

        assert_eq!(metrics.get_stats().lines_sent, 2);
        assert_eq!(clone.get_stats().lines_sent, 2);
    }
}

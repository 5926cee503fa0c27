//! User-visible status log
//!
//! A bounded, thread-safe record of what the updater did. Every entry is
//! also forwarded to `tracing`, so a headless run keeps the same history in
//! its log output.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::traits::StatusSink;

/// One line of the status log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// When the entry was recorded
    pub timestamp: DateTime<Local>,
    /// What happened
    pub message: String,
    /// Success/failure indicator
    pub success: bool,
}

impl StatusEntry {
    /// Format as `[HH:MM:SS] message`
    pub fn render_line(&self) -> String {
        format!("[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Bounded in-memory status log
///
/// Oldest entries are evicted once `capacity` is reached.
#[derive(Debug)]
pub struct StatusLog {
    entries: Mutex<VecDeque<StatusEntry>>,
    capacity: usize,
}

impl StatusLog {
    /// Create a log keeping at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Snapshot of the current entries, oldest first
    pub fn entries(&self) -> Vec<StatusEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Most recent entry
    pub fn last(&self) -> Option<StatusEntry> {
        self.lock().back().cloned()
    }

    /// Number of entries held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<StatusEntry>> {
        // A panic while holding the lock cannot leave the deque half-written
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new(200)
    }
}

impl StatusSink for StatusLog {
    fn record(&self, message: &str, success: bool) {
        if success {
            tracing::info!(target: "duckdns::status", "{}", message);
        } else {
            tracing::warn!(target: "duckdns::status", "{}", message);
        }

        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(StatusEntry {
            timestamp: Local::now(),
            message: message.to_string(),
            success,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let log = StatusLog::new(10);
        assert!(log.is_empty());

        log.record("update succeeded: OK", true);
        log.record("update failed: KO", false);

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].success);
        assert!(!entries[1].success);
        assert_eq!(log.last().unwrap().message, "update failed: KO");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = StatusLog::new(2);
        log.record("one", true);
        log.record("two", true);
        log.record("three", true);

        let messages: Vec<_> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_render_line() {
        let log = StatusLog::new(1);
        log.record("settings saved", true);

        let line = log.last().unwrap().render_line();
        assert!(line.starts_with('['));
        assert!(line.ends_with("] settings saved"));
        // "[HH:MM:SS] " prefix
        assert_eq!(line.find(']'), Some(9));
    }
}

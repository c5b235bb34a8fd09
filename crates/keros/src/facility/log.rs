//! Rolling system-message log

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// One line in the terminal's system-message panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SystemMessage {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

/// Append-only log that keeps only the most recent `capacity` entries
#[derive(Debug, Clone)]
pub struct RollingLog {
    entries: VecDeque<SystemMessage>,
    capacity: usize,
    next_id: u64,
}

impl RollingLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            next_id: 1,
        }
    }

    /// Append an entry stamped now, dropping the oldest entries beyond capacity
    pub fn append(&mut self, message: impl Into<String>, severity: Severity) -> SystemMessage {
        self.append_at(message, severity, Utc::now())
    }

    pub fn append_at(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        timestamp: DateTime<Utc>,
    ) -> SystemMessage {
        let entry = SystemMessage {
            id: self.next_id,
            timestamp,
            message: message.into(),
            severity,
        };
        self.next_id += 1;

        self.entries.push_back(entry.clone());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        entry
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &SystemMessage> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_capacity_and_keeps_latest() {
        let mut log = RollingLog::new(8);
        for i in 0..50 {
            log.append(format!("entry {i}"), Severity::Info);
            assert!(log.len() <= 8);
        }

        let kept: Vec<_> = log.entries().map(|e| e.message.clone()).collect();
        let expected: Vec<_> = (42..50).map(|i| format!("entry {i}")).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn test_ids_strictly_increase_across_truncation() {
        let mut log = RollingLog::new(2);
        let ids: Vec<u64> = (0..5).map(|_| log.append("x", Severity::Warning).id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let kept: Vec<u64> = log.entries().map(|e| e.id).collect();
        assert_eq!(kept, vec![4, 5]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut log = RollingLog::new(5);
        log.append("Movement detected in Sector A", Severity::Info);
        log.append("Movement detected in Sector A", Severity::Info);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_severity_wire_format() {
        let mut log = RollingLog::new(1);
        let entry = log.append("Reactor meltdown imminent", Severity::Critical);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["severity"], "CRITICAL");
        assert_eq!(json["id"], 1);
    }
}

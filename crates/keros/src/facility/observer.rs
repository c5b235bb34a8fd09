//! Observer seam between the simulator and whatever renders it
//!
//! The simulator reports what happened through this trait and never reaches
//! for shared state itself.

use chrono::{DateTime, Utc};

use super::alert::EmergencyLevel;
use super::log::SystemMessage;

pub trait FacilityObserver {
    /// A log entry was appended
    fn on_log_entry(&mut self, _entry: &SystemMessage) {}

    /// The emergency level differs from the previous tick's
    fn on_alert_change(&mut self, _previous: EmergencyLevel, _current: EmergencyLevel) {}

    /// A static burst is active until `until`
    fn on_static_burst(&mut self, _until: DateTime<Utc>) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FacilityObserver for NoopObserver {}

/// Observer that records every callback, for tests and diagnostics
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub entries: Vec<SystemMessage>,
    pub alert_changes: Vec<(EmergencyLevel, EmergencyLevel)>,
    pub static_bursts: Vec<DateTime<Utc>>,
}

impl FacilityObserver for RecordingObserver {
    fn on_log_entry(&mut self, entry: &SystemMessage) {
        self.entries.push(entry.clone());
    }

    fn on_alert_change(&mut self, previous: EmergencyLevel, current: EmergencyLevel) {
        self.alert_changes.push((previous, current));
    }

    fn on_static_burst(&mut self, until: DateTime<Utc>) {
        self.static_bursts.push(until);
    }
}

//! Facility Simulation
//!
//! Sectors, the unknown entity, the emergency level and the rolling system
//! log of outpost Upsilon-7, advanced on a fixed tick.

mod alert;
mod entity;
mod error;
mod log;
mod metric;
mod observer;
mod sector;
mod service;
mod simulator;

pub use alert::{
    AlertThresholds, Assessment, EmergencyLevel, MELTDOWN_MESSAGE, OVERHEAT_MESSAGE,
    PROXIMITY_MESSAGE, assess,
};
pub use entity::{EntityModel, GridPosition, MovementPattern, SignatureType, ThreatLevel, UnknownEntity};
pub use error::FacilityError;
pub use log::{RollingLog, Severity, SystemMessage};
pub use metric::{MetricBounds, MetricKind, MetricTable, update_metric};
pub use observer::{FacilityObserver, NoopObserver, RecordingObserver};
pub use sector::{Sector, default_sectors};
pub use service::{FacilityService, SERVICE_ID, SnapshotSlot, events};
pub use simulator::{FacilitySimulator, FacilitySnapshot, LockdownOutcome, TickReport};

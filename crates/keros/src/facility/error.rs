//! Facility errors
//!
//! Ticking never fails. These cover configuration and operator commands.

/// Errors raised while building the simulator or handling a command
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FacilityError {
    #[error("Invalid {table} table: {reason}")]
    InvalidTable { table: &'static str, reason: String },

    #[error("Unknown sector: {0}")]
    UnknownSector(String),

    #[error("Sector {0} has no lockdown control")]
    NoLockdownControl(String),
}

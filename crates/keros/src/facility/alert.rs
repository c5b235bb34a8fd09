//! Facility-wide emergency level
//!
//! The level is recomputed from scratch on every tick. There is no memory of
//! the previous level, no debounce and no cool-down: a reactor that drops
//! below the threshold drops the level on the very next tick.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::entity::GridPosition;
use super::log::Severity;

pub const MELTDOWN_MESSAGE: &str = "Reactor meltdown imminent";
pub const OVERHEAT_MESSAGE: &str = "Reactor temperature exceeding safe levels";
pub const PROXIMITY_MESSAGE: &str = "Unknown entity proximity warning";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergencyLevel {
    #[default]
    Green,
    Yellow,
    Orange,
    Red,
}

impl std::fmt::Display for EmergencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmergencyLevel::Green => write!(f, "GREEN"),
            EmergencyLevel::Yellow => write!(f, "YELLOW"),
            EmergencyLevel::Orange => write!(f, "ORANGE"),
            EmergencyLevel::Red => write!(f, "RED"),
        }
    }
}

/// Threshold configuration for [`assess`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Sector whose temperature drives the reactor rules
    #[serde(default = "default_reactor_sector")]
    pub reactor_sector: String,
    /// Strictly above this: RED
    #[serde(default = "default_critical_temperature")]
    pub critical_temperature: f64,
    /// Strictly above this: ORANGE
    #[serde(default = "default_warning_temperature")]
    pub warning_temperature: f64,
    /// Entity with x and y strictly below this: YELLOW
    #[serde(default = "default_proximity")]
    pub proximity: i32,
}

fn default_reactor_sector() -> String {
    "R".to_string()
}

fn default_critical_temperature() -> f64 {
    150.0
}

fn default_warning_temperature() -> f64 {
    120.0
}

fn default_proximity() -> i32 {
    3
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            reactor_sector: default_reactor_sector(),
            critical_temperature: default_critical_temperature(),
            warning_temperature: default_warning_temperature(),
            proximity: default_proximity(),
        }
    }
}

/// Outcome of one evaluation: the level and the single log line it raises
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub level: EmergencyLevel,
    pub alert: Option<(Severity, &'static str)>,
}

/// Evaluate the rules in precedence order; the first match wins.
///
/// A missing reactor temperature (no reactor sector, or one without a
/// temperature reading) skips the two reactor rules.
pub fn assess(
    reactor_temperature: Option<f64>,
    entity: GridPosition,
    thresholds: &AlertThresholds,
) -> Assessment {
    match reactor_temperature {
        Some(t) if t > thresholds.critical_temperature => Assessment {
            level: EmergencyLevel::Red,
            alert: Some((Severity::Critical, MELTDOWN_MESSAGE)),
        },
        Some(t) if t > thresholds.warning_temperature => Assessment {
            level: EmergencyLevel::Orange,
            alert: Some((Severity::Warning, OVERHEAT_MESSAGE)),
        },
        _ if entity.x < thresholds.proximity && entity.y < thresholds.proximity => Assessment {
            level: EmergencyLevel::Yellow,
            alert: Some((Severity::Warning, PROXIMITY_MESSAGE)),
        },
        _ => Assessment {
            level: EmergencyLevel::Green,
            alert: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> AlertThresholds {
        AlertThresholds::default()
    }

    #[test]
    fn test_meltdown_beats_proximity() {
        let a = assess(Some(160.0), GridPosition::new(0, 0), &t());
        assert_eq!(a.level, EmergencyLevel::Red);
        assert_eq!(a.alert, Some((Severity::Critical, MELTDOWN_MESSAGE)));
    }

    #[test]
    fn test_overheat() {
        let a = assess(Some(130.0), GridPosition::new(5, 5), &t());
        assert_eq!(a.level, EmergencyLevel::Orange);
        assert_eq!(a.alert.map(|(s, _)| s), Some(Severity::Warning));
    }

    #[test]
    fn test_thresholds_are_strict() {
        assert_eq!(assess(Some(150.0), GridPosition::new(5, 5), &t()).level, EmergencyLevel::Orange);
        assert_eq!(assess(Some(120.0), GridPosition::new(5, 5), &t()).level, EmergencyLevel::Green);
        assert_eq!(assess(Some(100.0), GridPosition::new(3, 0), &t()).level, EmergencyLevel::Green);
        assert_eq!(assess(Some(100.0), GridPosition::new(2, 2), &t()).level, EmergencyLevel::Yellow);
    }

    #[test]
    fn test_proximity_when_reactor_nominal() {
        let a = assess(Some(100.0), GridPosition::new(1, 1), &t());
        assert_eq!(a.level, EmergencyLevel::Yellow);
        assert!(a.alert.unwrap().1.contains("proximity"));
    }

    #[test]
    fn test_missing_reactor_reading_falls_through() {
        assert_eq!(assess(None, GridPosition::new(0, 1), &t()).level, EmergencyLevel::Yellow);
        assert_eq!(assess(None, GridPosition::new(8, 8), &t()), Assessment {
            level: EmergencyLevel::Green,
            alert: None,
        });
    }

    #[test]
    fn test_same_inputs_same_result() {
        let first = assess(Some(125.5), GridPosition::new(4, 7), &t());
        let second = assess(Some(125.5), GridPosition::new(4, 7), &t());
        assert_eq!(first, second);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(EmergencyLevel::Green < EmergencyLevel::Yellow);
        assert!(EmergencyLevel::Yellow < EmergencyLevel::Orange);
        assert!(EmergencyLevel::Orange < EmergencyLevel::Red);
        assert_eq!(serde_json::to_string(&EmergencyLevel::Red).unwrap(), "\"RED\"");
    }

    #[test]
    fn test_default_level_is_green() {
        assert_eq!(EmergencyLevel::default(), EmergencyLevel::Green);
    }
}

//! Facility sectors
//!
//! A sector carries only the readings it was created with. Nothing in the
//! simulator ever adds a metric or status field to a sector that lacked it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::metric::MetricKind;

/// A named zone of the facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Sector {
    /// Short stable code, e.g. "R" for the reactor
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub metrics: BTreeMap<MetricKind, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_detected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lockdown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door_status: Option<String>,
}

impl Sector {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            metrics: BTreeMap::new(),
            motion_detected: None,
            lockdown: None,
            weather: None,
            camera_status: None,
            door_status: None,
        }
    }

    pub fn with_metric(mut self, kind: MetricKind, value: f64) -> Self {
        self.metrics.insert(kind, value);
        self
    }

    pub fn metric(&self, kind: MetricKind) -> Option<f64> {
        self.metrics.get(&kind).copied()
    }

    /// Overwrite an existing reading. Returns false, leaving the sector
    /// untouched, when the sector does not carry `kind`.
    pub fn set_metric(&mut self, kind: MetricKind, value: f64) -> bool {
        match self.metrics.get_mut(&kind) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// The Upsilon-7 layout used when no sector table is configured
pub fn default_sectors() -> Vec<Sector> {
    let hallway = |code: &str, name: &str, air: f64, light: f64| {
        let mut sector = Sector::new(code, name)
            .with_metric(MetricKind::AirQuality, air)
            .with_metric(MetricKind::LightingCondition, light);
        sector.motion_detected = Some(false);
        sector
    };

    let mut tower = Sector::new("T", "Radio Tower")
        .with_metric(MetricKind::Interference, 10.0)
        .with_metric(MetricKind::SignalStrength, 80.0);
    tower.weather = Some("Clear".to_string());

    let mut armory = Sector::new("S", "Armory").with_metric(MetricKind::AmmoReserves, 100.0);
    armory.lockdown = Some(false);
    armory.camera_status = Some("Online".to_string());
    armory.door_status = Some("Sealed".to_string());

    vec![
        Sector::new("R", "Reactor Core")
            .with_metric(MetricKind::Temperature, 100.0)
            .with_metric(MetricKind::CoolantPressure, 50.0)
            .with_metric(MetricKind::RadiationLeak, 0.0)
            .with_metric(MetricKind::PowerOutput, 85.0),
        hallway("A", "Main Hallway A", 95.0, 100.0),
        hallway("B", "Main Hallway B", 97.0, 98.0),
        hallway("C", "Main Hallway C", 96.0, 99.0),
        tower,
        Sector::new("H", "Biosphere")
            .with_metric(MetricKind::OxygenLevel, 95.0)
            .with_metric(MetricKind::PlantCondition, 90.0)
            .with_metric(MetricKind::SoilMoisture, 75.0),
        armory,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_metric_never_adds_fields() {
        let mut sector = Sector::new("A", "Hallway").with_metric(MetricKind::AirQuality, 90.0);

        assert!(sector.set_metric(MetricKind::AirQuality, 80.0));
        assert_eq!(sector.metric(MetricKind::AirQuality), Some(80.0));

        assert!(!sector.set_metric(MetricKind::Temperature, 150.0));
        assert_eq!(sector.metric(MetricKind::Temperature), None);
    }

    #[test]
    fn test_default_layout_codes_are_unique() {
        let sectors = default_sectors();
        let mut codes: Vec<_> = sectors.iter().map(|s| s.code.as_str()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), sectors.len());
        assert!(codes.contains(&"R"));
    }

    #[test]
    fn test_absent_fields_are_not_serialized() {
        let sector = Sector::new("H", "Biosphere").with_metric(MetricKind::OxygenLevel, 95.0);
        let json = serde_json::to_value(&sector).unwrap();

        assert_eq!(json["metrics"]["oxygenLevel"], 95.0);
        assert!(json.get("lockdown").is_none());
        assert!(json.get("motionDetected").is_none());
    }

    #[test]
    fn test_sector_table_from_toml() {
        let sector: Sector = toml::from_str(
            r#"
            code = "S"
            name = "Armory"
            lockdown = false
            cameraStatus = "Online"

            [metrics]
            ammoReserves = 100.0
            "#,
        )
        .unwrap();

        assert_eq!(sector.lockdown, Some(false));
        assert_eq!(sector.metric(MetricKind::AmmoReserves), Some(100.0));
        assert_eq!(sector.door_status, None);
    }
}

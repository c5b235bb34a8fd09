//! Bounded metric random walk

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Numeric readings a sector may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    Temperature,
    CoolantPressure,
    RadiationLeak,
    AirQuality,
    LightingCondition,
    Interference,
    SignalStrength,
    OxygenLevel,
    PlantCondition,
    SoilMoisture,
    AmmoReserves,
    PowerOutput,
    Contamination,
}

impl MetricKind {
    pub const ALL: [MetricKind; 13] = [
        MetricKind::Temperature,
        MetricKind::CoolantPressure,
        MetricKind::RadiationLeak,
        MetricKind::AirQuality,
        MetricKind::LightingCondition,
        MetricKind::Interference,
        MetricKind::SignalStrength,
        MetricKind::OxygenLevel,
        MetricKind::PlantCondition,
        MetricKind::SoilMoisture,
        MetricKind::AmmoReserves,
        MetricKind::PowerOutput,
        MetricKind::Contamination,
    ];

    /// Built-in range and per-tick fluctuation
    pub fn default_bounds(self) -> MetricBounds {
        let (max, fluctuation) = match self {
            MetricKind::Temperature => (200.0, 10.0),
            MetricKind::CoolantPressure => (100.0, 5.0),
            MetricKind::RadiationLeak => (100.0, 2.0),
            MetricKind::AirQuality => (100.0, 5.0),
            MetricKind::LightingCondition => (100.0, 3.0),
            MetricKind::Interference => (100.0, 4.0),
            MetricKind::SignalStrength => (100.0, 4.0),
            MetricKind::OxygenLevel => (100.0, 2.0),
            MetricKind::PlantCondition => (100.0, 2.0),
            MetricKind::SoilMoisture => (100.0, 3.0),
            MetricKind::AmmoReserves => (100.0, 1.0),
            MetricKind::PowerOutput => (100.0, 5.0),
            MetricKind::Contamination => (100.0, 2.0),
        };
        MetricBounds {
            min: 0.0,
            max,
            fluctuation,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature",
            MetricKind::CoolantPressure => "coolant pressure",
            MetricKind::RadiationLeak => "radiation leak",
            MetricKind::AirQuality => "air quality",
            MetricKind::LightingCondition => "lighting",
            MetricKind::Interference => "interference",
            MetricKind::SignalStrength => "signal strength",
            MetricKind::OxygenLevel => "oxygen level",
            MetricKind::PlantCondition => "plant condition",
            MetricKind::SoilMoisture => "soil moisture",
            MetricKind::AmmoReserves => "ammo reserves",
            MetricKind::PowerOutput => "power output",
            MetricKind::Contamination => "contamination",
        }
    }
}

/// Inclusive range plus the width of the per-tick random delta
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBounds {
    pub min: f64,
    pub max: f64,
    pub fluctuation: f64,
}

/// Bounds for every metric kind, built-ins overlaid with configured overrides
#[derive(Debug, Clone, Default)]
pub struct MetricTable {
    overrides: BTreeMap<MetricKind, MetricBounds>,
}

impl MetricTable {
    pub fn new(overrides: BTreeMap<MetricKind, MetricBounds>) -> Self {
        Self { overrides }
    }

    pub fn bounds(&self, kind: MetricKind) -> MetricBounds {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_bounds())
    }
}

/// Nudge `current` by a uniform delta in `[-fluct_range/2, +fluct_range/2]`,
/// then clamp into `[min, max]`.
///
/// The lower bound is applied first, so `min > max` yields `max`.
pub fn update_metric<R: Rng>(
    rng: &mut R,
    current: f64,
    min: f64,
    max: f64,
    fluct_range: f64,
) -> f64 {
    let half = fluct_range.abs() / 2.0;
    let delta = if half > 0.0 {
        rng.gen_range(-half..=half)
    } else {
        0.0
    };
    (current + delta).max(min).min(max)
}

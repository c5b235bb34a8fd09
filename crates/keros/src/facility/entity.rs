//! The unknown entity tracker
//!
//! The entity is replaced wholesale on every tick: a new position one step
//! away on each axis, a freshly drawn sector label, and re-rolled
//! classifications with no memory of the previous ones.

use std::collections::BTreeMap;

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::error::FacilityError;
use crate::config::EntityConfig;

/// Integer cell on the facility grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Clamp both axes into `[0, grid_max]`
    pub fn clamped(self, grid_max: i32) -> Self {
        Self {
            x: self.x.max(0).min(grid_max),
            y: self.y.max(0).min(grid_max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementPattern {
    Erratic,
    Hunting,
    Stalking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    Unknown,
    High,
    Extreme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureType {
    Anomalous,
    Biological,
    Unknown,
}

/// The single tracked actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct UnknownEntity {
    pub position: GridPosition,
    pub last_seen_sector: String,
    pub movement_pattern: MovementPattern,
    pub threat_level: ThreatLevel,
    pub signature_type: SignatureType,
}

/// Weighted lookup table over a small enum
#[derive(Debug, Clone)]
struct Table<T> {
    values: Vec<T>,
    dist: WeightedIndex<f64>,
}

impl<T: Copy> Table<T> {
    fn new(
        table: &'static str,
        entries: impl IntoIterator<Item = (T, f64)>,
    ) -> Result<Self, FacilityError> {
        let (values, weights): (Vec<T>, Vec<f64>) = entries.into_iter().unzip();
        let dist = WeightedIndex::new(&weights).map_err(|e| FacilityError::InvalidTable {
            table,
            reason: e.to_string(),
        })?;
        Ok(Self { values, dist })
    }

    fn from_map(table: &'static str, map: &BTreeMap<T, f64>) -> Result<Self, FacilityError>
    where
        T: Ord,
    {
        Self::new(table, map.iter().map(|(k, w)| (*k, *w)))
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> T {
        self.values[self.dist.sample(rng)]
    }
}

/// Movement rules, built once from configuration
#[derive(Debug, Clone)]
pub struct EntityModel {
    grid_max: i32,
    sectors: Vec<String>,
    sector_dist: WeightedIndex<f64>,
    movement: Table<MovementPattern>,
    threat: Table<ThreatLevel>,
    signature: Table<SignatureType>,
}

impl EntityModel {
    /// Validate the weight tables. This is the only fallible step; once built,
    /// advancing the entity cannot fail.
    pub fn new(config: &EntityConfig, grid_max: i32) -> Result<Self, FacilityError> {
        if grid_max < 0 {
            return Err(FacilityError::InvalidTable {
                table: "grid",
                reason: format!("grid_max must be non-negative, got {grid_max}"),
            });
        }

        let sectors: Vec<String> = config.sectors.iter().map(|s| s.code.clone()).collect();
        let weights: Vec<f64> = config.sectors.iter().map(|s| s.weight).collect();
        let sector_dist = WeightedIndex::new(&weights).map_err(|e| FacilityError::InvalidTable {
            table: "entity.sectors",
            reason: e.to_string(),
        })?;

        Ok(Self {
            grid_max,
            sectors,
            sector_dist,
            movement: Table::from_map("entity.movement", &config.movement)?,
            threat: Table::from_map("entity.threat", &config.threat)?,
            signature: Table::from_map("entity.signature", &config.signature)?,
        })
    }

    /// The entity as configured at startup, with its position pulled into the grid
    pub fn initial(&self, config: &EntityConfig) -> UnknownEntity {
        UnknownEntity {
            position: config.start.clamped(self.grid_max),
            last_seen_sector: config.start_sector.clone(),
            movement_pattern: MovementPattern::Erratic,
            threat_level: ThreatLevel::Unknown,
            signature_type: SignatureType::Unknown,
        }
    }

    /// Produce the next entity state from the previous one
    pub fn advance<R: Rng>(&self, rng: &mut R, previous: &UnknownEntity) -> UnknownEntity {
        let step_x = rng.gen_range(-1..=1);
        let step_y = rng.gen_range(-1..=1);
        let position = GridPosition::new(
            previous.position.x.saturating_add(step_x),
            previous.position.y.saturating_add(step_y),
        )
        .clamped(self.grid_max);

        let last_seen_sector = self.sectors[self.sector_dist.sample(rng)].clone();

        UnknownEntity {
            position,
            last_seen_sector,
            movement_pattern: self.movement.sample(rng),
            threat_level: self.threat.sample(rng),
            signature_type: self.signature.sample(rng),
        }
    }
}

//! The facility simulator
//!
//! Owns every piece of mutable facility state and advances it one tick at a
//! time. All side effects leave through a [`FacilityObserver`].

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;

use super::alert::{AlertThresholds, EmergencyLevel, assess};
use super::entity::{EntityModel, UnknownEntity};
use super::error::FacilityError;
use super::log::{RollingLog, Severity, SystemMessage};
use super::metric::{MetricKind, MetricTable, update_metric};
use super::observer::FacilityObserver;
use super::sector::Sector;
use crate::config::FacilityConfig;

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub previous_level: EmergencyLevel,
    pub level: EmergencyLevel,
    /// Entries appended during this tick, oldest first
    pub new_entries: Vec<SystemMessage>,
}

impl TickReport {
    pub fn level_changed(&self) -> bool {
        self.previous_level != self.level
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockdownOutcome {
    Engaged,
    Failed,
}

/// Read-only view handed to the display layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct FacilitySnapshot {
    pub tick: u64,
    pub emergency_level: EmergencyLevel,
    pub sectors: Vec<Sector>,
    pub entity: UnknownEntity,
    pub log: Vec<SystemMessage>,
    /// Whether the static burst is still running at `updated_at`
    pub static_burst: bool,
    pub static_burst_until: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl FacilitySnapshot {
    /// The same snapshot as seen at `now`. The burst flag is derived from
    /// `static_burst_until`, so it clears on its own between ticks.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.static_burst = self.static_burst_until.is_some_and(|until| now < until);
        self
    }
}

pub struct FacilitySimulator {
    sectors: Vec<Sector>,
    entity: UnknownEntity,
    level: EmergencyLevel,
    log: RollingLog,
    metrics: MetricTable,
    entity_model: EntityModel,
    thresholds: AlertThresholds,
    static_burst: chrono::Duration,
    static_burst_until: Option<DateTime<Utc>>,
    motion_probability: f64,
    lockdown_success_rate: f64,
    tick_count: u64,
    rng: StdRng,
}

impl FacilitySimulator {
    /// Build a simulator from configuration. Uses the configured seed if
    /// present, otherwise seeds from the OS.
    pub fn from_config(config: &FacilityConfig) -> Result<Self, FacilityError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: &FacilityConfig, rng: StdRng) -> Result<Self, FacilityError> {
        let entity_model = EntityModel::new(&config.entity, config.grid_max)?;
        let entity = entity_model.initial(&config.entity);

        let static_burst = chrono::Duration::from_std(config.static_burst()).map_err(|e| {
            FacilityError::InvalidTable {
                table: "static_burst_ms",
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            sectors: config.sectors.clone(),
            entity,
            level: EmergencyLevel::Green,
            log: RollingLog::new(config.log_capacity),
            metrics: MetricTable::new(config.metrics.clone()),
            entity_model,
            thresholds: config.thresholds.clone(),
            static_burst,
            static_burst_until: None,
            motion_probability: config.motion_probability.clamp(0.0, 1.0),
            lockdown_success_rate: config.lockdown_success_rate.clamp(0.0, 1.0),
            tick_count: 0,
            rng,
        })
    }

    pub fn level(&self) -> EmergencyLevel {
        self.level
    }

    pub fn entity(&self) -> &UnknownEntity {
        &self.entity
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn sector(&self, code: &str) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.code == code)
    }

    pub fn log(&self) -> &RollingLog {
        &self.log
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Advance the facility by one tick
    pub fn tick(&mut self, observer: &mut dyn FacilityObserver) -> TickReport {
        self.tick_at(Utc::now(), observer)
    }

    pub fn tick_at(&mut self, now: DateTime<Utc>, observer: &mut dyn FacilityObserver) -> TickReport {
        self.tick_count += 1;
        let previous_level = self.level;
        let mut new_entries = Vec::new();

        self.update_metrics();
        self.update_motion_sensors();

        let previous_sector = self.entity.last_seen_sector.clone();
        self.entity = self.entity_model.advance(&mut self.rng, &self.entity);

        if self.entity.last_seen_sector != previous_sector {
            let entry = self.log.append_at(
                format!("Movement detected in Sector {}", self.entity.last_seen_sector),
                Severity::Info,
                now,
            );
            observer.on_log_entry(&entry);
            new_entries.push(entry);

            let until = now + self.static_burst;
            self.static_burst_until = Some(until);
            observer.on_static_burst(until);
        }

        let assessment = assess(
            self.reactor_temperature(),
            self.entity.position,
            &self.thresholds,
        );
        self.level = assessment.level;

        if let Some((severity, message)) = assessment.alert {
            let entry = self.log.append_at(message, severity, now);
            observer.on_log_entry(&entry);
            new_entries.push(entry);
        }

        if self.level != previous_level {
            info!(
                tick = self.tick_count,
                from = %previous_level,
                to = %self.level,
                "Emergency level changed"
            );
            observer.on_alert_change(previous_level, self.level);
        }

        debug!(
            tick = self.tick_count,
            level = %self.level,
            entity_x = self.entity.position.x,
            entity_y = self.entity.position.y,
            sector = %self.entity.last_seen_sector,
            "Facility tick"
        );

        TickReport {
            tick: self.tick_count,
            previous_level,
            level: self.level,
            new_entries,
        }
    }

    fn update_metrics(&mut self) {
        for sector in &mut self.sectors {
            for (kind, value) in sector.metrics.iter_mut() {
                let bounds = self.metrics.bounds(*kind);
                *value = update_metric(
                    &mut self.rng,
                    *value,
                    bounds.min,
                    bounds.max,
                    bounds.fluctuation,
                );
            }
        }
    }

    fn update_motion_sensors(&mut self) {
        for sector in &mut self.sectors {
            if let Some(motion) = sector.motion_detected.as_mut() {
                *motion = self.rng.gen_bool(self.motion_probability);
            }
        }
    }

    fn reactor_temperature(&self) -> Option<f64> {
        self.sector(&self.thresholds.reactor_sector)
            .and_then(|s| s.metric(MetricKind::Temperature))
    }

    /// Attempt to lock a sector down.
    ///
    /// Only sectors that carry a lockdown control can be locked. The attempt
    /// itself may fail; either way the outcome is logged.
    pub fn invoke_lockdown(
        &mut self,
        code: &str,
        observer: &mut dyn FacilityObserver,
    ) -> Result<LockdownOutcome, FacilityError> {
        let index = self
            .sectors
            .iter()
            .position(|s| s.code == code)
            .ok_or_else(|| FacilityError::UnknownSector(code.to_string()))?;

        if self.sectors[index].lockdown.is_none() {
            return Err(FacilityError::NoLockdownControl(code.to_string()));
        }

        let engaged = self.rng.gen_bool(self.lockdown_success_rate);
        let sector = &mut self.sectors[index];

        let (outcome, entry) = if engaged {
            sector.lockdown = Some(true);
            let message = format!("Lockdown engaged in {}", sector.name);
            (LockdownOutcome::Engaged, self.log.append(message, Severity::Warning))
        } else {
            let message = format!("Lockdown failed in {}", sector.name);
            (LockdownOutcome::Failed, self.log.append(message, Severity::Error))
        };

        info!(sector = %code, outcome = ?outcome, "Lockdown invoked");
        observer.on_log_entry(&entry);
        Ok(outcome)
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> FacilitySnapshot {
        FacilitySnapshot {
            tick: self.tick_count,
            emergency_level: self.level,
            sectors: self.sectors.clone(),
            entity: self.entity.clone(),
            log: self.log.entries().cloned().collect(),
            static_burst: self.static_burst_until.is_some_and(|until| now < until),
            static_burst_until: self.static_burst_until,
            updated_at: now,
        }
    }

    #[cfg(test)]
    fn sector_mut(&mut self, code: &str) -> Option<&mut Sector> {
        self.sectors.iter_mut().find(|s| s.code == code)
    }

    #[cfg(test)]
    fn place_entity(&mut self, position: super::entity::GridPosition) {
        self.entity.position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightedSector;
    use crate::facility::entity::GridPosition;
    use crate::facility::metric::MetricBounds;
    use crate::facility::observer::{NoopObserver, RecordingObserver};

    /// A config where nothing drifts, so a tick sees exactly the readings the
    /// test put in place.
    fn frozen_config() -> FacilityConfig {
        let mut config = FacilityConfig::default();
        for kind in MetricKind::ALL {
            let mut bounds = kind.default_bounds();
            bounds.fluctuation = 0.0;
            config.metrics.insert(kind, bounds);
        }
        config
    }

    fn simulator(config: &FacilityConfig, seed: u64) -> FacilitySimulator {
        FacilitySimulator::with_rng(config, StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_meltdown_tick() {
        let config = frozen_config();
        for seed in 0..20 {
            let mut sim = simulator(&config, seed);
            sim.sector_mut("R").unwrap().set_metric(MetricKind::Temperature, 160.0);

            let mut observer = RecordingObserver::default();
            let report = sim.tick(&mut observer);

            assert_eq!(report.level, EmergencyLevel::Red);
            let critical: Vec<_> = report
                .new_entries
                .iter()
                .filter(|e| e.severity == Severity::Critical)
                .collect();
            assert_eq!(critical.len(), 1);
            assert!(critical[0].message.contains("meltdown"));
            // A hot reactor raises exactly one alert entry per tick
            let alerts = report
                .new_entries
                .iter()
                .filter(|e| !e.message.starts_with("Movement"))
                .count();
            assert_eq!(alerts, 1);
            assert_eq!(observer.alert_changes, vec![(EmergencyLevel::Green, EmergencyLevel::Red)]);
        }
    }

    #[test]
    fn test_proximity_tick() {
        let config = frozen_config();
        let mut sim = simulator(&config, 4);
        sim.sector_mut("R").unwrap().set_metric(MetricKind::Temperature, 100.0);
        sim.place_entity(GridPosition::new(1, 1));

        let report = sim.tick(&mut NoopObserver);

        // (1,1) moves at most one cell per axis, so it stays inside x<3, y<3
        assert!(sim.entity().position.x < 3 && sim.entity().position.y < 3);
        assert_eq!(report.level, EmergencyLevel::Yellow);
        let warning = report
            .new_entries
            .iter()
            .find(|e| e.severity == Severity::Warning)
            .unwrap();
        assert!(warning.message.contains("proximity"));
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let mut sim = simulator(&FacilityConfig::default(), 12);
        let before = sim.sectors().to_vec();

        for _ in 0..200 {
            sim.tick(&mut NoopObserver);
        }

        for (old, new) in before.iter().zip(sim.sectors()) {
            let old_keys: Vec<_> = old.metrics.keys().collect();
            let new_keys: Vec<_> = new.metrics.keys().collect();
            assert_eq!(old_keys, new_keys, "sector {}", old.code);
            assert_eq!(old.motion_detected.is_some(), new.motion_detected.is_some());
            assert_eq!(old.lockdown.is_some(), new.lockdown.is_some());
            assert_eq!(old.weather, new.weather);
        }
    }

    #[test]
    fn test_metrics_stay_within_bounds() {
        let config = FacilityConfig::default();
        let table = MetricTable::new(config.metrics.clone());
        let mut sim = simulator(&config, 3);

        for _ in 0..500 {
            sim.tick(&mut NoopObserver);
            for sector in sim.sectors() {
                for (kind, value) in &sector.metrics {
                    let MetricBounds { min, max, .. } = table.bounds(*kind);
                    assert!((min..=max).contains(value), "{} {:?} = {}", sector.code, kind, value);
                }
            }
        }
    }

    #[test]
    fn test_log_never_exceeds_capacity() {
        let mut config = FacilityConfig::default();
        config.log_capacity = 8;
        let mut sim = simulator(&config, 21);

        for _ in 0..300 {
            sim.tick(&mut NoopObserver);
            assert!(sim.log().len() <= 8);
        }
    }

    #[test]
    fn test_identical_inputs_identical_outcome() {
        let mut config = frozen_config();
        // Only sector C can be drawn, so the movement entry never fires after the first tick
        config.entity.sectors = vec![WeightedSector {
            code: "C".into(),
            weight: 1.0,
        }];
        config.entity.start_sector = "C".into();

        let run = |seed: u64| {
            let mut sim = simulator(&config, seed);
            sim.sector_mut("R").unwrap().set_metric(MetricKind::Temperature, 130.0);
            sim.place_entity(GridPosition::new(6, 6));
            let report = sim.tick(&mut NoopObserver);
            let entries: Vec<_> = report
                .new_entries
                .into_iter()
                .map(|e| (e.message, e.severity))
                .collect();
            (report.level, entries)
        };

        let first = run(1);
        let second = run(99);
        assert_eq!(first, second);
        assert_eq!(first.0, EmergencyLevel::Orange);
        assert_eq!(first.1.len(), 1);
    }

    #[test]
    fn test_level_drops_without_cooldown() {
        let config = frozen_config();
        let mut sim = simulator(&config, 8);
        sim.sector_mut("R").unwrap().set_metric(MetricKind::Temperature, 170.0);
        sim.place_entity(GridPosition::new(8, 8));
        assert_eq!(sim.tick(&mut NoopObserver).level, EmergencyLevel::Red);

        sim.sector_mut("R").unwrap().set_metric(MetricKind::Temperature, 100.0);
        sim.place_entity(GridPosition::new(8, 8));
        let report = sim.tick(&mut NoopObserver);
        assert_eq!(report.previous_level, EmergencyLevel::Red);
        assert_eq!(report.level, EmergencyLevel::Green);
    }

    #[test]
    fn test_sector_change_logs_movement_and_bursts() {
        let mut config = frozen_config();
        config.entity.start_sector = "A".into();
        config.entity.sectors = vec![WeightedSector {
            code: "C".into(),
            weight: 1.0,
        }];
        let mut sim = simulator(&config, 5);
        sim.place_entity(GridPosition::new(6, 6));

        let now = Utc::now();
        let mut observer = RecordingObserver::default();
        sim.tick_at(now, &mut observer);

        assert_eq!(observer.entries[0].message, "Movement detected in Sector C");
        assert_eq!(observer.entries[0].severity, Severity::Info);
        assert_eq!(observer.static_bursts.len(), 1);
        assert!(sim.snapshot(now).static_burst);
        assert!(!sim.snapshot(now + chrono::Duration::seconds(2)).static_burst);

        let stale = sim.snapshot(now);
        let later = stale.clone().at(now + chrono::Duration::seconds(2));
        assert!(!later.static_burst);
        assert_eq!(later.static_burst_until, stale.static_burst_until);
        assert!(stale.at(now).static_burst);

        // Same label again: no movement entry, no new burst
        let mut observer = RecordingObserver::default();
        sim.tick_at(now, &mut observer);
        assert!(observer.entries.iter().all(|e| !e.message.starts_with("Movement")));
        assert!(observer.static_bursts.is_empty());
    }

    #[test]
    fn test_motion_sensors_rerolled_only_where_present() {
        let mut config = FacilityConfig::default();
        config.motion_probability = 1.0;
        let mut sim = simulator(&config, 6);
        sim.tick(&mut NoopObserver);

        assert_eq!(sim.sector("A").unwrap().motion_detected, Some(true));
        assert_eq!(sim.sector("R").unwrap().motion_detected, None);
    }

    #[test]
    fn test_lockdown_rejections_leave_state_untouched() {
        let mut sim = simulator(&FacilityConfig::default(), 1);
        let mut observer = RecordingObserver::default();

        assert_eq!(
            sim.invoke_lockdown("Z", &mut observer),
            Err(FacilityError::UnknownSector("Z".into()))
        );
        assert_eq!(
            sim.invoke_lockdown("R", &mut observer),
            Err(FacilityError::NoLockdownControl("R".into()))
        );
        assert!(observer.entries.is_empty());
        assert!(sim.log().is_empty());
        assert_eq!(sim.sector("R").unwrap().lockdown, None);
    }

    #[test]
    fn test_lockdown_outcomes() {
        let mut config = FacilityConfig::default();
        config.lockdown_success_rate = 1.0;
        let mut sim = simulator(&config, 2);
        let mut observer = RecordingObserver::default();

        assert_eq!(sim.invoke_lockdown("S", &mut observer), Ok(LockdownOutcome::Engaged));
        assert_eq!(sim.sector("S").unwrap().lockdown, Some(true));
        assert_eq!(observer.entries[0].severity, Severity::Warning);

        config.lockdown_success_rate = 0.0;
        let mut sim = simulator(&config, 2);
        let mut observer = RecordingObserver::default();

        assert_eq!(sim.invoke_lockdown("S", &mut observer), Ok(LockdownOutcome::Failed));
        assert_eq!(sim.sector("S").unwrap().lockdown, Some(false));
        assert_eq!(observer.entries[0].severity, Severity::Error);
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let mut sim = simulator(&FacilityConfig::default(), 10);
        sim.tick(&mut NoopObserver);

        let json = serde_json::to_value(sim.snapshot(Utc::now())).unwrap();
        assert_eq!(json["tick"], 1);
        assert!(json["emergencyLevel"].is_string());
        assert_eq!(json["sectors"].as_array().unwrap().len(), 7);
        assert!(json["entity"]["lastSeenSector"].is_string());
    }
}

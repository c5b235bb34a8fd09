//! Facility Service
//!
//! Runs the simulator on its own task and turns its observer callbacks into
//! bus events. HTTP handlers never touch the simulator directly; they read
//! the snapshot slot and send command events.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keros_runtime::{Event, Service, ServiceContext, ServiceError, ServiceResult, ServiceSpec};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use super::alert::EmergencyLevel;
use super::error::FacilityError;
use super::log::SystemMessage;
use super::observer::FacilityObserver;
use super::simulator::{FacilitySimulator, FacilitySnapshot};
use crate::config::FacilityConfig;

pub const SERVICE_ID: &str = "facility";

/// Bus event types published and consumed by the facility service
pub mod events {
    pub const LOG: &str = "facility/log";
    pub const ALERT: &str = "facility/alert";
    pub const STATIC_BURST: &str = "facility/static-burst";
    pub const SNAPSHOT: &str = "facility/snapshot";
    pub const COMMAND_LOCKDOWN: &str = "facility/command/lockdown";
    pub const COMMAND_TICK: &str = "facility/command/tick";
}

/// Latest snapshot, written by the service and read by HTTP handlers
pub type SnapshotSlot = Arc<RwLock<FacilitySnapshot>>;

#[derive(Debug, Clone, Serialize)]
struct AlertChange {
    previous: EmergencyLevel,
    current: EmergencyLevel,
}

#[derive(Debug, Clone, Serialize)]
struct StaticBurst {
    until: DateTime<Utc>,
}

/// Forwards observer callbacks onto the bus
struct EventObserver<'a> {
    ctx: &'a ServiceContext,
}

impl EventObserver<'_> {
    fn send<T: Serialize>(&self, event_type: &str, data: &T) {
        match Event::with_data(event_type, &self.ctx.service_id, data) {
            Ok(event) => publish(self.ctx, event),
            Err(e) => warn!(event_type, error = %e, "Failed to serialize facility event"),
        }
    }
}

impl FacilityObserver for EventObserver<'_> {
    fn on_log_entry(&mut self, entry: &SystemMessage) {
        self.send(events::LOG, entry);
    }

    fn on_alert_change(&mut self, previous: EmergencyLevel, current: EmergencyLevel) {
        self.send(events::ALERT, &AlertChange { previous, current });
    }

    fn on_static_burst(&mut self, until: DateTime<Utc>) {
        self.send(events::STATIC_BURST, &StaticBurst { until });
    }
}

/// Nobody listening is not an error for a broadcaster
fn publish(ctx: &ServiceContext, event: Event) {
    match ctx.publish(event) {
        Ok(()) => {}
        Err(ServiceError::ChannelClosed) => {
            debug!(service_id = %ctx.service_id, "No listeners for facility event")
        }
        Err(e) => warn!(service_id = %ctx.service_id, error = %e, "Failed to publish facility event"),
    }
}

pub struct FacilityService {
    simulator: FacilitySimulator,
    tick_interval: Duration,
    snapshot: SnapshotSlot,
}

impl FacilityService {
    pub fn new(config: &FacilityConfig) -> Result<Self, FacilityError> {
        let simulator = FacilitySimulator::from_config(config)?;
        Ok(Self::with_simulator(simulator, config.tick_interval()))
    }

    pub fn with_simulator(simulator: FacilitySimulator, tick_interval: Duration) -> Self {
        let snapshot = Arc::new(RwLock::new(simulator.snapshot(Utc::now())));
        Self {
            simulator,
            tick_interval,
            snapshot,
        }
    }

    /// Shared handle to the latest snapshot. Take this before spawning.
    pub fn snapshot_slot(&self) -> SnapshotSlot {
        Arc::clone(&self.snapshot)
    }

    fn refresh_snapshot(&self, ctx: &ServiceContext) {
        let snapshot = self.simulator.snapshot(Utc::now());
        *self.snapshot.write() = snapshot.clone();

        match Event::with_data(events::SNAPSHOT, &ctx.service_id, &snapshot) {
            Ok(event) => publish(ctx, event),
            Err(e) => warn!(error = %e, "Failed to serialize facility snapshot"),
        }
    }

    fn run_tick(&mut self, ctx: &ServiceContext) {
        let mut observer = EventObserver { ctx };
        let report = self.simulator.tick(&mut observer);
        debug!(
            tick = report.tick,
            level = %report.level,
            entries = report.new_entries.len(),
            level_changed = report.level_changed(),
            "Facility ticked"
        );
        self.refresh_snapshot(ctx);
    }
}

#[async_trait]
impl Service for FacilityService {
    fn spec(&self) -> ServiceSpec {
        ServiceSpec::new(SERVICE_ID, "Facility Simulator")
            .with_tick_interval(self.tick_interval)
            .subscribe("facility/command/*")
    }

    async fn on_start(&mut self, ctx: &ServiceContext) -> ServiceResult<()> {
        tracing::info!(
            sectors = self.simulator.sectors().len(),
            interval_ms = self.tick_interval.as_millis() as u64,
            "Facility simulator online"
        );
        self.refresh_snapshot(ctx);
        Ok(())
    }

    async fn on_stop(&mut self, _ctx: &ServiceContext) -> ServiceResult<()> {
        tracing::info!(ticks = self.simulator.tick_count(), "Facility simulator offline");
        Ok(())
    }

    async fn on_tick(&mut self, ctx: &ServiceContext) -> ServiceResult<()> {
        self.run_tick(ctx);
        Ok(())
    }

    async fn on_event(&mut self, ctx: &ServiceContext, event: Event) -> ServiceResult<()> {
        match event.event_type.as_str() {
            events::COMMAND_TICK => {
                self.run_tick(ctx);
                Ok(())
            }
            events::COMMAND_LOCKDOWN => {
                let code = event
                    .get_str("sector")
                    .ok_or_else(|| ServiceError::EventError("lockdown command without sector".into()))?
                    .to_string();

                let mut observer = EventObserver { ctx };
                self.simulator
                    .invoke_lockdown(&code, &mut observer)
                    .map_err(|e| ServiceError::EventError(e.to_string()))?;
                self.refresh_snapshot(ctx);
                Ok(())
            }
            other => {
                debug!(event_type = other, "Ignoring facility event");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keros_runtime::ServiceManager;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tokio::sync::broadcast;

    fn service(config: &FacilityConfig) -> FacilityService {
        let sim = FacilitySimulator::with_rng(config, StdRng::seed_from_u64(42)).unwrap();
        // Long interval so only forced ticks run during the test
        FacilityService::with_simulator(sim, Duration::from_secs(3600))
    }

    async fn next_of(rx: &mut broadcast::Receiver<Event>, event_type: &str) -> Event {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = rx.recv().await.unwrap();
                if event.event_type == event_type {
                    return event;
                }
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_forced_tick_updates_slot_and_publishes_snapshot() {
        let manager = ServiceManager::new();
        let mut rx = manager.subscribe_events();
        let service = service(&FacilityConfig::default());
        let slot = service.snapshot_slot();

        let handle = manager.spawn(service).await.unwrap();
        let initial = next_of(&mut rx, events::SNAPSHOT).await;
        assert_eq!(initial.data["tick"], 0);

        handle.force_tick().await.unwrap();
        let event = next_of(&mut rx, events::SNAPSHOT).await;
        assert_eq!(event.data["tick"], 1);
        assert_eq!(event.source, SERVICE_ID);
        assert_eq!(slot.read().tick, 1);

        manager.shutdown_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_tick_command_over_bus() {
        let manager = ServiceManager::new();
        let mut rx = manager.subscribe_events();
        let service = service(&FacilityConfig::default());
        let slot = service.snapshot_slot();
        manager.spawn(service).await.unwrap();
        next_of(&mut rx, events::SNAPSHOT).await;

        manager.emit(events::COMMAND_TICK, "test", serde_json::Value::Null);
        next_of(&mut rx, events::SNAPSHOT).await;
        assert_eq!(slot.read().tick, 1);

        manager.shutdown_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_lockdown_command_publishes_log_entry() {
        let mut config = FacilityConfig::default();
        config.lockdown_success_rate = 1.0;

        let manager = ServiceManager::new();
        let mut rx = manager.subscribe_events();
        let service = service(&config);
        let slot = service.snapshot_slot();
        manager.spawn(service).await.unwrap();
        next_of(&mut rx, events::SNAPSHOT).await;

        manager.emit(
            events::COMMAND_LOCKDOWN,
            "test",
            serde_json::json!({ "sector": "S" }),
        );

        let log = next_of(&mut rx, events::LOG).await;
        assert_eq!(log.data["severity"], "WARNING");
        next_of(&mut rx, events::SNAPSHOT).await;

        let snapshot = slot.read().clone();
        let armory = snapshot.sectors.iter().find(|s| s.code == "S").unwrap();
        assert_eq!(armory.lockdown, Some(true));

        manager.shutdown_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_meltdown_alert_event() {
        let mut config = FacilityConfig::default();
        for sector in config.sectors.iter_mut().filter(|s| s.code == "R") {
            sector.set_metric(crate::facility::MetricKind::Temperature, 200.0);
        }

        let manager = ServiceManager::new();
        let mut rx = manager.subscribe_events();
        let handle = manager.spawn(service(&config)).await.unwrap();

        handle.force_tick().await.unwrap();
        let alert = next_of(&mut rx, events::ALERT).await;
        assert_eq!(alert.data["previous"], "GREEN");
        assert_eq!(alert.data["current"], "RED");

        manager.shutdown_all().await.unwrap();
    }
}

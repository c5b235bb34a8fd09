//! Service Lifecycle Management
//!
//! A service owns its state outright and is driven from a single tokio task,
//! so every hook runs to completion before the next one starts.
//!
//! # Lifecycle
//!
//! - `on_start`: called once before the service is marked running
//! - `on_tick`: called on every period of `tick_interval`, if set
//! - `on_event`: called for bus events matching one of the subscriptions
//! - `on_stop`: called once during shutdown, bounded by `shutdown_timeout`

mod event;
mod handle;
mod manager;

pub use event::*;
pub use handle::*;
pub use manager::*;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Service Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during service lifecycle
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("Service initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Service already running: {0}")]
    AlreadyRunning(String),

    #[error("Service not running: {0}")]
    NotRunning(String),

    #[error("Event handling failed: {0}")]
    EventError(String),

    #[error("Shutdown timeout")]
    ShutdownTimeout,

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

// ─────────────────────────────────────────────────────────────────────────────
// Service Specification
// ─────────────────────────────────────────────────────────────────────────────

/// Static description of a service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Unique service identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Period of `on_tick`. The first tick fires one full period after start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_interval: Option<Duration>,

    /// Event patterns this service receives (e.g. "facility/command/*")
    #[serde(default)]
    pub subscriptions: Vec<String>,

    /// Timeout for graceful shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: Duration,
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

impl ServiceSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tick_interval: None,
            subscriptions: Vec::new(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Add a single subscription pattern
    pub fn subscribe(mut self, pattern: impl Into<String>) -> Self {
        self.subscriptions.push(pattern.into());
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context passed to every lifecycle hook
pub struct ServiceContext {
    pub service_id: String,
    event_publisher: EventPublisher,
}

impl ServiceContext {
    pub fn new(service_id: String, event_publisher: EventPublisher) -> Self {
        Self {
            service_id,
            event_publisher,
        }
    }

    /// Publish an event onto the bus
    pub fn publish(&self, event: Event) -> ServiceResult<()> {
        self.event_publisher.publish(event)
    }

    /// Create and publish an event sourced from this service
    pub fn emit(&self, event_type: impl Into<String>, data: serde_json::Value) -> ServiceResult<()> {
        self.publish(Event::new(event_type, &self.service_id, data))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A long-running component managed by the [`ServiceManager`]
#[async_trait]
pub trait Service: Send + Sync + 'static {
    fn spec(&self) -> ServiceSpec;

    /// Called once when the service starts. An error aborts the start.
    async fn on_start(&mut self, ctx: &ServiceContext) -> ServiceResult<()>;

    /// Called once when the service stops. The service is stopped regardless
    /// of the result.
    async fn on_stop(&mut self, ctx: &ServiceContext) -> ServiceResult<()>;

    async fn on_event(&mut self, _ctx: &ServiceContext, _event: Event) -> ServiceResult<()> {
        Ok(())
    }

    async fn on_tick(&mut self, _ctx: &ServiceContext) -> ServiceResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_spec_builder() {
        let spec = ServiceSpec::new("facility", "Facility Simulator")
            .with_tick_interval(Duration::from_secs(5))
            .subscribe("facility/command/*")
            .with_shutdown_timeout(Duration::from_secs(2));

        assert_eq!(spec.id, "facility");
        assert_eq!(spec.name, "Facility Simulator");
        assert_eq!(spec.tick_interval, Some(Duration::from_secs(5)));
        assert_eq!(spec.subscriptions, vec!["facility/command/*"]);
        assert_eq!(spec.shutdown_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_spec_defaults() {
        let spec = ServiceSpec::new("bridge", "Bridge");
        assert!(spec.tick_interval.is_none());
        assert!(spec.subscriptions.is_empty());
        assert_eq!(spec.shutdown_timeout, Duration::from_secs(10));
    }
}

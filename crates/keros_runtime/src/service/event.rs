//! Bus Events
//!
//! Everything a service says to the rest of the process goes through an
//! [`Event`] on the broadcast bus.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::{ServiceError, ServiceResult};

/// An event published on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Slash-separated type, e.g. "facility/log"
    pub event_type: String,

    /// Service or subsystem that produced the event
    pub source: String,

    pub data: serde_json::Value,

    /// Unix milliseconds
    pub timestamp: u64,
}

impl Event {
    pub fn new(
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            data,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        }
    }

    /// Serialize `data` into the payload
    pub fn with_data<T: Serialize>(
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event_type, source, serde_json::to_value(data)?))
    }

    /// Check if this event matches a subscription pattern
    ///
    /// Patterns support:
    /// - Exact match: "facility/log" matches "facility/log"
    /// - Wildcard suffix: "facility/*" matches "facility/log", "facility/alert"
    /// - Global wildcard: "*" matches everything
    pub fn matches(&self, pattern: &str) -> bool {
        if pattern == "*" {
            return true;
        }

        if let Some(prefix) = pattern.strip_suffix('*') {
            if prefix.ends_with('/') {
                return self.event_type.starts_with(prefix);
            }
        }

        self.event_type == pattern
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    pub fn parse_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// Cloneable sending half of the bus
#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<Event>,
}

impl EventPublisher {
    pub fn new(tx: broadcast::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Publish an event. Fails with `ChannelClosed` when nobody is listening.
    pub fn publish(&self, event: Event) -> ServiceResult<()> {
        self.tx
            .send(event)
            .map(|_| ())
            .map_err(|_| ServiceError::ChannelClosed)
    }

    pub fn emit(
        &self,
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: serde_json::Value,
    ) -> ServiceResult<()> {
        self.publish(Event::new(event_type, source, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::new(
            "facility/command/lockdown",
            "http",
            serde_json::json!({"sector": "S"}),
        );

        assert_eq!(event.event_type, "facility/command/lockdown");
        assert_eq!(event.source, "http");
        assert_eq!(event.get_str("sector"), Some("S"));
        assert!(event.timestamp > 0);
    }

    #[test]
    fn test_event_matching() {
        let event = Event::new("facility/log", "facility", serde_json::Value::Null);

        assert!(event.matches("facility/log"));
        assert!(!event.matches("facility/alert"));

        assert!(event.matches("*"));
        assert!(event.matches("facility/*"));
        assert!(!event.matches("relay/*"));

        // "facility" must not match "facility/*"
        let bare = Event::new("facility", "facility", serde_json::Value::Null);
        assert!(!bare.matches("facility/*"));
        assert!(bare.matches("facility"));
    }

    #[test]
    fn test_event_data_parsing() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Lockdown {
            sector: String,
        }

        let event = Event::new(
            "facility/command/lockdown",
            "ws",
            serde_json::json!({"sector": "S"}),
        );

        let data: Lockdown = event.parse_data().unwrap();
        assert_eq!(data.sector, "S");
    }

    #[test]
    fn test_publish_without_listeners_reports_closed() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        let publisher = EventPublisher::new(tx);
        let result = publisher.emit("facility/log", "facility", serde_json::Value::Null);
        assert!(matches!(result, Err(ServiceError::ChannelClosed)));
    }
}

//! Server Application State
//!
//! Shared state accessible by all HTTP and WebSocket handlers.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;
use wildmatch::WildMatch;

use keros_runtime::ServiceManager;

use crate::facility::{FacilityError, FacilitySnapshot, SnapshotSlot, events};
use crate::relay::ChatRelay;

use super::protocol::{ChangeType, ServerMessage};

/// Root of every facility path
pub const FACILITY_PATH: &str = "/facility";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    service_manager: Arc<ServiceManager>,

    /// Latest facility snapshot, written by the facility service
    snapshot: SnapshotSlot,

    chat: Arc<ChatRelay>,

    /// Connected WebSocket clients
    clients: DashMap<Uuid, ClientState>,
}

/// Per-client state
#[derive(Debug, Clone)]
pub struct ClientState {
    pub session_id: Uuid,

    /// Subscribed paths (with potential wildcards)
    pub subscriptions: HashSet<String>,

    /// Channel to send messages to this client
    pub tx: mpsc::Sender<ServerMessage>,
}

/// WebSocket path and change kind for a bus event, if clients may see it
pub fn event_path(event_type: &str) -> Option<(&'static str, ChangeType)> {
    match event_type {
        events::SNAPSHOT => Some((FACILITY_PATH, ChangeType::Updated)),
        events::LOG => Some(("/facility/log", ChangeType::Created)),
        events::ALERT => Some(("/facility/alert", ChangeType::Updated)),
        events::STATIC_BURST => Some(("/facility/static-burst", ChangeType::Updated)),
        _ => None,
    }
}

impl AppState {
    pub fn new(
        service_manager: Arc<ServiceManager>,
        snapshot: SnapshotSlot,
        chat: Arc<ChatRelay>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                service_manager,
                snapshot,
                chat,
                clients: DashMap::new(),
            }),
        }
    }

    pub fn service_manager(&self) -> &Arc<ServiceManager> {
        &self.inner.service_manager
    }

    pub fn chat(&self) -> &ChatRelay {
        &self.inner.chat
    }

    /// Copy of the latest facility snapshot, with the burst flag as of now
    pub fn snapshot(&self) -> FacilitySnapshot {
        self.inner.snapshot.read().clone().at(Utc::now())
    }

    /// Resolve a readable facility path to its current value
    pub fn resolve(&self, path: &str) -> Option<Value> {
        let snapshot = self.snapshot();
        let value = match path.trim_end_matches('/') {
            FACILITY_PATH => serde_json::to_value(&snapshot),
            "/facility/log" => serde_json::to_value(&snapshot.log),
            "/facility/entity" => serde_json::to_value(&snapshot.entity),
            "/facility/alert" => serde_json::to_value(snapshot.emergency_level),
            "/facility/sectors" => serde_json::to_value(&snapshot.sectors),
            other => {
                let code = other.strip_prefix("/facility/sectors/")?;
                let sector = snapshot.sectors.iter().find(|s| s.code == code)?;
                serde_json::to_value(sector)
            }
        };
        value.ok()
    }

    /// Queue a lockdown for the facility service.
    ///
    /// The sector is checked against the latest snapshot so callers get an
    /// immediate answer for sectors that cannot be locked; the attempt itself
    /// is reported later through the log.
    pub fn request_lockdown(&self, code: &str) -> Result<(), FacilityError> {
        {
            let snapshot = self.inner.snapshot.read();
            let sector = snapshot
                .sectors
                .iter()
                .find(|s| s.code == code)
                .ok_or_else(|| FacilityError::UnknownSector(code.to_string()))?;
            if sector.lockdown.is_none() {
                return Err(FacilityError::NoLockdownControl(code.to_string()));
            }
        }

        tracing::info!(sector = %code, "Lockdown requested");
        self.inner.service_manager.emit(
            events::COMMAND_LOCKDOWN,
            "server",
            serde_json::json!({ "sector": code }),
        );
        Ok(())
    }

    /// Register a new client connection
    pub fn register_client(&self, tx: mpsc::Sender<ServerMessage>) -> Uuid {
        let session_id = Uuid::new_v4();
        let client = ClientState {
            session_id,
            subscriptions: HashSet::new(),
            tx,
        };

        self.inner.clients.insert(session_id, client);
        tracing::info!("Client connected: {}", session_id);

        session_id
    }

    pub fn remove_client(&self, session_id: Uuid) {
        self.inner.clients.remove(&session_id);
        tracing::info!("Client disconnected: {}", session_id);
    }

    pub fn subscribe(&self, session_id: Uuid, paths: &[String]) {
        if let Some(mut client) = self.inner.clients.get_mut(&session_id) {
            for path in paths {
                tracing::debug!("Client {} subscribed to: {}", session_id, path);
                client.subscriptions.insert(path.clone());
            }
        }
    }

    pub fn unsubscribe(&self, session_id: Uuid, paths: &[String]) {
        if let Some(mut client) = self.inner.clients.get_mut(&session_id) {
            for path in paths {
                client.subscriptions.remove(path);
            }
        }
    }

    /// Broadcast a message to all clients subscribed to a path
    pub fn broadcast(&self, path: &str, message: ServerMessage) {
        for client in self.inner.clients.iter() {
            if Self::matches_any_subscription(&client.subscriptions, path) {
                if let Err(e) = client.tx.try_send(message.clone()) {
                    tracing::warn!(
                        "Failed to send message to client {}: {}",
                        client.session_id,
                        e
                    );
                }
            }
        }
    }

    pub fn send_to_client(&self, session_id: Uuid, message: ServerMessage) {
        if let Some(client) = self.inner.clients.get(&session_id) {
            let _ = client.tx.try_send(message);
        }
    }

    pub fn client_count(&self) -> usize {
        self.inner.clients.len()
    }

    /// Forward facility events from the bus to subscribed clients until the
    /// bus closes or the task is aborted
    pub fn spawn_event_bridge(&self) -> JoinHandle<()> {
        let state = self.clone();
        let mut rx = self.inner.service_manager.subscribe_events();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Some((path, change_type)) = event_path(&event.event_type) {
                            state.broadcast(path, ServerMessage::change(path, change_type, Some(event.data)));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event bridge fell behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Check if a path matches any subscription pattern
    ///
    /// - `/facility/*` matches `/facility` and one segment below it
    /// - `/facility/**` matches everything below `/facility`
    /// - anything else is an exact path or a wildmatch pattern
    fn matches_any_subscription(subscriptions: &HashSet<String>, path: &str) -> bool {
        subscriptions.iter().any(|pattern| {
            if pattern == path {
                return true;
            }

            if let Some(prefix) = pattern.strip_suffix("/**") {
                return path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
            }

            if let Some(prefix) = pattern.strip_suffix("/*") {
                return match path.strip_prefix(prefix) {
                    Some("") => true,
                    Some(rest) => rest.starts_with('/') && !rest[1..].contains('/'),
                    None => false,
                };
            }

            WildMatch::new(pattern).matches(path)
        })
    }
}

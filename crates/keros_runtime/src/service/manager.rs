//! Service Manager
//!
//! Spawns services, routes bus events to their subscriptions, and runs the
//! graceful shutdown sequence.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::{
    Event, EventPublisher, Service, ServiceCommand, ServiceContext, ServiceError, ServiceHandle,
    ServiceResult, ServiceSpec, ServiceState,
};

struct RunningService {
    handle: ServiceHandle,
    join_handle: JoinHandle<ServiceResult<()>>,
    spec: ServiceSpec,
}

/// Central manager for all services
pub struct ServiceManager {
    services: DashMap<String, RunningService>,
    shutdown_tx: broadcast::Sender<()>,
    event_tx: broadcast::Sender<Event>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (event_tx, _) = broadcast::channel(1024);

        Self {
            services: DashMap::new(),
            shutdown_tx,
            event_tx,
        }
    }

    pub fn event_publisher(&self) -> EventPublisher {
        EventPublisher::new(self.event_tx.clone())
    }

    /// Receive every event published on the bus from now on
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Spawn a service on its own task. Service ids are unique.
    pub async fn spawn<S: Service>(&self, service: S) -> ServiceResult<ServiceHandle> {
        let spec = service.spec();
        let service_id = spec.id.clone();

        if self.services.contains_key(&service_id) {
            return Err(ServiceError::AlreadyRunning(service_id));
        }

        let (command_tx, command_rx) = mpsc::channel(256);
        let state = Arc::new(AtomicU8::new(ServiceState::Starting as u8));
        let handle = ServiceHandle::new(service_id.clone(), command_tx, Arc::clone(&state));

        let ctx = ServiceContext::new(service_id.clone(), self.event_publisher());
        let channels = LoopChannels {
            command_rx,
            shutdown_rx: self.shutdown_tx.subscribe(),
            event_rx: self.event_tx.subscribe(),
        };

        let loop_spec = spec.clone();
        let join_handle = tokio::spawn(async move {
            run_service_loop(service, ctx, channels, state, loop_spec).await
        });

        self.services.insert(
            service_id,
            RunningService {
                handle: handle.clone(),
                join_handle,
                spec,
            },
        );

        Ok(handle)
    }

    /// Publish an event; silently dropped when no service is listening
    pub fn publish_event(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    pub fn emit(
        &self,
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: serde_json::Value,
    ) {
        self.publish_event(Event::new(event_type, source, data));
    }

    /// Stop one service and wait for its task to finish
    pub async fn stop(&self, service_id: &str) -> ServiceResult<()> {
        let running = self
            .services
            .remove(service_id)
            .map(|(_, v)| v)
            .ok_or_else(|| ServiceError::NotRunning(service_id.to_string()))?;

        let _ = running.handle.shutdown().await;
        await_service(service_id, running.join_handle, running.spec.shutdown_timeout).await
    }

    /// Signal every service to stop and wait for all of them
    pub async fn shutdown_all(&self) -> ServiceResult<()> {
        tracing::info!(services = self.services.len(), "Initiating shutdown of all services");

        let _ = self.shutdown_tx.send(());

        let ids: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        let mut first_error = None;

        for service_id in ids {
            let Some((_, running)) = self.services.remove(&service_id) else {
                continue;
            };
            let result =
                await_service(&service_id, running.join_handle, running.spec.shutdown_timeout)
                    .await;
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

async fn await_service(
    service_id: &str,
    join_handle: JoinHandle<ServiceResult<()>>,
    timeout: Duration,
) -> ServiceResult<()> {
    // on_stop already has its own timeout inside the loop; leave a margin
    match tokio::time::timeout(timeout + Duration::from_secs(1), join_handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::error!(service_id, error = ?e, "Service task panicked");
            Err(ServiceError::Internal(format!("Task panicked: {:?}", e)))
        }
        Err(_) => {
            tracing::warn!(service_id, "Service shutdown timed out");
            Err(ServiceError::ShutdownTimeout)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Task Loop
// ─────────────────────────────────────────────────────────────────────────────

struct LoopChannels {
    command_rx: mpsc::Receiver<ServiceCommand>,
    shutdown_rx: broadcast::Receiver<()>,
    event_rx: broadcast::Receiver<Event>,
}

async fn run_service_loop<S: Service>(
    mut service: S,
    ctx: ServiceContext,
    channels: LoopChannels,
    state: Arc<AtomicU8>,
    spec: ServiceSpec,
) -> ServiceResult<()> {
    let LoopChannels {
        mut command_rx,
        mut shutdown_rx,
        mut event_rx,
    } = channels;

    state.store(ServiceState::Starting as u8, Ordering::SeqCst);

    if let Err(e) = service.on_start(&ctx).await {
        tracing::error!(service_id = %ctx.service_id, error = %e, "Service failed to start");
        state.store(ServiceState::Failed as u8, Ordering::SeqCst);
        return Err(e);
    }

    state.store(ServiceState::Running as u8, Ordering::SeqCst);
    tracing::info!(service_id = %ctx.service_id, "Service started");

    let mut tick_timer = spec.tick_interval.map(|period| {
        let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        // A slow tick must not be followed by a burst of catch-up ticks
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        timer
    });

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::debug!(service_id = %ctx.service_id, "Received global shutdown signal");
                break;
            }

            Some(cmd) = command_rx.recv() => {
                match cmd {
                    ServiceCommand::Shutdown => {
                        tracing::debug!(service_id = %ctx.service_id, "Received shutdown command");
                        break;
                    }
                    ServiceCommand::Event(event) => {
                        if let Err(e) = service.on_event(&ctx, event).await {
                            tracing::warn!(service_id = %ctx.service_id, error = %e, "Error handling direct event");
                        }
                    }
                    ServiceCommand::ForceTick => {
                        if let Err(e) = service.on_tick(&ctx).await {
                            tracing::warn!(service_id = %ctx.service_id, error = %e, "Error during forced tick");
                        }
                    }
                    ServiceCommand::GetState(tx) => {
                        let _ = tx.send(ServiceState::from_u8(state.load(Ordering::SeqCst)));
                    }
                }
            }

            Ok(event) = event_rx.recv() => {
                if spec.subscriptions.iter().any(|p| event.matches(p)) {
                    if let Err(e) = service.on_event(&ctx, event).await {
                        tracing::warn!(service_id = %ctx.service_id, error = %e, "Error handling broadcast event");
                    }
                }
            }

            _ = async {
                match tick_timer.as_mut() {
                    Some(timer) => timer.tick().await,
                    None => std::future::pending::<tokio::time::Instant>().await,
                }
            } => {
                if let Err(e) = service.on_tick(&ctx).await {
                    tracing::warn!(service_id = %ctx.service_id, error = %e, "Error during tick");
                }
            }
        }
    }

    state.store(ServiceState::Stopping as u8, Ordering::SeqCst);
    tracing::debug!(service_id = %ctx.service_id, "Service stopping");

    match tokio::time::timeout(spec.shutdown_timeout, service.on_stop(&ctx)).await {
        Ok(Ok(())) => {
            state.store(ServiceState::Stopped as u8, Ordering::SeqCst);
            tracing::info!(service_id = %ctx.service_id, "Service stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            state.store(ServiceState::Failed as u8, Ordering::SeqCst);
            tracing::error!(service_id = %ctx.service_id, error = %e, "Service stop failed");
            Err(e)
        }
        Err(_) => {
            state.store(ServiceState::Failed as u8, Ordering::SeqCst);
            tracing::error!(service_id = %ctx.service_id, "Service stop timed out");
            Err(ServiceError::ShutdownTimeout)
        }
    }
}

//! K.E.R.O.S. Server
//!
//! Runs the facility simulator and serves the terminal API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use keros::config::{ConfigLoader, KerosConfig};
use keros::facility::FacilityService;
use keros::keros_runtime::ServiceManager;
use keros::relay::ChatRelay;
use keros::server::{AppState, create_router};

/// K.E.R.O.S. facility terminal backend
#[derive(Parser, Debug)]
#[command(name = "keros")]
#[command(about = "K.E.R.O.S. facility terminal backend", long_about = None)]
struct Args {
    /// Path to the configuration file (defaults to ./keros.toml when present)
    #[arg(short, long, env = "KEROS_CONFIG")]
    config: Option<PathBuf>,

    /// Server host address
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Facility tick interval in milliseconds
    #[arg(long)]
    tick_interval_ms: Option<u64>,

    /// Fixed simulator seed
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply(&self, config: &mut KerosConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ms) = self.tick_interval_ms {
            config.facility.tick_interval_ms = ms;
        }
        if self.seed.is_some() {
            config.facility.seed = self.seed;
        }
    }
}

fn main() -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    info!("Starting K.E.R.O.S. v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ConfigLoader::load(args.config.as_deref()).await?;
    args.apply(&mut config);
    if config.facility.tick_interval_ms == 0 {
        anyhow::bail!("tick interval must be greater than zero");
    }

    let service_manager = Arc::new(ServiceManager::new());

    let facility = FacilityService::new(&config.facility)?;
    let snapshot = facility.snapshot_slot();
    match service_manager.spawn(facility).await {
        Ok(handle) => info!("Facility simulator started (service_id: {})", handle.service_id),
        Err(e) => {
            error!("Failed to start facility simulator: {}", e);
            return Err(e.into());
        }
    }

    let chat = Arc::new(ChatRelay::from_config(&config.chat));
    let state = AppState::new(service_manager.clone(), snapshot, chat);
    let bridge = state.spawn_event_bridge();

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(service_manager))
        .await?;

    bridge.abort();
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("keros=info,keros_runtime=info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for Ctrl+C or SIGTERM, then stop every service
async fn shutdown_signal(service_manager: Arc<ServiceManager>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }

    info!("Shutting down services...");
    if let Err(e) = service_manager.shutdown_all().await {
        warn!("Some services did not shut down cleanly: {}", e);
    }
}

//! secdropd: the SecDrop daemon.
//!
//! Single OS process running a Tokio async runtime. Clients talk to the
//! daemon via newline-delimited JSON-RPC over a Unix socket. The daemon
//! only ever stores and returns ciphertext.

mod commands;
mod config;
mod events;
mod rpc;
mod schedule;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secdrop_store::{
    AccessRecorder, Clock, DropStore, ExpirySweeper, FanoutObserver, StoreContext, SystemClock,
    TracingObserver, VerificationProbe,
};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    pub clock: Arc<dyn Clock>,
    pub drops: DropStore,
    pub recorder: AccessRecorder,
    pub sweeper: ExpirySweeper,
    pub probe: VerificationProbe,
    /// Captured once at startup.
    pub started_at: DateTime<Utc>,
    /// Stops background tasks on shutdown.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    /// Wire the store components around one connection.
    pub fn new(conn: rusqlite::Connection, config: DaemonConfig, clock: Arc<dyn Clock>) -> Self {
        let event_bus = EventBus::new(1000, clock.clone());
        let observer = FanoutObserver::new()
            .with(Arc::new(TracingObserver))
            .with(Arc::new(event_bus.clone()));

        let ctx = StoreContext::new(conn)
            .with_clock(clock.clone())
            .with_observer(Arc::new(observer))
            .with_retry(config.retry.policy());

        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

        Self {
            drops: DropStore::new(ctx.clone()).with_default_ttl(config.drops.default_ttl_days),
            recorder: AccessRecorder::new(ctx.clone())
                .with_policy(config.privacy.geo_capture.into()),
            sweeper: ExpirySweeper::new(ctx.clone()),
            probe: VerificationProbe::new(ctx),
            started_at: clock.now(),
            clock,
            config,
            event_bus,
            shutdown_tx,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("secdrop={}", config.logging.log_level).parse()?),
        )
        .init();

    info!("SecDrop daemon starting");

    let data_dir = config.data_dir();

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("secdrop.db");
    let conn = secdrop_db::open(&db_path)?;

    // 3. Build daemon state; start time is fixed here
    let socket_path = config.socket_path();
    let sweep_interval = config.sweeper.interval_secs;
    let state = Arc::new(DaemonState::new(conn, config, Arc::new(SystemClock)));

    info!(
        reveal_mode = state.config.drops.reveal_mode.as_str(),
        "Drop store ready at {:?}", db_path
    );

    // 4. Optional in-process sweep
    let sweep_task = (sweep_interval > 0).then(|| {
        schedule::spawn_sweep_loop(
            state.sweeper.clone(),
            Duration::from_secs(sweep_interval),
            state.shutdown_tx.subscribe(),
        )
    });

    // 5. Start IPC server
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());
    info!("Starting JSON-RPC server on {:?}", socket_path);

    state.event_bus.emit(
        "DaemonStarted",
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    );

    // 6. Run the RPC server until Ctrl-C
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    info!("Daemon shutting down gracefully");
    let _ = state.shutdown_tx.send(());
    if let Some(task) = sweep_task {
        let _ = task.await;
    }

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}

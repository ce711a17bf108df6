use std::fs::OpenOptions;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use captioner_engine::dummy::DummyLoader;
use captioner_engine::EngineLoader;
use captioner_pool::{ControlLoop, RespawnConfig, WorkerPool};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use captioner_api::config::ServerConfig;
use captioner_api::state::AppState;
use captioner_api::transport::{spawn_delivery, Notifier};
use captioner_api::{routes, ws};

const DEFAULT_LOG_FILTER: &str =
    "captioner_api=info,captioner_pool=info,captioner_engine=info,tower_http=info";

/// How long to wait for queued events to reach clients during shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid configuration")?;

    // --- Tracing ---
    init_tracing(config.log_file.as_deref())?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        devices = ?config.devices.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
        worker_restart = config.worker_restart,
        "Loaded server configuration",
    );

    // --- WebSocket manager + event delivery ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let (notifier, outbound) = Notifier::new();
    let delivery_handle = spawn_delivery(outbound, Arc::clone(&ws_manager));

    // --- Heartbeat ---
    let heartbeat_cancel = CancellationToken::new();
    let heartbeat_handle = ws::start_heartbeat(
        Arc::clone(&ws_manager),
        ws::HEARTBEAT_INTERVAL,
        heartbeat_cancel.clone(),
    );

    // --- Worker pool ---
    let loader: Arc<dyn EngineLoader> = Arc::new(DummyLoader::new(config.engine_step_delay));
    let respawn = config.worker_restart.then(RespawnConfig::default);
    let pool = WorkerPool::start(&config.devices, loader, respawn, notifier)
        .context("Failed to start worker pool")?;
    let (control, pool_client) = ControlLoop::new(pool);
    let control = control.with_tick_interval(config.tick_interval);

    // A fatal pool error stops the server as well.
    let shutdown = CancellationToken::new();
    let control_cancel = CancellationToken::new();
    let control_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        let cancel = control_cancel.clone();
        async move {
            let result = control.run(cancel).await;
            if result.is_err() {
                shutdown.cancel();
            }
            result
        }
    });

    // --- App state + router ---
    let state = AppState {
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        pool: pool_client,
    };
    let app = routes::build_app(state);

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address {:?}", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                () = shutdown_signal() => {}
                () = server_shutdown.cancelled() => {
                    tracing::error!("Worker pool stopped, starting shutdown");
                }
            }
        })
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    control_cancel.cancel();
    let pool_result = control_handle.await.context("Control loop task panicked")?;
    match &pool_result {
        Ok(pool) => tracing::info!(
            queue_len = pool.queue_len(),
            "Control loop stopped, releasing workers",
        ),
        Err(e) => tracing::error!(error = %e, "Control loop failed"),
    }
    // Dropping the pool closes every task channel (idle workers exit) and
    // the notifier, which lets the delivery task drain and finish.
    let pool_result = pool_result.map(drop);

    if tokio::time::timeout(DRAIN_TIMEOUT, delivery_handle).await.is_err() {
        tracing::warn!("Timed out delivering final events");
    }

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_cancel.cancel();
    let _ = heartbeat_handle.await;
    tracing::info!("Heartbeat task stopped");

    pool_result.context("Worker pool failed")?;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Install the global subscriber: `RUST_LOG`-filtered output on stdout,
/// plus JSON lines appended to `log_file` when one is configured.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

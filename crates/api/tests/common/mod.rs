#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use captioner_api::config::ServerConfig;
use captioner_api::routes;
use captioner_api::state::AppState;
use captioner_api::transport::{spawn_delivery, Notifier};
use captioner_api::ws::WsManager;
use captioner_core::devices::DeviceId;
use captioner_engine::dummy::DummyLoader;
use captioner_pool::{ControlLoop, PoolClient, WorkerPool};
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Build a test `ServerConfig` for `workers` CPU devices.
pub fn test_config(workers: usize) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        devices: (0..workers)
            .map(|i| DeviceId::new(format!("cpu:{i}")).unwrap())
            .collect(),
        tick_interval: Duration::from_millis(2),
        worker_restart: false,
        engine_step_delay: Duration::ZERO,
        log_file: None,
    }
}

/// A running server stack: workers, control loop, event delivery, router.
pub struct TestApp {
    pub router: Router,
    pub ws_manager: Arc<WsManager>,
    pub pool: PoolClient,
    pub cancel: CancellationToken,
}

/// Start the same stack `main.rs` builds, with instant dummy engines.
pub fn start_app(workers: usize) -> TestApp {
    let config = test_config(workers);
    let ws_manager = Arc::new(WsManager::new());
    let (notifier, outbound) = Notifier::new();
    spawn_delivery(outbound, Arc::clone(&ws_manager));

    let pool = WorkerPool::start(
        &config.devices,
        Arc::new(DummyLoader::instant()),
        None,
        notifier,
    )
    .unwrap();
    let (control, pool_client) = ControlLoop::new(pool);
    let cancel = CancellationToken::new();
    tokio::spawn(
        control
            .with_tick_interval(config.tick_interval)
            .run(cancel.clone()),
    );

    let state = AppState {
        config: Arc::new(config),
        ws_manager: Arc::clone(&ws_manager),
        pool: pool_client.clone(),
    };
    TestApp {
        router: routes::build_app(state),
        ws_manager,
        pool: pool_client,
        cancel,
    }
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

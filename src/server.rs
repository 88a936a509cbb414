//! Service entry point: wires the warming components together and serves
//! the diagnostics HTTP surface.
//!
//! `/health` is always mounted. The warming status and manual trigger
//! routes exist only when `diagnostics.enabled` is set; in any other
//! build the surface is inert and those paths simply 404.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::client::WarmingClient;
use crate::config::Config;
use crate::coordinator::{WarmNowReport, WarmingCoordinator};
use crate::monitor::PingMonitor;
use crate::pinger::KeepAlivePinger;
use crate::store::StateStore;
use crate::warmer::ContentWarmer;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone)]
struct DiagnosticsState {
    coordinator: WarmingCoordinator,
    monitor: Arc<PingMonitor>,
}

pub async fn run(address: Option<SocketAddr>, config_path: Option<PathBuf>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .map_err(|e| format!("Failed to load config: {}", e))?;
    let config = Arc::new(config);

    info!(path = %config.server.fjall_path.display(), "Opening state store");
    let store = Arc::new(
        StateStore::open(&config.server.fjall_path)
            .map_err(|e| format!("Failed to open state store: {}", e))?,
    );

    let client = Arc::new(
        WarmingClient::new(&config.backend)
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?,
    );

    let pinger = KeepAlivePinger::new(config.pinger.clone(), Arc::clone(&client), Arc::clone(&store));
    let warmer = ContentWarmer::new(config.warmer.clone(), client, store);
    let coordinator = WarmingCoordinator::new(Arc::clone(&config), pinger, warmer);
    coordinator.initialize();

    let mut app = Router::new().route("/health", get(health));

    if config.diagnostics.enabled {
        let state = DiagnosticsState {
            coordinator: coordinator.clone(),
            monitor: Arc::new(PingMonitor::new(&coordinator)),
        };
        app = app.merge(
            Router::new()
                .route("/warming/status", get(warming_status))
                .route("/warming/warm", post(warm))
                .with_state(state),
        );
        info!("Diagnostics routes enabled");
    }

    let app = app.layer(TraceLayer::new_for_http());

    let address = address.unwrap_or(config.server.bind_addr);
    let listener = TcpListener::bind(address).await?;
    info!(%address, "keepwarm diagnostics server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    coordinator.shutdown();
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn warming_status(State(state): State<DiagnosticsState>) -> Json<serde_json::Value> {
    let status = state.coordinator.status();
    Json(serde_json::json!({
        "status": status,
        "success_rate": state.monitor.success_rate(),
    }))
}

async fn warm(State(state): State<DiagnosticsState>) -> Json<WarmNowReport> {
    Json(state.monitor.warm_now().await)
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

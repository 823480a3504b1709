// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use holter_sync::application::chart_reducer::ChartReducer;
use holter_sync::application::engine_service::EngineService;
use holter_sync::application::sync_engine::SyncEngine;
use holter_sync::infrastructure::config::load_engine_config;
use holter_sync::infrastructure::simulated_device::SimulatedDevice;
use holter_sync::presentation::app_state::AppState;
use holter_sync::presentation::handlers::{
    connect, disconnect, get_chart, get_status, health_check, list_presets, live_stream,
    request_sync, select_view,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_engine_config()?;

    // Create engine (application layer) and move it into its task
    let engine = SyncEngine::new(
        config.live.window_capacity,
        ChartReducer::new(config.chart.max_points, config.chart.label_count),
    )
    .with_command_timeout(Duration::from_millis(config.device.command_timeout_ms));
    let handle = EngineService::spawn(engine);

    // Create device link (infrastructure layer)
    let device = SimulatedDevice::new(config.simulator.clone());
    if config.device.auto_connect {
        tracing::info!("Connecting to {}", config.device.name);
        handle.connect(Arc::new(device.clone())).await?;
    }

    // Create application state
    let state = Arc::new(AppState {
        engine: handle,
        device,
        sync_presets: config.sync_presets.clone(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(get_status))
        .route("/chart", get(get_chart))
        .route("/presets", get(list_presets))
        .route("/live", get(live_stream))
        .route("/sync/:minutes", post(request_sync))
        .route("/view/:view", post(select_view))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!("Starting holter-sync on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

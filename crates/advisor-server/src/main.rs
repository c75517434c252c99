//! weather-advisor HTTP Server
//!
//! Axum-based server exposing single-shot and streamed weather advice, a
//! direct current-conditions lookup, health and Prometheus metrics.

mod config;
mod handlers;
mod state;


use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use advisor_core::{AdvisorMetrics, GenerationOptions};
use weather_advisor::{
    AdviceOrchestrator, AdvisorConfig, AdvisoryComposer, CoordinateResolver, OpenMeteoGeocoder,
    OpenMeteoWeather, UpstreamConfig,
};

use crate::config::ServerConfig;
use crate::handlers::{
    advice_handler, advice_stream_handler, health_check, metrics_handler, weather_handler,
};
use crate::state::AppState;

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & observability
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Advisor API
        .route("/api/advice", post(advice_handler))
        .route("/api/advice/stream", get(advice_stream_handler))
        .route("/api/weather", post(weather_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment first so RUST_LOG from .env applies
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Initialize the generation backend
    let (provider, model) = advisor_runtime::from_env(config.provider)?;

    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ {} reachable (model {})", provider.name(), model),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ {} not reachable - advice calls will fail", provider.name());
        }
    }

    // Process-scoped metrics, shared by every adapter
    let metrics = Arc::new(AdvisorMetrics::new());

    let upstream = UpstreamConfig::from_env();
    let geocoder = OpenMeteoGeocoder::new(&upstream, metrics.clone())?;
    let weather = OpenMeteoWeather::new(&upstream, metrics.clone())?;
    let composer = AdvisoryComposer::new(provider.clone(), GenerationOptions::for_model(&model));

    let advisor_config = AdvisorConfig::from_env();
    tracing::info!(
        advice_timeout_secs = advisor_config.advice_timeout.as_secs(),
        stream_timeout_secs = advisor_config.stream_timeout.as_secs(),
        upstream_timeout_secs = upstream.timeout.as_secs(),
        "Advisor configured"
    );

    let orchestrator = AdviceOrchestrator::new(
        CoordinateResolver::new(Arc::new(geocoder)),
        Arc::new(weather),
        composer,
        metrics.clone(),
        advisor_config,
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        provider,
        metrics,
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🌦 weather-advisor running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health             - Health check");
    tracing::info!("  GET  /metrics            - Prometheus metrics");
    tracing::info!("  POST /api/advice         - Advice for cities");
    tracing::info!("  GET  /api/advice/stream  - WebSocket streaming advice");
    tracing::info!("  POST /api/weather        - Current conditions");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

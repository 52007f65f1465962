mod config;
mod events_wire;
mod providers;
mod state;
mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let app_config = config::load()?;
    tracing::info!(host = %app_config.transport.host, port = app_config.transport.port, "loaded configuration");

    let state = AppState {
        registry: Arc::new(voice_core::SessionRegistry::new()),
        capability_registry: Arc::new(providers::build_registry()),
        app_config: Arc::new(app_config),
    };

    let addr = format!("{}:{}", state.app_config.transport.host, state.app_config.transport.port);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/voice", get(ws::ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
    tracing::info!(%addr, "voice-gateway listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

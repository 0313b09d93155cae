//! Imagegate kernel
//!
//! Gated image upload server.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use imagegate_kernel::{AppState, Config, routes};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting Imagegate kernel");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        port = config.port,
        uploads_dir = %config.uploads_dir.display(),
        max_upload_bytes = config.max_upload_bytes,
        "Configuration loaded"
    );

    let cors = build_cors_layer(&config)?;
    let state = AppState::new(&config);

    // TraceLayer → CORS → routes
    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn build_cors_layer(config: &Config) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    if config.allowed_origin == "*" {
        Ok(layer.allow_origin(tower_http::cors::Any))
    } else {
        let origin = config
            .allowed_origin
            .parse::<HeaderValue>()
            .context("ALLOWED_ORIGIN must be a valid header value")?;
        Ok(layer.allow_origin(origin))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

//! Outreach API - Main Entry Point

use outreach_api::{build_router, config::OutreachConfig, ApiState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Outreach API v{}", env!("CARGO_PKG_VERSION"));

    // Load config
    let config_path =
        std::env::var("OUTREACH_CONFIG").unwrap_or_else(|_| "outreach.config.json".into());

    let mut config = OutreachConfig::load(&config_path).unwrap_or_else(|e| {
        tracing::warn!(path = %config_path, error = %e, "Config not loaded, using defaults");
        OutreachConfig::default()
    });
    config.apply_env();

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        data_dir = %config.data_dir.display(),
        "listening"
    );

    let app = build_router(ApiState::from_config(config));
    axum::serve(listener, app).await?;

    Ok(())
}

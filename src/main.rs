use std::sync::Arc;

use resonance_api::{
    api::{create_router, AppState},
    config::Config,
    services::{EngineSettings, SpotifyGateway},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let gateway = SpotifyGateway::new(&config)?;
    let state = AppState::new(Arc::new(gateway), EngineSettings::from(&config));

    // Create the router with all routes
    let app = create_router(state);

    // Start the server
    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}

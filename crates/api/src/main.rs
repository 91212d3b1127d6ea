//! fixchat API server entry point

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use fixchat_api::{routes::app_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    let bind_address = config.bind_address.clone();

    let state = AppState::new(config);
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;

    tracing::info!(bind_address = %bind_address, "fixchat coordinator listening");

    axum::serve(listener, app)
        .await
        .context("server exited with error")?;

    Ok(())
}

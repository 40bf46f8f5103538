use anyhow::Context;
use tracing_subscriber::EnvFilter;

use portal_ti_api::config::AppConfig;
use portal_ti_api::{app, database, AppContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting Portal TI API in {:?} mode", config.environment);

    let store = database::connect(&config.database)
        .await
        .context("could not open storage")?;
    let ctx = AppContext::build(config, store.clone());
    ctx.files
        .ensure_root()
        .await
        .with_context(|| format!("could not create upload directory {}", ctx.files.root().display()))?;

    let bind_addr = format!("0.0.0.0:{}", ctx.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Portal TI API listening on http://{}", bind_addr);

    axum::serve(listener, app(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    store.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

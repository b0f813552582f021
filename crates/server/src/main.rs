use anyhow::Context;
use db::DBService;
use server::{
    DeploymentImpl,
    config::ServerConfig,
    deployment::Integrations,
    routes,
};
use services::services::storage::LocalStorage;
use tracing_subscriber::{EnvFilter, prelude::*};
use utils::{assets::storage_dir, sentry::sentry_layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the real environment still applies
    let _ = dotenvy::dotenv();
    let _sentry = utils::sentry::init_once();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},db={level},utils={level},tower_http={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).context("invalid RUST_LOG")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .with(sentry_layer())
        .init();

    let config = ServerConfig::from_env()?;
    let db = DBService::new().await.context("failed to open database")?;
    let storage = LocalStorage::new(storage_dir(), config.public_base());
    tokio::fs::create_dir_all(storage.root())
        .await
        .context("failed to create storage directory")?;

    let addr = config.addr();
    let deployment = DeploymentImpl::new(db, config, storage, Integrations::from_env());
    let app = routes::router(deployment);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutting down");
}

//! Startup helpers for the echo chat server.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use crate::chat::CatFactClient;
use crate::config::ServerConfig;
use crate::server::{self, AppState};
use crate::storage::SqliteChatStore;

/// Run the server until Ctrl+C.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting echo chat v{}", env!("CARGO_PKG_VERSION"));

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(config, shutdown_signal())) {
        tracing::error!("Server error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Open the store, serve until `shutdown` completes, then close the store.
///
/// # Errors
/// Returns an error if the database, the HTTP client or the listener cannot
/// be set up, or if the server fails.
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    tracing::info!(
        database = %config.database_path.display(),
        static_dir = %config.static_dir.display(),
        "using chat database"
    );

    let store = Arc::new(
        SqliteChatStore::open(&config.database_path)
            .await
            .with_context(|| format!("failed to open {}", config.database_path.display()))?,
    );
    store
        .initialize()
        .await
        .context("failed to create chat tables")?;

    let cat_facts = CatFactClient::new(&config.cat_fact_url, config.http_timeout)
        .context("failed to build cat fact client")?;
    let state = AppState::new(store.clone(), cat_facts, config.static_dir.clone());

    server::run_server_with_shutdown(state, config.port, shutdown)
        .await
        .context("HTTP server failed")?;

    match Arc::try_unwrap(store) {
        Ok(store) => store.close().await.context("failed to close chat database")?,
        Err(_) => tracing::warn!("chat database still in use at shutdown; dropping it"),
    }

    tracing::info!("Echo chat stopped");
    Ok(())
}

/// Resolve when the process receives Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

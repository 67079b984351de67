//! Startup helpers for the headless ClerkDesk sync session.
//!
//! Runs the sync engine without any frontend attached: useful for smoke
//! testing a backend and for watching notification traffic from a terminal.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use crate::sync::{SyncConfig, SyncService, SyncTasks};

/// Run a sync session until Ctrl-C (used by the `clerkdesk` binary).
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

    tracing::info!("Starting ClerkDesk sync console v{}", env!("CARGO_PKG_VERSION"));

    let config = SyncConfig::from_env();
    if let Err(err) = config.validate() {
        tracing::error!("Invalid configuration: {err}");
        return ExitCode::from(1);
    }
    tracing::info!("Console backend: {}", config.base_url);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!("Failed to create runtime: {err}");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = rt.block_on(run_session(config)) {
        tracing::error!("Sync session error: {err}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Drive one full session: initial load, background tasks, Ctrl-C, drain.
async fn run_session(config: SyncConfig) -> anyhow::Result<()> {
    let service = Arc::new(SyncService::with_http(config).context("building HTTP transport")?);

    service
        .refresh_conversations()
        .await
        .context("initial conversation refresh")?;
    tracing::info!(
        "Loaded {} conversations",
        service.conversations().len()
    );

    let tasks = SyncTasks::spawn(&service);
    tracing::info!("Background sync running; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    service.shutdown();
    tasks.join().await;
    Ok(())
}

//! Run the monitor daemon in the foreground.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

use super::load_config;
use crate::monitor::Monitor;

/// Watch the network and keep the proxy config converged.
///
/// Runs until interrupted. ctrl-c exits cleanly; the event
/// subscription ending for any other reason is unrecoverable and
/// exits non-zero, leaving restarts to the supervisor.
pub async fn execute() -> Result<()> {
    let config = load_config()?;
    info!(
        network = %config.network,
        config_file = ?config.config_path,
        mode = %config.mode,
        debounce_secs = config.debounce.as_secs(),
        "Docker network monitor started"
    );

    let monitor = Arc::new(Monitor::new(config)?);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, exiting");
            Ok(())
        }
        result = Arc::clone(&monitor).run() => {
            error!("Docker network monitor exited unexpectedly");
            match result {
                Ok(()) => anyhow::bail!("event stream ended"),
                Err(error) => Err(error.into()),
            }
        }
    }
}

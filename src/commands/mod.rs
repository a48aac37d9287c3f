//! CLI command implementations.
//!
//! Each submodule implements one subcommand:
//!
//! - [`run`] - the long-running monitor daemon
//! - [`sync`] - a single reconciliation pass (optionally dry-run)
//! - [`check`] - read-only environment and config diagnostics

pub mod check;
pub mod run;
pub mod sync;

use anyhow::Result;
use tracing::warn;

use crate::config::Config;

/// Load the configuration and log any validation warnings.
pub(crate) fn load_config() -> Result<Config> {
    let config = Config::from_env()?;
    for warning in config.validate().warnings {
        warn!("{warning}");
    }
    Ok(config)
}

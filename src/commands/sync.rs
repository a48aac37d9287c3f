//! One-shot reconciliation.

use anyhow::Result;
use tracing::info;

use super::load_config;
use crate::monitor::Monitor;

/// Run a single pass and exit.
///
/// With `--dry-run` the assembled candidate goes to stdout and the
/// live config and proxy are left untouched, which makes template
/// changes reviewable before an event applies them.
pub async fn execute(dry_run: bool) -> Result<()> {
    let config = load_config()?;
    let monitor = Monitor::new(config)?;

    if dry_run {
        let candidate = monitor.assemble_candidate().await?;
        print!("{candidate}");
        return Ok(());
    }

    monitor.reconcile_once().await?;
    info!("sync complete");
    Ok(())
}

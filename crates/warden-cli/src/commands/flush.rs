//! One-shot flush command.

use crate::config::Settings;
use crate::error::Result;
use crate::output::{pass_exit_code, Formatter};
use tokio_util::sync::CancellationToken;
use warden_janitor::{Janitor, PassReport};
use warden_store::SqliteStore;

/// Run a single janitor pass.
///
/// The pass runs on the blocking pool; `cancel` stops it at the next batch
/// boundary.
pub async fn flush(settings: &Settings, cancel: CancellationToken) -> Result<PassReport> {
    let store = SqliteStore::open_dsn(&settings.dsn, settings.janitor.lifespan_policy())?;
    let mut janitor = Janitor::new(settings.janitor.clone())?.with_overlay(settings.overlay);

    let report = tokio::task::spawn_blocking(move || janitor.sweep(&store, cancel)).await?;
    Ok(report)
}

/// Execute the flush command, printing one line per step.
///
/// Returns the highest exit code observed across the steps.
pub async fn execute_flush(
    settings: &Settings,
    formatter: &Formatter,
    cancel: CancellationToken,
) -> Result<u8> {
    let report = flush(settings, cancel).await?;

    println!("{}", formatter.format_pass(&report));
    if let Some(e) = report.error() {
        tracing::error!("{}", e);
    }

    Ok(pass_exit_code(&report))
}

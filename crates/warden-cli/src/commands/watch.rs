//! Background mode: a janitor pass on every interval tick.

use crate::config::Settings;
use crate::error::{Result, EXIT_CANCELLED, EXIT_SUCCESS};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use warden_janitor::{Janitor, JanitorWorker};
use warden_store::SqliteStore;

/// Run passes every `interval` until cancelled or interrupted.
///
/// Failed passes are logged and do not stop the worker.
pub async fn execute_watch(
    settings: &Settings,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<u8> {
    let store = SqliteStore::open_dsn(&settings.dsn, settings.janitor.lifespan_policy())?;
    let janitor = Janitor::new(settings.janitor.clone())?.with_overlay(settings.overlay);
    let mut worker = JanitorWorker::new(janitor, interval);

    worker.run(&store, cancel.clone()).await?;

    if cancel.is_cancelled() {
        Ok(EXIT_CANCELLED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

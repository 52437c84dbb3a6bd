//! Background worker for continuous Janitor operation

use crate::{Janitor, JanitorError, JanitorMetrics, PassReport};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use warden_domain::traits::JanitorStore;

/// Background worker that runs a Janitor pass on a schedule
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use warden_janitor::{Janitor, JanitorConfig, JanitorWorker};
/// use warden_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = JanitorConfig::default();
///     let store = SqliteStore::open("warden.db", config.lifespan_policy())?;
///     let mut worker = JanitorWorker::new(Janitor::new(config)?, Duration::from_secs(600));
///
///     // Run until Ctrl+C
///     worker.run(&store, CancellationToken::new()).await?;
///     Ok(())
/// }
/// ```
pub struct JanitorWorker {
    janitor: Janitor,
    interval: Duration,
}

impl JanitorWorker {
    /// Create a worker that runs `janitor` every `interval`
    pub fn new(janitor: Janitor, interval: Duration) -> Self {
        Self { janitor, interval }
    }

    /// Interval between passes
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run passes until `cancel` fires or Ctrl+C is received
    ///
    /// A failed pass is logged and the next tick runs as usual. A pass in
    /// progress when cancellation arrives stops at its next batch boundary.
    pub async fn run<S: JanitorStore>(
        &mut self,
        store: &S,
        cancel: CancellationToken,
    ) -> Result<(), JanitorError> {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Janitor worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting janitor pass");
                    let report = self.janitor.sweep(store, cancel.clone());
                    log_pass(&report, None);
                }
                _ = cancel.cancelled() => {
                    tracing::info!("Cancellation requested, stopping janitor");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping janitor");
                    cancel.cancel();
                    break;
                }
            }
        }

        let metrics = self.janitor.metrics();
        tracing::info!("Janitor stopped. Final metrics:\n{}", metrics.summary());

        Ok(())
    }

    /// Run a fixed number of passes (useful for testing)
    ///
    /// Stops at the first failed pass and returns its error.
    pub async fn run_cycles<S: JanitorStore>(
        &mut self,
        store: &S,
        cycles: usize,
        cancel: CancellationToken,
    ) -> Result<(), JanitorError> {
        let mut ticker = interval(self.interval);

        tracing::info!(
            "Janitor worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;

            tracing::debug!("Starting janitor pass {}/{}", cycle + 1, cycles);
            let report = self.janitor.sweep(store, cancel.clone());
            log_pass(&report, Some((cycle + 1, cycles)));
            report.into_result()?;
        }

        let metrics = self.janitor.metrics();
        tracing::info!(
            "Janitor finished {} cycles. Final metrics:\n{}",
            cycles,
            metrics.summary()
        );

        Ok(())
    }

    /// Get a reference to the janitor's current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        self.janitor.metrics()
    }

    /// Reset the janitor's metrics counters
    pub fn reset_metrics(&mut self) {
        self.janitor.reset_metrics();
    }
}

fn log_pass(report: &PassReport, cycle: Option<(usize, usize)>) {
    let label = match cycle {
        Some((n, total)) => format!("Pass {}/{}", n, total),
        None => "Pass".to_string(),
    };
    match report.error() {
        None => tracing::info!("{} completed: {} deleted", label, report.total_deleted()),
        Some(e) => tracing::error!("{} failed: {}", label, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JanitorConfig;
    use chrono::{TimeDelta, Utc};
    use std::sync::Arc;
    use warden_domain::traits::{AccessTokenStore, ClientStore};
    use warden_domain::{AccessTokenSession, Client, MockClock, TokenRequest};
    use warden_store::SqliteStore;

    fn worker(config: JanitorConfig) -> JanitorWorker {
        let janitor = Janitor::new(config).unwrap();
        JanitorWorker::new(janitor, Duration::from_millis(10))
    }

    fn store_with_expired_token() -> SqliteStore {
        let store = SqliteStore::in_memory(JanitorConfig::default().lifespan_policy()).unwrap();
        store.create_client(&Client::new("client")).unwrap();
        let request = TokenRequest::new("req", "client", Utc::now() - TimeDelta::hours(5));
        store
            .create_access_token_session(&AccessTokenSession::new("sig", request))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_worker_creation() {
        let worker = worker(JanitorConfig::default());
        assert_eq!(worker.metrics().pass_count, 0);
        assert_eq!(worker.interval(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_run_cycles() {
        let store = store_with_expired_token();
        let mut worker = worker(JanitorConfig::default());

        worker
            .run_cycles(&store, 2, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(worker.metrics().pass_count, 2);
        assert_eq!(worker.metrics().total_deleted(), 1);
        assert!(store.get_access_token_session("sig").is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let store = store_with_expired_token();
        let janitor = Janitor::new(JanitorConfig::default())
            .unwrap()
            .with_clock(Arc::new(MockClock::default()));
        let mut worker = JanitorWorker::new(janitor, Duration::from_millis(10));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        worker.run(&store, cancel).await.unwrap();

        assert!(worker.metrics().pass_count >= 1);
        assert!(store.get_access_token_session("sig").is_err());
    }

    #[tokio::test]
    async fn test_cancelled_cycles_report_error() {
        let store = store_with_expired_token();
        let mut worker = worker(JanitorConfig::default());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = worker.run_cycles(&store, 1, cancel).await.unwrap_err();

        assert!(matches!(err, JanitorError::Cancelled { deleted: 0, .. }));
        assert!(store.get_access_token_session("sig").is_ok());
    }

    #[tokio::test]
    async fn test_reset_metrics() {
        let store = store_with_expired_token();
        let mut worker = worker(JanitorConfig::default());

        worker
            .run_cycles(&store, 1, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(worker.metrics().pass_count, 1);

        worker.reset_metrics();
        assert_eq!(worker.metrics().pass_count, 0);
    }
}

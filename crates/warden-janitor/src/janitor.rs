//! Core Janitor implementation: one pass over every flush step

use crate::{BatchedFlusher, JanitorConfig, JanitorError, JanitorMetrics, PassReport, Step, StepReport};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use warden_domain::traits::JanitorStore;
use warden_domain::{Clock, FlushContext, LifespanOverlay, SystemClock};

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JanitorState {
    /// Waiting for a pass
    Idle,
    /// A pass is in progress
    Running,
}

/// Janitor service: deletes expired login/consent requests, token sessions
/// and trust grants
///
/// A pass runs the selected steps in a fixed order: login/consent, access
/// tokens, refresh tokens, trust grants. A failing step does not stop the
/// ones after it; cancellation does. `now` is snapshotted once per pass.
///
/// # Examples
///
/// ```no_run
/// use tokio_util::sync::CancellationToken;
/// use warden_janitor::{Janitor, JanitorConfig};
/// use warden_store::SqliteStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = JanitorConfig::default();
/// let store = SqliteStore::open("warden.db", config.lifespan_policy())?;
/// let mut janitor = Janitor::new(config)?;
///
/// let report = janitor.sweep(&store, CancellationToken::new());
/// println!("{}", janitor.metrics().summary());
/// report.into_result()?;
/// # Ok(())
/// # }
/// ```
pub struct Janitor {
    config: JanitorConfig,
    flusher: BatchedFlusher,
    clock: Arc<dyn Clock>,
    overlay: LifespanOverlay,
    metrics: JanitorMetrics,
    state: JanitorState,
}

impl Janitor {
    /// Create a Janitor on the system clock
    pub fn new(config: JanitorConfig) -> Result<Self, JanitorError> {
        config.validate()?;
        let flusher = BatchedFlusher::new(config.limit, config.batch_size)?.with_rounds(config.rounds);
        Ok(Self {
            config,
            flusher,
            clock: Arc::new(SystemClock::new()),
            overlay: LifespanOverlay::none(),
            metrics: JanitorMetrics::new(),
            state: JanitorState::Idle,
        })
    }

    /// Create a Janitor with default configuration
    pub fn default_config() -> Self {
        Self {
            config: JanitorConfig::default(),
            flusher: BatchedFlusher::default(),
            clock: Arc::new(SystemClock::new()),
            overlay: LifespanOverlay::none(),
            metrics: JanitorMetrics::new(),
            state: JanitorState::Idle,
        }
    }

    /// Use `clock` as the source of `now`
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Apply lifespan overrides to every pass
    pub fn with_overlay(mut self, overlay: LifespanOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Configuration this janitor runs with
    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Current lifecycle state
    pub fn state(&self) -> JanitorState {
        self.state
    }

    /// Caller bound implied by `keep_if_younger` at `now`
    pub fn not_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let keep = TimeDelta::from_std(self.config.keep_if_younger).unwrap_or(TimeDelta::MAX);
        now.checked_sub_signed(keep)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Run a pass bounded by the configured `keep_if_younger`
    pub fn sweep<S: JanitorStore>(&mut self, store: &S, cancel: CancellationToken) -> PassReport {
        let now = self.clock.now();
        let not_after = self.not_after(now);
        self.run_at(store, cancel, not_after, now)
    }

    /// Run one pass with an explicit `not_after` bound
    ///
    /// Returns the per-step report; [`PassReport::into_result`] turns it
    /// into the accumulated error.
    pub fn run<S: JanitorStore>(
        &mut self,
        store: &S,
        cancel: CancellationToken,
        not_after: DateTime<Utc>,
    ) -> PassReport {
        let now = self.clock.now();
        self.run_at(store, cancel, not_after, now)
    }

    fn run_at<S: JanitorStore>(
        &mut self,
        store: &S,
        cancel: CancellationToken,
        not_after: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> PassReport {
        self.state = JanitorState::Running;
        let start = Instant::now();

        let ctx = FlushContext::new(now)
            .with_overlay(self.overlay)
            .with_cancellation(cancel);

        tracing::info!(
            "Janitor pass started (now: {}, not after: {})",
            now,
            not_after
        );

        let mut steps = Vec::with_capacity(Step::ALL.len());
        for step in Step::ALL {
            if !self.config.steps.includes(step) {
                continue;
            }
            if ctx.is_cancelled() {
                tracing::warn!("Step {} skipped: pass cancelled", step);
                steps.push(StepReport::skipped(step));
                continue;
            }

            let report = self.run_step(store, &ctx, step, not_after);
            tracing::info!("Step {} finished: {} deleted", step, report.deleted);
            steps.push(report);
        }

        let report = PassReport {
            now,
            not_after,
            steps,
            elapsed: start.elapsed(),
        };
        self.metrics.record_pass(&report);
        self.state = JanitorState::Idle;

        tracing::info!(
            "Janitor pass finished: {} deleted in {:?}",
            report.total_deleted(),
            report.elapsed
        );
        report
    }

    fn run_step<S: JanitorStore>(
        &self,
        store: &S,
        ctx: &FlushContext,
        step: Step,
        not_after: DateTime<Utc>,
    ) -> StepReport {
        match step {
            Step::LoginConsent => self.flusher.flush(step, ctx, |limit, batch| {
                store.flush_inactive_login_consent_requests(ctx, not_after, limit, batch)
            }),
            Step::AccessTokens => self.flusher.flush(step, ctx, |limit, batch| {
                store.flush_inactive_access_tokens(ctx, not_after, limit, batch)
            }),
            Step::RefreshTokens => self.flusher.flush(step, ctx, |limit, batch| {
                store.flush_inactive_refresh_tokens(ctx, not_after, limit, batch)
            }),
            Step::TrustGrants => self.flusher.flush(step, ctx, |limit, batch| {
                store.flush_inactive_grants(ctx, not_after, limit, batch)
            }),
        }
    }
}

//! Flush context - per-pass state handed to every store call

use crate::lifespan::{LifespanKind, LifespanOverlay};
use crate::LifespanPolicy;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// Snapshot of everything a flush call needs beyond its arguments
///
/// `now` is captured once per pass so every step agrees on the lifespan
/// cutoffs. Cancellation is observed at batch boundaries.
#[derive(Debug, Clone)]
pub struct FlushContext {
    now: DateTime<Utc>,
    overlay: LifespanOverlay,
    cancel: CancellationToken,
}

impl FlushContext {
    /// Context for `now` with no overrides and a fresh cancellation token
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            overlay: LifespanOverlay::none(),
            cancel: CancellationToken::new(),
        }
    }

    /// Apply per-call lifespan overrides
    pub fn with_overlay(mut self, overlay: LifespanOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Observe an external cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The pass's "now"
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Per-call lifespan overrides
    pub fn overlay(&self) -> &LifespanOverlay {
        &self.overlay
    }

    /// The cancellation token
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Has the pass been cancelled?
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Lifespan cutoff for a class under `policy`
    pub fn cutoff(&self, policy: &LifespanPolicy, kind: LifespanKind) -> DateTime<Utc> {
        policy.cutoff(kind, self.now, &self.overlay)
    }
}

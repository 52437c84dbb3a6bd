//! Batched flush driver shared by every step

use crate::{JanitorError, Step, StepFailure, StepReport};
use std::fmt::Display;
use warden_domain::{FlushContext, StoreFailure};

/// Drives one store flush operation with validated limits
///
/// The batch size is clamped into `1..=limit`. By default the store is
/// invoked once per step; with more rounds it is invoked again while the
/// previous round hit the limit and the pass is not cancelled. Store errors
/// end the step and are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchedFlusher {
    limit: usize,
    batch_size: usize,
    rounds: usize,
}

impl Default for BatchedFlusher {
    /// Limit 100000, batch size 100, one round
    fn default() -> Self {
        Self {
            limit: 100_000,
            batch_size: 100,
            rounds: 1,
        }
    }
}

impl BatchedFlusher {
    /// Create a flusher; `limit` must be at least 1
    pub fn new(limit: usize, batch_size: usize) -> Result<Self, JanitorError> {
        if limit == 0 {
            return Err(JanitorError::Config("limit must be at least 1".into()));
        }
        let clamped = batch_size.clamp(1, limit);
        if clamped != batch_size {
            tracing::warn!(
                "Batch size {} clamped to {} (limit {})",
                batch_size,
                clamped,
                limit
            );
        }
        Ok(Self {
            limit,
            batch_size: clamped,
            rounds: 1,
        })
    }

    /// Allow up to `rounds` invocations per step (at least one)
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds.max(1);
        self
    }

    /// Maximum rows deleted per invocation
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Rows deleted per transaction
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Maximum invocations per step
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Run `op(limit, batch_size)` for `step`
    pub fn flush<F, E>(&self, step: Step, ctx: &FlushContext, mut op: F) -> StepReport
    where
        F: FnMut(usize, usize) -> Result<usize, E>,
        E: StoreFailure + Display,
    {
        let mut deleted = 0;

        for round in 1..=self.rounds {
            match op(self.limit, self.batch_size) {
                Ok(removed) => {
                    deleted += removed;
                    tracing::debug!(
                        "Step {} round {}/{}: {} deleted",
                        step,
                        round,
                        self.rounds,
                        removed
                    );
                    if removed < self.limit || ctx.is_cancelled() {
                        break;
                    }
                }
                Err(e) => {
                    let failure = StepFailure::from_store(step, deleted, &e);
                    tracing::error!("Step {} failed: {}", step, e);
                    return StepReport::failed(failure);
                }
            }
        }

        StepReport::completed(step, deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StepOutcome;
    use chrono::Utc;
    use std::fmt;
    use warden_domain::ErrorKind;

    #[derive(Debug)]
    struct FakeError {
        kind: ErrorKind,
        committed: usize,
    }

    impl fmt::Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake {} error", self.kind)
        }
    }

    impl StoreFailure for FakeError {
        fn kind(&self) -> ErrorKind {
            self.kind
        }

        fn committed(&self) -> usize {
            self.committed
        }
    }

    fn ctx() -> FlushContext {
        FlushContext::new(Utc::now())
    }

    #[test]
    fn test_default_matches_config_defaults() {
        let config = crate::JanitorConfig::default();
        let flusher = BatchedFlusher::default();
        assert_eq!(flusher.limit(), config.limit);
        assert_eq!(flusher.batch_size(), config.batch_size);
        assert_eq!(flusher.rounds(), config.rounds);
    }

    #[test]
    fn test_rejects_zero_limit() {
        assert!(BatchedFlusher::new(0, 10).unwrap_err().is_config());
    }

    #[test]
    fn test_clamps_batch_size() {
        assert_eq!(BatchedFlusher::new(5, 100).unwrap().batch_size(), 5);
        assert_eq!(BatchedFlusher::new(5, 0).unwrap().batch_size(), 1);
        assert_eq!(BatchedFlusher::new(500, 100).unwrap().batch_size(), 100);
    }

    #[test]
    fn test_single_round_by_default() {
        let flusher = BatchedFlusher::new(10, 5).unwrap();
        let mut calls = 0;
        let report = flusher.flush(Step::AccessTokens, &ctx(), |limit, batch| {
            calls += 1;
            assert_eq!((limit, batch), (10, 5));
            Ok::<_, FakeError>(10)
        });

        assert_eq!(calls, 1);
        assert_eq!(report, StepReport::completed(Step::AccessTokens, 10));
    }

    #[test]
    fn test_rounds_stop_when_limit_not_hit() {
        let flusher = BatchedFlusher::new(10, 5).unwrap().with_rounds(5);
        let mut remaining = 23;
        let report = flusher.flush(Step::RefreshTokens, &ctx(), |limit, _| {
            let removed = remaining.min(limit);
            remaining -= removed;
            Ok::<_, FakeError>(removed)
        });

        assert_eq!(report.deleted, 23);
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_rounds_stop_on_cancellation() {
        let flusher = BatchedFlusher::new(10, 5).unwrap().with_rounds(5);
        let ctx = ctx();
        let mut calls = 0;
        let report = flusher.flush(Step::TrustGrants, &ctx, |limit, _| {
            calls += 1;
            ctx.cancellation().cancel();
            Ok::<_, FakeError>(limit)
        });

        assert_eq!(calls, 1);
        assert_eq!(report.deleted, 10);
    }

    #[test]
    fn test_error_ends_step_without_retry() {
        let flusher = BatchedFlusher::new(10, 5).unwrap().with_rounds(3);
        let mut calls = 0;
        let report = flusher.flush(Step::LoginConsent, &ctx(), |limit, _| {
            calls += 1;
            if calls == 1 {
                Ok(limit)
            } else {
                Err(FakeError {
                    kind: ErrorKind::Storage,
                    committed: 3,
                })
            }
        });

        assert_eq!(calls, 2);
        // 10 from the first round, 3 committed before the failure
        assert_eq!(report.deleted, 13);
        match report.outcome {
            StepOutcome::Failed(failure) => {
                assert_eq!(failure.kind, ErrorKind::Storage);
                assert_eq!(failure.message, "fake storage error");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}

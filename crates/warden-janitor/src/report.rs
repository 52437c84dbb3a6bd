//! Per-step and per-pass outcomes

use crate::JanitorError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use warden_domain::{ErrorKind, StoreFailure};

/// One flush step of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Login requests, cascading to consent requests
    LoginConsent,
    /// Access-token sessions
    AccessTokens,
    /// Refresh-token sessions
    RefreshTokens,
    /// Trust grants
    TrustGrants,
}

impl Step {
    /// Every step, in execution order
    pub const ALL: [Step; 4] = [
        Step::LoginConsent,
        Step::AccessTokens,
        Step::RefreshTokens,
        Step::TrustGrants,
    ];

    /// Name printed in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::LoginConsent => "login_consent",
            Step::AccessTokens => "access_tokens",
            Step::RefreshTokens => "refresh_tokens",
            Step::TrustGrants => "trust_grants",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A store error, tagged with the step it ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    /// Step that failed
    pub step: Step,

    /// Error category
    pub kind: ErrorKind,

    /// Deletions committed by the step before it failed
    pub committed: usize,

    /// Rendered store error
    pub message: String,
}

impl StepFailure {
    /// Wrap a store error; `earlier` counts deletions from previous rounds
    pub fn from_store<E>(step: Step, earlier: usize, err: &E) -> Self
    where
        E: StoreFailure + fmt::Display,
    {
        Self {
            step,
            kind: err.kind(),
            committed: earlier + err.committed(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({}): {}", self.step, self.kind, self.message)
    }
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Ran to completion
    Completed,
    /// Stopped on a store error
    Failed(StepFailure),
    /// Not started because the pass was cancelled
    Skipped,
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Which step
    pub step: Step,

    /// Rows deleted (committed), including those before a failure
    pub deleted: usize,

    /// How the step ended
    pub outcome: StepOutcome,
}

impl StepReport {
    /// A step that ran to completion
    pub fn completed(step: Step, deleted: usize) -> Self {
        Self {
            step,
            deleted,
            outcome: StepOutcome::Completed,
        }
    }

    /// A step that stopped on an error
    pub fn failed(failure: StepFailure) -> Self {
        Self {
            step: failure.step,
            deleted: failure.committed,
            outcome: StepOutcome::Failed(failure),
        }
    }

    /// A step that never started
    pub fn skipped(step: Step) -> Self {
        Self {
            step,
            deleted: 0,
            outcome: StepOutcome::Skipped,
        }
    }

    /// Error category, if the step did not complete
    ///
    /// Skipped steps count as cancelled.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            StepOutcome::Completed => None,
            StepOutcome::Failed(failure) => Some(failure.kind),
            StepOutcome::Skipped => Some(ErrorKind::Cancelled),
        }
    }

    /// The failure, if any
    pub fn failure(&self) -> Option<&StepFailure> {
        match &self.outcome {
            StepOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Result of one pass over the selected steps
#[derive(Debug, Clone)]
pub struct PassReport {
    /// Snapshot of `now` shared by every step
    pub now: DateTime<Utc>,

    /// Caller bound the pass ran with
    pub not_after: DateTime<Utc>,

    /// Step reports in execution order
    pub steps: Vec<StepReport>,

    /// Wall time spent
    pub elapsed: Duration,
}

impl PassReport {
    /// Rows deleted across all steps
    pub fn total_deleted(&self) -> usize {
        self.steps.iter().map(|s| s.deleted).sum()
    }

    /// Report for one step, if it was selected
    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }

    /// Step failures in execution order
    pub fn failures(&self) -> impl Iterator<Item = &StepFailure> {
        self.steps.iter().filter_map(StepReport::failure)
    }

    /// Was the pass cut short by cancellation?
    pub fn is_cancelled(&self) -> bool {
        self.steps
            .iter()
            .any(|s| s.error_kind() == Some(ErrorKind::Cancelled))
    }

    /// Did every selected step complete?
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.outcome == StepOutcome::Completed)
    }

    /// The accumulated error of this pass, if any
    pub fn error(&self) -> Option<JanitorError> {
        if self.is_success() {
            return None;
        }
        if self.is_cancelled() {
            return Some(JanitorError::Cancelled {
                deleted: self.total_deleted(),
                failures: self
                    .failures()
                    .filter(|f| f.kind != ErrorKind::Cancelled)
                    .cloned()
                    .collect(),
            });
        }
        Some(JanitorError::Pass {
            failures: self.failures().cloned().collect(),
        })
    }

    /// `Ok(self)` when every step completed, the accumulated error otherwise
    pub fn into_result(self) -> Result<Self, JanitorError> {
        match self.error() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

//! Metrics collection for Janitor operations

use crate::{PassReport, Step, StepOutcome};
use std::collections::HashMap;
use std::time::Duration;

/// Metrics accumulated across janitor passes
///
/// Tracks rows deleted, failures and skips per step, plus pass count and
/// runtime.
#[derive(Debug, Clone, Default)]
pub struct JanitorMetrics {
    /// Rows deleted per step
    pub deleted: HashMap<Step, usize>,

    /// Failed runs per step
    pub failures: HashMap<Step, usize>,

    /// Runs skipped by cancellation per step
    pub skipped: HashMap<Step, usize>,

    /// Total passes completed
    pub pass_count: usize,

    /// Total runtime
    pub total_runtime: Duration,
}

impl JanitorMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record rows deleted by a step
    pub fn record_deletion(&mut self, step: Step, count: usize) {
        *self.deleted.entry(step).or_insert(0) += count;
    }

    /// Record a failed step
    pub fn record_failure(&mut self, step: Step) {
        *self.failures.entry(step).or_insert(0) += 1;
    }

    /// Record a skipped step
    pub fn record_skip(&mut self, step: Step) {
        *self.skipped.entry(step).or_insert(0) += 1;
    }

    /// Fold a whole pass into the counters
    pub fn record_pass(&mut self, report: &PassReport) {
        for step in &report.steps {
            self.record_deletion(step.step, step.deleted);
            match step.outcome {
                StepOutcome::Completed => {}
                StepOutcome::Failed(_) => self.record_failure(step.step),
                StepOutcome::Skipped => self.record_skip(step.step),
            }
        }
        self.pass_count += 1;
        self.total_runtime += report.elapsed;
    }

    /// Total rows deleted across all steps
    pub fn total_deleted(&self) -> usize {
        self.deleted.values().sum()
    }

    /// Total failed step runs
    pub fn total_failures(&self) -> usize {
        self.failures.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        self.deleted.clear();
        self.failures.clear();
        self.skipped.clear();
        self.pass_count = 0;
        self.total_runtime = Duration::ZERO;
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Janitor Metrics Summary".to_string(),
            "=======================".to_string(),
            format!("Passes: {}", self.pass_count),
            format!("Total runtime: {:.3}s", self.total_runtime.as_secs_f64()),
            String::new(),
        ];

        if !self.deleted.is_empty() {
            lines.push("Deletions by step:".to_string());
            for step in Step::ALL {
                if let Some(count) = self.deleted.get(&step) {
                    lines.push(format!("  {}: {}", step, count));
                }
            }
            lines.push(format!("  Total: {}", self.total_deleted()));
            lines.push(String::new());
        }

        if !self.failures.is_empty() {
            lines.push("Failures by step:".to_string());
            for step in Step::ALL {
                if let Some(count) = self.failures.get(&step) {
                    lines.push(format!("  {}: {}", step, count));
                }
            }
            lines.push(String::new());
        }

        if !self.skipped.is_empty() {
            lines.push("Skipped by step:".to_string());
            for step in Step::ALL {
                if let Some(count) = self.skipped.get(&step) {
                    lines.push(format!("  {}: {}", step, count));
                }
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StepFailure, StepReport};
    use chrono::Utc;
    use warden_domain::ErrorKind;

    fn pass(steps: Vec<StepReport>) -> PassReport {
        PassReport {
            now: Utc::now(),
            not_after: Utc::now(),
            steps,
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = JanitorMetrics::new();
        assert_eq!(metrics.total_deleted(), 0);
        assert_eq!(metrics.total_failures(), 0);
        assert_eq!(metrics.pass_count, 0);
    }

    #[test]
    fn test_record_deletion() {
        let mut metrics = JanitorMetrics::new();
        metrics.record_deletion(Step::AccessTokens, 5);
        metrics.record_deletion(Step::RefreshTokens, 3);
        metrics.record_deletion(Step::AccessTokens, 2);

        assert_eq!(metrics.deleted[&Step::AccessTokens], 7);
        assert_eq!(metrics.deleted[&Step::RefreshTokens], 3);
        assert_eq!(metrics.total_deleted(), 10);
    }

    #[test]
    fn test_record_pass() {
        let mut metrics = JanitorMetrics::new();
        metrics.record_pass(&pass(vec![
            StepReport::completed(Step::LoginConsent, 4),
            StepReport::failed(StepFailure {
                step: Step::AccessTokens,
                kind: ErrorKind::Storage,
                committed: 1,
                message: "locked".to_string(),
            }),
            StepReport::skipped(Step::RefreshTokens),
        ]));

        assert_eq!(metrics.pass_count, 1);
        assert_eq!(metrics.total_deleted(), 5);
        assert_eq!(metrics.failures[&Step::AccessTokens], 1);
        assert_eq!(metrics.skipped[&Step::RefreshTokens], 1);
        assert_eq!(metrics.total_runtime, Duration::from_millis(1500));
    }

    #[test]
    fn test_reset() {
        let mut metrics = JanitorMetrics::new();
        metrics.record_deletion(Step::TrustGrants, 10);
        metrics.record_failure(Step::TrustGrants);
        metrics.pass_count = 3;

        metrics.reset();

        assert_eq!(metrics.total_deleted(), 0);
        assert_eq!(metrics.total_failures(), 0);
        assert_eq!(metrics.pass_count, 0);
    }

    #[test]
    fn test_summary() {
        let mut metrics = JanitorMetrics::new();
        metrics.record_pass(&pass(vec![
            StepReport::completed(Step::LoginConsent, 5),
            StepReport::completed(Step::TrustGrants, 1),
        ]));

        let summary = metrics.summary();
        assert!(summary.contains("Passes: 1"));
        assert!(summary.contains("Total runtime: 1.500s"));
        assert!(summary.contains("login_consent: 5"));
        assert!(summary.contains("trust_grants: 1"));
        assert!(summary.contains("Total: 6"));
    }
}

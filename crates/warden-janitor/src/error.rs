//! Error types for Janitor operations

use crate::StepFailure;
use thiserror::Error;
use warden_domain::ErrorKind;

/// Errors that can occur during Janitor operations
#[derive(Error, Debug)]
pub enum JanitorError {
    /// Configuration error, raised before any step runs
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML
    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// One or more steps failed; the others still ran
    #[error("{} step(s) failed: {}", .failures.len(), render(.failures))]
    Pass {
        /// Failures in execution order
        failures: Vec<StepFailure>,
    },

    /// The pass was cancelled; remaining steps were skipped
    #[error("Janitor pass cancelled after {deleted} deletions{}", also_failed(.failures))]
    Cancelled {
        /// Rows deleted before cancellation took effect
        deleted: usize,
        /// Storage failures of steps that ran before cancellation
        failures: Vec<StepFailure>,
    },
}

impl JanitorError {
    /// Store error category, where one applies
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            JanitorError::Config(_) | JanitorError::Io(_) | JanitorError::Toml(_) => None,
            JanitorError::Pass { failures } => failures.iter().map(|f| f.kind).max_by_key(severity),
            JanitorError::Cancelled { .. } => Some(ErrorKind::Cancelled),
        }
    }

    /// Is this a configuration problem?
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            JanitorError::Config(_) | JanitorError::Io(_) | JanitorError::Toml(_)
        )
    }
}

fn severity(kind: &ErrorKind) -> u8 {
    match kind {
        ErrorKind::NotFound => 0,
        ErrorKind::Storage => 1,
        ErrorKind::Cancelled => 2,
    }
}

fn also_failed(failures: &[StepFailure]) -> String {
    if failures.is_empty() {
        String::new()
    } else {
        format!(" ({} step(s) also failed: {})", failures.len(), render(failures))
    }
}

fn render(failures: &[StepFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Step;

    #[test]
    fn test_pass_error_lists_every_step() {
        let err = JanitorError::Pass {
            failures: vec![
                StepFailure {
                    step: Step::AccessTokens,
                    kind: ErrorKind::Storage,
                    committed: 0,
                    message: "disk I/O error".to_string(),
                },
                StepFailure {
                    step: Step::TrustGrants,
                    kind: ErrorKind::Storage,
                    committed: 2,
                    message: "database is locked".to_string(),
                },
            ],
        };

        let message = err.to_string();
        assert!(message.starts_with("2 step(s) failed"));
        assert!(message.contains("access_tokens"));
        assert!(message.contains("trust_grants"));
        assert_eq!(err.kind(), Some(ErrorKind::Storage));
    }

    #[test]
    fn test_cancelled_error_lists_earlier_failures() {
        let err = JanitorError::Cancelled {
            deleted: 3,
            failures: vec![StepFailure {
                step: Step::LoginConsent,
                kind: ErrorKind::Storage,
                committed: 3,
                message: "disk I/O error".to_string(),
            }],
        };

        let message = err.to_string();
        assert!(message.starts_with("Janitor pass cancelled after 3 deletions"));
        assert!(message.contains("login_consent"));
        assert_eq!(err.kind(), Some(ErrorKind::Cancelled));

        let clean = JanitorError::Cancelled {
            deleted: 0,
            failures: Vec::new(),
        };
        assert_eq!(clean.to_string(), "Janitor pass cancelled after 0 deletions");
    }

    #[test]
    fn test_config_errors_have_no_kind() {
        let err = JanitorError::Config("limit must be at least 1".to_string());
        assert!(err.is_config());
        assert_eq!(err.kind(), None);
    }
}

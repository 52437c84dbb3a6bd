//! Report formatting for the CLI.

use crate::cli::CliFormat;
use crate::error::{kind_exit_code, EXIT_SUCCESS};
use warden_janitor::{PassReport, StepReport};

/// Report formatter.
pub struct Formatter {
    format: CliFormat,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: CliFormat) -> Self {
        Self { format }
    }

    /// Format one line per step that ran (or was skipped).
    pub fn format_pass(&self, report: &PassReport) -> String {
        report
            .steps
            .iter()
            .map(|step| self.format_step(step))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format a single step.
    pub fn format_step(&self, step: &StepReport) -> String {
        let err = step.error_kind().map(|k| k.as_str()).unwrap_or("none");
        match self.format {
            CliFormat::Text => format!("step={} deleted={} err={}", step.step, step.deleted, err),
            CliFormat::Json => serde_json::json!({
                "step": step.step.as_str(),
                "deleted": step.deleted,
                "err": err,
                "message": step.failure().map(|f| f.message.as_str()),
            })
            .to_string(),
        }
    }
}

/// Highest exit code observed across the steps of a pass.
pub fn pass_exit_code(report: &PassReport) -> u8 {
    report
        .steps
        .iter()
        .filter_map(StepReport::error_kind)
        .map(kind_exit_code)
        .max()
        .unwrap_or(EXIT_SUCCESS)
}

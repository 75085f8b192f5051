// Sweep error taxonomy
//
// Every failure is fatal for the sweep. The variants only exist so the CLI can
// pick an exit code and print an actionable hint.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating or executing a sweep
#[derive(Debug, Error)]
pub enum SweepError {
    /// Bad base run name, empty sweep, or colliding run specifications
    #[error("Invalid sweep: {0}")]
    InvalidSweep(String),

    /// Configuration file or environment override could not be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// Trainer process could not be started at all
    #[error("Failed to start training program '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Trainer ran but exited unsuccessfully
    #[error("Training run '{run_name}' failed ({})", describe_exit(.code))]
    LaunchFailure { run_name: String, code: Option<i32> },

    /// Trainer exited cleanly but left no readable metrics file
    #[error("Metrics file {} is missing or unreadable: {source}", .path.display())]
    MetricsMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Leftover metrics file from an earlier invocation could not be removed
    #[error("Could not remove stale metrics file {}: {source}", .path.display())]
    StaleMetrics {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying the metrics file to remote storage failed
    #[error("Failed to archive {} to {remote}: {reason}", .local.display())]
    ArchiveFailure {
        local: PathBuf,
        remote: String,
        reason: String,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl SweepError {
    /// Process exit code for this failure.
    ///
    /// A failing trainer's own exit code is propagated; input problems use 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            SweepError::InvalidSweep(_) | SweepError::Config(_) => 2,
            SweepError::LaunchFailure {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// Short hint shown under the error message
    pub fn suggestion(&self) -> &'static str {
        match self {
            SweepError::InvalidSweep(_) => {
                "Use a base run name without spaces, '/', '\\' or '=', and give every run a distinct suffix and metrics file."
            }
            SweepError::Config(_) => {
                "Check QUANT_SWEEP_CONFIG, ~/.quant-sweep/config.toml and the QUANT_SWEEP_* environment variables."
            }
            SweepError::Spawn { .. } => {
                "Make sure the training program is installed and on PATH (trainer.program in the config)."
            }
            SweepError::LaunchFailure { .. } => {
                "Scroll up for the trainer's own output. Later runs were not started."
            }
            SweepError::MetricsMissing { .. } => {
                "The trainer exited cleanly but did not write metrics_file. Check trainer.working_dir."
            }
            SweepError::StaleMetrics { .. } => {
                "Delete the old metrics file by hand or fix the working directory permissions."
            }
            SweepError::ArchiveFailure { .. } => {
                "Check storage credentials (e.g. `gcloud auth login`) and that the bucket root exists."
            }
        }
    }
}

/// Append a highlighted suggestion to an error message
pub fn wrap_error_with_suggestion(error: impl fmt::Display, suggestion: &str) -> String {
    format!(
        "{}\n\n\
        \x1b[1;33mSuggestion:\x1b[0m {}",
        error, suggestion
    )
}

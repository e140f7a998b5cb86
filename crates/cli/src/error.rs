//! Error types for CLI operations.

use contracts::ContextError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Manifest file not found
    #[error("Manifest not found: {path}")]
    ConfigNotFound { path: String },

    /// One or more jobs did not succeed
    #[error("{failed} of {total} jobs failed")]
    JobsFailed { failed: usize, total: usize },

    /// The run was stopped before every job finished
    #[error("Run interrupted after {completed} of {total} jobs")]
    Interrupted { completed: u64, total: usize },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Failure of a single command job
#[derive(Error, Debug)]
pub enum CommandError {
    /// The process could not be started
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the process failed
    #[error("failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    /// The process exited unsuccessfully
    #[error("process exited with {}", describe_exit(.code))]
    Exit { code: Option<i32> },

    /// The job's context (or the whole run) was cancelled or timed out
    #[error("process stopped: {0}")]
    Interrupted(ContextError),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

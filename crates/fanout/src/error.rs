//! Fanout error types

use thiserror::Error;

/// Boxed error returned by work functions
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Per-job failure, delivered to the error handler exactly once per failing job
#[derive(Debug, Error)]
pub enum FanoutError {
    /// The work function returned an error
    #[error("job '{meta}' failed: {source}")]
    Worker {
        meta: String,
        #[source]
        source: BoxError,
    },

    /// Neither a shared context nor a positive timeout was configured;
    /// the work function was not called
    #[error("invalid context passed into the fanout function (job '{meta}')")]
    InvalidContext { meta: String },

    /// The work function panicked
    #[error("job '{meta}' panicked: {message}")]
    WorkerPanicked { meta: String, message: String },

    /// The job task was cancelled by the runtime before it finished
    #[error("job '{meta}' was aborted before completion")]
    Aborted { meta: String },
}

impl FanoutError {
    /// Create a worker failure error
    pub fn worker(meta: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Worker {
            meta: meta.into(),
            source: source.into(),
        }
    }

    /// Create an invalid context error
    pub fn invalid_context(meta: impl Into<String>) -> Self {
        Self::InvalidContext { meta: meta.into() }
    }

    /// Identifier of the job that failed
    pub fn meta(&self) -> &str {
        match self {
            Self::Worker { meta, .. }
            | Self::InvalidContext { meta }
            | Self::WorkerPanicked { meta, .. }
            | Self::Aborted { meta } => meta,
        }
    }

    pub fn is_invalid_context(&self) -> bool {
        matches!(self, Self::InvalidContext { .. })
    }

    pub fn is_worker_failure(&self) -> bool {
        matches!(self, Self::Worker { .. })
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::WorkerPanicked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_error_keeps_original_message() {
        let err = FanoutError::worker("job1", "job failed job1");
        assert_eq!(err.meta(), "job1");
        assert!(err.is_worker_failure());
        assert!(err.to_string().contains("job failed job1"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_context_display() {
        let err = FanoutError::invalid_context("42");
        assert!(err.is_invalid_context());
        assert!(err
            .to_string()
            .contains("invalid context passed into the fanout function"));
    }
}

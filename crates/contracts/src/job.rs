//! Job - the unit of work handed to a worker
//!
//! The engine only needs a short identifier from a job, for diagnostics.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Anything that can be dispatched by the fan-out engine.
///
/// The identifier is attached to every error reported for the job.
pub trait JobMeta {
    /// Short identifier used in logs and error reports
    fn meta(&self) -> &str;
}

/// Minimal job: an identifier and nothing else.
///
/// # Examples
/// ```
/// use contracts::{Job, JobMeta};
///
/// let job = Job::new("job 1");
/// assert_eq!(job.meta(), "job 1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    /// Diagnostic identifier
    pub meta: String,
}

impl Job {
    /// Create a job with the given identifier
    pub fn new(meta: impl Into<String>) -> Self {
        Self { meta: meta.into() }
    }
}

impl JobMeta for Job {
    fn meta(&self) -> &str {
        &self.meta
    }
}

impl<T: JobMeta + ?Sized> JobMeta for Box<T> {
    fn meta(&self) -> &str {
        (**self).meta()
    }
}

impl<T: JobMeta + ?Sized> JobMeta for Arc<T> {
    fn meta(&self) -> &str {
        (**self).meta()
    }
}

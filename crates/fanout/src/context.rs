//! Per-job execution context resolution
//!
//! The policy is fixed for a call, but resolution happens inside the worker
//! for every job, so per-job deadlines start when that job starts.

use std::time::Duration;

use contracts::ExecutionContext;

use crate::error::FanoutError;

/// How a worker obtains the context for each job
#[derive(Debug, Clone)]
pub enum ContextPolicy {
    /// Every invocation receives this same context
    Shared(ExecutionContext),
    /// Every invocation receives a fresh context expiring `Duration` after the job starts
    PerJobTimeout(Duration),
    /// No usable context: jobs are reported as failed without running
    Unavailable,
}

impl ContextPolicy {
    /// A shared context wins over a timeout; a zero timeout counts as absent
    pub fn new(shared: Option<&ExecutionContext>, timeout: Option<Duration>) -> Self {
        match (shared, timeout) {
            (Some(ctx), _) => Self::Shared(ctx.clone()),
            (None, Some(timeout)) if !timeout.is_zero() => Self::PerJobTimeout(timeout),
            _ => Self::Unavailable,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Shared(_) => "shared",
            Self::PerJobTimeout(_) => "per_job_timeout",
            Self::Unavailable => "unavailable",
        }
    }

    /// Resolve the context for one job
    ///
    /// # Errors
    /// [`FanoutError::InvalidContext`] under [`ContextPolicy::Unavailable`].
    pub fn resolve(&self, meta: &str) -> Result<ResolvedContext, FanoutError> {
        match self {
            Self::Shared(ctx) => Ok(ResolvedContext {
                ctx: ctx.clone(),
                owned: false,
            }),
            Self::PerJobTimeout(timeout) => Ok(ResolvedContext {
                ctx: ExecutionContext::with_timeout(*timeout),
                owned: true,
            }),
            Self::Unavailable => Err(FanoutError::invalid_context(meta)),
        }
    }
}

/// Context resolved for a single invocation
///
/// A context created for the invocation is cancelled when this is dropped;
/// a shared context is left alone.
#[derive(Debug)]
pub struct ResolvedContext {
    ctx: ExecutionContext,
    owned: bool,
}

impl ResolvedContext {
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Whether the context was created for this invocation only
    pub fn is_owned(&self) -> bool {
        self.owned
    }
}

impl Drop for ResolvedContext {
    fn drop(&mut self) {
        if self.owned {
            self.ctx.cancel();
        }
    }
}

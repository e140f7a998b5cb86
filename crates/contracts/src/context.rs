//! ExecutionContext - cancellation/deadline carrier passed to every job
//!
//! Clones share the same cancellation state. Children observe their parent's
//! cancellation but cancelling a child leaves the parent untouched.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::ContextError;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Cancellation and deadline handle for a job invocation.
///
/// A context is done once it is cancelled or its deadline has passed.
/// Work functions are expected to observe this and return promptly; nothing
/// interrupts them forcibly.
///
/// # Examples
/// ```
/// use contracts::{ContextError, ExecutionContext};
///
/// let ctx = ExecutionContext::new();
/// let clone = ctx.clone();
/// assert!(ctx.same_as(&clone));
///
/// clone.cancel();
/// assert_eq!(ctx.err(), Some(ContextError::Cancelled));
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    id: u64,
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecutionContext {
    /// Context without a deadline; done only when cancelled
    pub fn new() -> Self {
        Self::from_parts(CancellationToken::new(), None)
    }

    /// Context whose deadline is `timeout` from now
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::from_parts(CancellationToken::new(), deadline_after(timeout))
    }

    /// Context with an absolute deadline
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::from_parts(CancellationToken::new(), Some(deadline))
    }

    /// Derived context that inherits cancellation and deadline
    pub fn child(&self) -> Self {
        Self::from_parts(self.token.child_token(), self.deadline)
    }

    /// Derived context whose deadline is the earlier of the parent's and `timeout` from now
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, deadline_after(timeout)) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => parent.or(own),
        };
        Self::from_parts(self.token.child_token(), deadline)
    }

    fn from_parts(token: CancellationToken, deadline: Option<Instant>) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            token,
            deadline,
        }
    }

    /// Process-unique identity; clones keep it, children get a new one
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether `other` is this very context (or a clone of it)
    pub fn same_as(&self, other: &Self) -> bool {
        self.id == other.id
    }

    /// Cancel this context, its clones and all children
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline (zero once passed)
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Reason the context is done, or `None` while it is still live
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Wait until the context is done
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => ContextError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }

    /// Drive `fut` until it completes or the context is done, whichever comes first
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = fut => Ok(output),
        }
    }
}

fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

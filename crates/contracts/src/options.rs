//! FanoutOptions - per-call engine configuration

use std::num::NonZeroUsize;
use std::time::Duration;

/// Engine configuration for a single fan-out call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutOptions {
    /// Number of concurrent workers
    pub parallelism: NonZeroUsize,

    /// Per-job timeout, used only when no shared context is supplied
    pub timeout: Option<Duration>,
}

impl FanoutOptions {
    pub fn new(parallelism: NonZeroUsize) -> Self {
        Self {
            parallelism,
            timeout: None,
        }
    }

    /// Set the per-job timeout; a zero duration means "no timeout"
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Set the per-job timeout in whole seconds; zero means "no timeout"
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        self.with_timeout(Duration::from_secs(secs))
    }
}

impl Default for FanoutOptions {
    fn default() -> Self {
        Self::new(std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
    }
}

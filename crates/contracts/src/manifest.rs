//! FanoutManifest - Config Loader output
//!
//! Describes a complete fan-out run: engine settings plus the job list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::{ContractError, FanoutOptions, JobMeta};

/// Manifest version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete manifest for a fan-out run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutManifest {
    /// Manifest version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Engine settings
    pub fanout: FanoutSettings,

    /// Jobs, in submission order
    #[serde(default)]
    pub jobs: Vec<CommandJob>,
}

/// Engine settings as written in a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutSettings {
    /// Number of concurrent workers (must be >= 1)
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Per-job timeout in seconds (0 = none)
    #[serde(default)]
    pub timeout_secs: u64,

    /// Run every job under one shared context instead of per-job timeouts
    #[serde(default)]
    pub shared_context: bool,

    /// Deadline of the shared context in seconds (0 = none)
    #[serde(default)]
    pub shared_deadline_secs: u64,
}

fn default_parallelism() -> usize {
    4
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            timeout_secs: 0,
            shared_context: false,
            shared_deadline_secs: 0,
        }
    }
}

impl FanoutSettings {
    /// Convert to engine options
    ///
    /// # Errors
    /// Returns a validation error when `parallelism` is zero.
    pub fn options(&self) -> Result<FanoutOptions, ContractError> {
        let parallelism = NonZeroUsize::new(self.parallelism).ok_or_else(|| {
            ContractError::config_validation("fanout.parallelism", "parallelism must be >= 1")
        })?;
        Ok(FanoutOptions::new(parallelism).with_timeout_secs(self.timeout_secs))
    }

    /// Deadline of the shared context, if any
    pub fn shared_deadline(&self) -> Option<Duration> {
        (self.shared_deadline_secs > 0).then(|| Duration::from_secs(self.shared_deadline_secs))
    }
}

/// A job that runs an external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandJob {
    /// Diagnostic identifier (unique within a manifest)
    pub meta: String,

    /// Program to execute
    pub program: String,

    /// Program arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory (defaults to the current one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl JobMeta for CommandJob {
    fn meta(&self) -> &str {
        &self.meta
    }
}

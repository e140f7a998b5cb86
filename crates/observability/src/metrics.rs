//! Fan-out 指标收集与统计
//!
//! 将任务结果与运行汇总写入 `metrics`，并在内存中保留统计数据供运行结束时输出。

use std::collections::HashMap;
use std::time::Duration;

use fanout::{FanoutError, MetricsSnapshot};
use metrics::{counter, gauge, histogram};

/// Final status of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Succeeded,
    Failed,
    InvalidContext,
    Panicked,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::InvalidContext => "invalid_context",
            Self::Panicked => "panicked",
        }
    }

    /// Status implied by a reported error
    pub fn from_error(error: &FanoutError) -> Self {
        match error {
            FanoutError::Worker { .. } => Self::Failed,
            FanoutError::InvalidContext { .. } => Self::InvalidContext,
            FanoutError::WorkerPanicked { .. } | FanoutError::Aborted { .. } => Self::Panicked,
        }
    }
}

/// Record a single job outcome
pub fn record_job_outcome(status: JobStatus) {
    counter!("fanout_jobs_total", "status" => status.as_str()).increment(1);
}

/// Record how long one job ran
pub fn record_job_duration(duration: Duration) {
    histogram!("fanout_job_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// Record the summary of a completed fan-out call
pub fn record_run_summary(snapshot: &MetricsSnapshot, elapsed: Duration) {
    counter!("fanout_runs_total").increment(1);
    counter!("fanout_jobs_dispatched_total").increment(snapshot.dispatched);
    histogram!("fanout_run_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
    gauge!("fanout_peak_active_workers").set(snapshot.peak_active as f64);

    if snapshot.errors() > 0 {
        counter!("fanout_runs_with_errors_total").increment(1);
    }
}

/// In-memory statistics for one run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Jobs per final status
    pub by_status: HashMap<JobStatus, u64>,

    /// Job duration statistics (ms)
    pub durations: RunningStats,

    /// Slowest job seen (meta, ms)
    pub slowest: Option<(String, f64)>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one finished job
    pub fn record(&mut self, meta: &str, status: JobStatus, duration: Option<Duration>) {
        *self.by_status.entry(status).or_insert(0) += 1;

        if let Some(duration) = duration {
            let ms = duration.as_secs_f64() * 1000.0;
            self.durations.push(ms);
            match &self.slowest {
                Some((_, slowest)) if *slowest >= ms => {}
                _ => self.slowest = Some((meta.to_string(), ms)),
            }
        }
    }

    pub fn count(&self, status: JobStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.by_status.values().sum()
    }

    /// Percentage of jobs that did not succeed
    pub fn failure_rate(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            (total - self.count(JobStatus::Succeeded)) as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

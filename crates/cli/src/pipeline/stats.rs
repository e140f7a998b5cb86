//! Run report and end-of-run summary.

use std::fmt;
use std::time::Duration;

use fanout::MetricsSnapshot;
use observability::{JobStatus, RunStats, StatsSummary};

/// Outcome of a pipeline run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Number of jobs submitted
    pub total: usize,

    /// Per-status counts and job durations
    pub stats: RunStats,

    /// Engine counters at the end of the run
    pub snapshot: MetricsSnapshot,

    /// One message per failed job, in the order they were reported
    pub failures: Vec<String>,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Whether the run was cancelled (Ctrl+C or fail-fast)
    pub cancelled: bool,
}

impl RunReport {
    pub fn succeeded(&self) -> u64 {
        self.stats.count(JobStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Jobs completed per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.snapshot.completed() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("{}", self);
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Fan-out Statistics ===\n")?;

        writeln!(f, "Overview")?;
        writeln!(f, "   ├─ Duration: {:.2}s", self.duration.as_secs_f64())?;
        writeln!(f, "   ├─ Jobs: {}", self.total)?;
        writeln!(f, "   ├─ Succeeded: {}", self.succeeded())?;
        writeln!(f, "   ├─ Failed: {}", self.stats.count(JobStatus::Failed))?;
        writeln!(
            f,
            "   ├─ Invalid context: {}",
            self.stats.count(JobStatus::InvalidContext)
        )?;
        writeln!(f, "   ├─ Panicked: {}", self.stats.count(JobStatus::Panicked))?;
        writeln!(f, "   ├─ Failure rate: {:.1}%", self.stats.failure_rate())?;
        writeln!(f, "   ├─ Peak concurrency: {}", self.snapshot.peak_active)?;
        writeln!(f, "   └─ Throughput: {:.2} jobs/s", self.throughput())?;

        writeln!(f, "\nJob Durations (ms)")?;
        writeln!(f, "   ├─ {}", StatsSummary::from(&self.stats.durations))?;
        match &self.stats.slowest {
            Some((meta, ms)) => writeln!(f, "   └─ Slowest: {} ({:.1} ms)", meta, ms)?,
            None => writeln!(f, "   └─ Slowest: N/A")?,
        }

        if !self.failures.is_empty() {
            writeln!(f, "\nFailures ({})", self.failures.len())?;
            for (i, failure) in self.failures.iter().enumerate() {
                let prefix = if i + 1 == self.failures.len() { "└─" } else { "├─" };
                writeln!(f, "   {} {}", prefix, failure)?;
            }
        }

        if self.cancelled {
            writeln!(f, "\nRun was cancelled before all jobs finished")?;
        }

        Ok(())
    }
}

//! Pipeline orchestrator - runs a manifest's jobs through the fan-out engine.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{CommandJob, ExecutionContext, FanoutSettings};
use fanout::{ErrorHandler, Fanout, FanoutError};
use observability::{
    record_job_duration, record_job_outcome, record_run_summary, JobStatus, RunStats,
};
use tracing::{info, warn};

use super::command::run_command;
use super::RunReport;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Engine settings, with CLI overrides applied
    pub settings: FanoutSettings,

    /// Cancel the run after the first failure
    pub fail_fast: bool,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every job to completion.
    ///
    /// Cancelling `shutdown` stops in-flight processes and keeps queued jobs
    /// from starting; every job still produces a result.
    pub async fn run(
        self,
        jobs: Vec<CommandJob>,
        shutdown: ExecutionContext,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let settings = &self.config.settings;
        let options = settings.options().context("Invalid fan-out settings")?;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let shared = settings.shared_context.then(|| match settings.shared_deadline() {
            Some(deadline) => shutdown.child_with_timeout(deadline),
            None => shutdown.child(),
        });

        let total = jobs.len();
        info!(
            jobs = total,
            parallelism = options.parallelism.get(),
            timeout = ?options.timeout,
            shared = shared.is_some(),
            fail_fast = self.config.fail_fast,
            "Starting fan-out"
        );

        let stats = Arc::new(Mutex::new(RunStats::new()));

        let work = {
            let stats = Arc::clone(&stats);
            let shutdown = shutdown.clone();
            move |ctx: ExecutionContext, job: CommandJob| {
                let stats = Arc::clone(&stats);
                let shutdown = shutdown.clone();
                async move {
                    let job_started = Instant::now();
                    let meta = job.meta.clone();
                    let result = run_command(ctx, shutdown, job).await;
                    let elapsed = job_started.elapsed();

                    let status = match result {
                        Ok(()) => JobStatus::Succeeded,
                        Err(_) => JobStatus::Failed,
                    };
                    record_job_outcome(status);
                    record_job_duration(elapsed);
                    stats
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .record(&meta, status, Some(elapsed));

                    result
                }
            }
        };

        let mut fanout = Fanout::new(FailureHandler {
            stats: Arc::clone(&stats),
            failures: Vec::new(),
            fail_fast: self.config.fail_fast.then(|| shutdown.clone()),
        });

        fanout.run(shared.as_ref(), &options, jobs, work).await;

        let snapshot = fanout.metrics().snapshot();
        let failures = fanout.into_handler().failures;

        let elapsed = started.elapsed();
        record_run_summary(&snapshot, elapsed);

        let stats = std::mem::take(&mut *stats.lock().unwrap_or_else(PoisonError::into_inner));
        Ok(RunReport {
            total,
            stats,
            snapshot,
            failures,
            duration: elapsed,
            cancelled: shutdown.is_done(),
        })
    }
}

/// Records failures for the report and, with fail-fast, cancels the run
struct FailureHandler {
    stats: Arc<Mutex<RunStats>>,
    failures: Vec<String>,
    fail_fast: Option<ExecutionContext>,
}

impl ErrorHandler for FailureHandler {
    fn handle(&mut self, err: FanoutError) {
        let status = JobStatus::from_error(&err);
        // Failed jobs are accounted for by the work function itself
        if status != JobStatus::Failed {
            record_job_outcome(status);
            self.stats
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(err.meta(), status, None);
        }

        warn!(job = err.meta(), error = %err, "Job failed");
        self.failures.push(err.to_string());

        if let Some(shutdown) = self.fail_fast.as_ref().filter(|ctx| !ctx.is_done()) {
            warn!("Fail-fast enabled, cancelling remaining jobs");
            shutdown.cancel();
        }
    }
}

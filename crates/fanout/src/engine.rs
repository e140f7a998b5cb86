//! Fanout - runs a batch of jobs across a bounded worker pool

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{ExecutionContext, FanoutOptions, JobMeta};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::collector::collect;
use crate::context::ContextPolicy;
use crate::dispatcher::dispatch;
use crate::error::{BoxError, FanoutError};
use crate::handoff::{self, SharedReceiver};
use crate::metrics::FanoutMetrics;
use crate::worker::{worker_loop, Outcome, WorkerShared};

/// Receives every per-job failure, on the task that called [`Fanout::run`].
///
/// Handlers are never called concurrently, so they need no synchronization
/// of their own.
pub trait ErrorHandler {
    fn handle(&mut self, error: FanoutError);
}

impl<F: FnMut(FanoutError)> ErrorHandler for F {
    fn handle(&mut self, error: FanoutError) {
        self(error)
    }
}

/// Fan-out/fan-in engine.
///
/// The error handler is supplied at construction, so a failing job always has
/// somewhere to go. Each call starts a fresh worker pool; nothing is carried
/// over between calls except the cumulative [`FanoutMetrics`].
pub struct Fanout<H> {
    error_handler: H,
    metrics: Arc<FanoutMetrics>,
}

impl<H: ErrorHandler> Fanout<H> {
    pub fn new(error_handler: H) -> Self {
        Self {
            error_handler,
            metrics: Arc::new(FanoutMetrics::new()),
        }
    }

    /// Get engine metrics
    pub fn metrics(&self) -> &Arc<FanoutMetrics> {
        &self.metrics
    }

    /// Consume the engine, handing back the error handler and whatever it accumulated
    pub fn into_handler(self) -> H {
        self.error_handler
    }

    /// Run `jobs` with at most `parallelism` concurrent invocations of `work`.
    ///
    /// Context for each invocation:
    /// - `shared` if supplied, for every job, regardless of `timeout`
    /// - otherwise a fresh context per job expiring `timeout` after that job starts
    /// - otherwise no invocation; the job is reported as [`FanoutError::InvalidContext`]
    ///
    /// Returns once every job has produced a result. A shared context without
    /// a deadline lets a stuck work function block this call indefinitely.
    pub async fn fanout<J, F, Fut, E>(
        &mut self,
        shared: Option<&ExecutionContext>,
        timeout: Option<Duration>,
        jobs: Vec<J>,
        parallelism: NonZeroUsize,
        work: F,
    ) where
        J: JobMeta + Send + 'static,
        F: Fn(ExecutionContext, J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let mut options = FanoutOptions::new(parallelism);
        if let Some(timeout) = timeout {
            options = options.with_timeout(timeout);
        }
        self.run(shared, &options, jobs, work).await;
    }

    /// Same as [`Fanout::fanout`], with parallelism and timeout taken from `options`
    #[instrument(
        name = "fanout_run",
        skip_all,
        fields(jobs = jobs.len(), parallelism = options.parallelism.get())
    )]
    pub async fn run<J, F, Fut, E>(
        &mut self,
        shared: Option<&ExecutionContext>,
        options: &FanoutOptions,
        jobs: Vec<J>,
        work: F,
    ) where
        J: JobMeta + Send + 'static,
        F: Fn(ExecutionContext, J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let started = Instant::now();
        let expected = jobs.len();
        let policy = ContextPolicy::new(shared, options.timeout);
        info!(policy = policy.kind(), "Fan-out started");

        let worker_shared = Arc::new(WorkerShared {
            policy,
            work,
            metrics: Arc::clone(&self.metrics),
        });

        let (job_tx, job_rx) = handoff::channel::<J>();
        let job_rx = SharedReceiver::new(job_rx);
        let (result_tx, result_rx) = handoff::channel::<Outcome>();

        let workers: Vec<JoinHandle<()>> = (0..options.parallelism.get())
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    job_rx.clone(),
                    result_tx.clone(),
                    Arc::clone(&worker_shared),
                ))
            })
            .collect();
        drop(job_rx);
        drop(result_tx);

        let dispatcher = tokio::spawn(dispatch(jobs, job_tx, Arc::clone(&self.metrics)));

        let received = collect(result_rx, expected, &mut self.error_handler, &self.metrics).await;

        Self::join_tasks(dispatcher, workers).await;

        info!(
            received,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fan-out complete"
        );
    }

    async fn join_tasks(dispatcher: JoinHandle<usize>, workers: Vec<JoinHandle<()>>) {
        if let Err(e) = dispatcher.await {
            error!(error = ?e, "Dispatcher task panicked");
        }
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = ?e, "Worker task panicked");
            }
        }
    }
}

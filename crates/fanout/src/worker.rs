//! Worker - pulls jobs, resolves a context, runs the work function

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use contracts::{ExecutionContext, JobMeta};
use tracing::{debug, instrument, trace, warn, Instrument};

use crate::context::ContextPolicy;
use crate::error::{BoxError, FanoutError};
use crate::handoff::{HandoffSender, SharedReceiver};
use crate::metrics::FanoutMetrics;

/// Outcome of one job, as seen by the collector
pub(crate) type Outcome = Result<(), FanoutError>;

/// Everything a worker needs, shared by the whole pool
pub(crate) struct WorkerShared<F> {
    pub(crate) policy: ContextPolicy,
    pub(crate) work: F,
    pub(crate) metrics: Arc<FanoutMetrics>,
}

/// Worker task: loops until the dispatcher closes the job channel
#[instrument(name = "fanout_worker_loop", skip(jobs, results, shared))]
pub(crate) async fn worker_loop<J, F, Fut, E>(
    worker_id: usize,
    jobs: SharedReceiver<J>,
    results: HandoffSender<Outcome>,
    shared: Arc<WorkerShared<F>>,
) where
    J: JobMeta + Send + 'static,
    F: Fn(ExecutionContext, J) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    trace!("Worker started");
    let mut processed: u64 = 0;

    while let Some(job) = jobs.recv().await {
        let outcome = run_job(&shared, job).await;
        processed += 1;

        if results.send(outcome).await.is_err() {
            warn!("Result collector closed, worker stopping");
            break;
        }
    }

    trace!(jobs = processed, "Worker stopped");
}

/// Run a single job to completion and turn whatever happens into an [`Outcome`]
async fn run_job<J, F, Fut, E>(shared: &Arc<WorkerShared<F>>, job: J) -> Outcome
where
    J: JobMeta + Send + 'static,
    F: Fn(ExecutionContext, J) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    let meta = job.meta().to_owned();
    let task_shared = Arc::clone(shared);
    let task_meta = meta.clone();

    // Own task per invocation so a panic is caught at the join point,
    // context resolution included.
    let invocation = tokio::spawn(
        async move {
            let resolved = match task_shared.policy.resolve(&task_meta) {
                Ok(resolved) => resolved,
                Err(err) => {
                    warn!(job = %task_meta, "No valid execution context, job not run");
                    return Err(err);
                }
            };

            let _active = task_shared.metrics.enter();
            let result: Result<(), BoxError> = (task_shared.work)(resolved.context().clone(), job)
                .await
                .map_err(Into::into);
            result.map_err(|source| FanoutError::Worker {
                meta: task_meta,
                source,
            })
        }
        .in_current_span(),
    );

    let outcome = match invocation.await {
        Ok(outcome) => outcome,
        Err(join_err) if join_err.is_panic() => {
            let message = panic_message(join_err.into_panic());
            warn!(job = %meta, panic = %message, "Work function panicked");
            Err(FanoutError::WorkerPanicked { meta, message })
        }
        Err(_) => Err(FanoutError::Aborted { meta }),
    };

    debug!(ok = outcome.is_ok(), "Job finished");
    outcome
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "non-string panic payload".to_string(),
        },
    }
}

//! Dispatcher - feeds jobs to the worker pool in submission order

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::handoff::HandoffSender;
use crate::metrics::FanoutMetrics;

/// Hand every job to a worker, one at a time, in the given order.
///
/// Each send waits until some worker has taken the job. Dropping the sender
/// at the end is the end-of-input signal for idle workers.
///
/// Returns the number of jobs delivered.
#[instrument(name = "fanout_dispatch", skip_all, fields(jobs = jobs.len()))]
pub(crate) async fn dispatch<J>(
    jobs: Vec<J>,
    tx: HandoffSender<J>,
    metrics: Arc<FanoutMetrics>,
) -> usize {
    let total = jobs.len();
    let mut delivered = 0;

    for job in jobs {
        if tx.send(job).await.is_err() {
            warn!(delivered, total, "All workers stopped, dispatch aborted");
            break;
        }
        delivered += 1;
        metrics.inc_dispatched();
    }

    drop(tx);
    debug!(delivered, "Dispatch complete, input closed");

    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff;

    #[tokio::test]
    async fn test_dispatch_preserves_order() {
        let (tx, mut rx) = handoff::channel::<u32>();
        let metrics = Arc::new(FanoutMetrics::new());

        let task = tokio::spawn(dispatch(vec![1, 2, 3], tx, Arc::clone(&metrics)));

        let mut received = Vec::new();
        while let Some(job) = rx.recv().await {
            received.push(job);
        }

        assert_eq!(task.await.unwrap(), 3);
        assert_eq!(received, vec![1, 2, 3]);
        assert_eq!(metrics.dispatched(), 3);
    }

    #[tokio::test]
    async fn test_dispatch_stops_without_workers() {
        let (tx, rx) = handoff::channel::<u32>();
        drop(rx);

        let delivered = dispatch(vec![1, 2], tx, Arc::new(FanoutMetrics::new())).await;
        assert_eq!(delivered, 0);
    }
}

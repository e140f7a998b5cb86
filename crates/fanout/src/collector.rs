//! Result collector - fan-in on the calling task

use tracing::{debug, error};

use crate::engine::ErrorHandler;
use crate::handoff::HandoffReceiver;
use crate::metrics::FanoutMetrics;
use crate::worker::Outcome;

/// Receive exactly `expected` outcomes, routing each error to `handler`.
///
/// Outcomes arrive in completion order. The result channel is closed only
/// after the last expected outcome has been taken.
///
/// Returns the number of outcomes received.
pub(crate) async fn collect<H: ErrorHandler>(
    mut results: HandoffReceiver<Outcome>,
    expected: usize,
    handler: &mut H,
    metrics: &FanoutMetrics,
) -> usize {
    let mut received = 0;

    while received < expected {
        let Some(outcome) = results.recv().await else {
            error!(received, expected, "Result channel closed before all results arrived");
            break;
        };
        received += 1;

        match outcome {
            Ok(()) => metrics.inc_succeeded(),
            Err(err) => {
                metrics.record_failure(&err);
                debug!(job = err.meta(), error = %err, "Routing job failure to error handler");
                handler.handle(err);
            }
        }
    }

    results.close();
    received
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FanoutError;
    use crate::handoff;

    #[tokio::test]
    async fn test_collect_routes_errors_only() {
        let (tx, rx) = handoff::channel::<Outcome>();
        let metrics = FanoutMetrics::new();

        tokio::spawn(async move {
            tx.send(Ok(())).await.unwrap();
            tx.send(Err(FanoutError::worker("b", "boom"))).await.unwrap();
            tx.send(Ok(())).await.unwrap();
        });

        let mut errors = Vec::new();
        let mut handler = |err: FanoutError| errors.push(err.meta().to_string());
        let received = collect(rx, 3, &mut handler, &metrics).await;

        assert_eq!(received, 3);
        assert_eq!(errors, vec!["b".to_string()]);
        assert_eq!(metrics.succeeded(), 2);
        assert_eq!(metrics.failed(), 1);
    }

    #[tokio::test]
    async fn test_collect_stops_on_early_close() {
        let (tx, rx) = handoff::channel::<Outcome>();
        tokio::spawn(async move {
            tx.send(Ok(())).await.unwrap();
        });

        let mut handler = |_err: FanoutError| {};
        let received = collect(rx, 5, &mut handler, &FanoutMetrics::new()).await;
        assert_eq!(received, 1);
    }

    #[tokio::test]
    async fn test_collect_nothing_expected() {
        let (_tx, rx) = handoff::channel::<Outcome>();
        let mut handler = |_err: FanoutError| {};
        assert_eq!(collect(rx, 0, &mut handler, &FanoutMetrics::new()).await, 0);
    }
}

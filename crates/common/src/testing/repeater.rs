//! Helpers for observing repeater runs in tests

use std::time::Duration;

use crate::resilience::repeater::{DoneEvent, DoneReceiver, RetryEvent, RetryReceiver};

/// Everything a run published
#[derive(Debug)]
pub struct RunSummary<T, E> {
    pub done: DoneEvent<T, E>,
    pub retries: Vec<RetryEvent<E>>,
}

impl<T, E> RunSummary<T, E> {
    /// Retry ordinals in the order they were received.
    pub fn ordinals(&self) -> Vec<usize> {
        self.retries.iter().map(|event| event.attempt).collect()
    }
}

/// Wait for the completion record, then drain the notification stream
///
/// The notification stream is closed before the completion is published, so
/// draining after `done` sees every notification that was not dropped.
///
/// # Panics
///
/// Panics if the run does not complete within `timeout` or its task dies
/// without publishing a completion.
pub async fn collect_run<T, E>(
    done: DoneReceiver<T, E>,
    mut retries: RetryReceiver<E>,
    timeout: Duration,
) -> RunSummary<T, E> {
    let done = match tokio::time::timeout(timeout, done).await {
        Ok(Ok(event)) => event,
        Ok(Err(_)) => panic!("repeater task ended without a completion record"),
        Err(_) => panic!("repeater run did not complete within {timeout:?}"),
    };

    let mut collected = Vec::new();
    while let Some(event) = retries.recv().await {
        collected.push(event);
    }

    RunSummary { done, retries: collected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::repeater::{Context, Repeater, RepeaterError};

    #[tokio::test]
    async fn test_collect_run_gathers_retries_in_order() {
        let repeater = Repeater::<(), (), String>::new()
            .with_delays(vec![Duration::from_millis(1); 3])
            .with_operation(|_ctx, ()| async { Err("down".to_string()) });

        let (done, retries) = repeater.run(&Context::background(), ());
        let summary = collect_run(done, retries, Duration::from_secs(2)).await;

        assert_eq!(summary.ordinals(), vec![1, 2, 3]);
        assert!(matches!(
            summary.done.result,
            Err(RepeaterError::AttemptsExhausted { retries: 3 })
        ));
    }

    #[tokio::test]
    #[should_panic(expected = "did not complete")]
    async fn test_collect_run_times_out() {
        let repeater = Repeater::<(), (), String>::new()
            .with_duration_limits(Duration::ZERO, Duration::ZERO)
            .with_operation(|_ctx, ()| async {
                std::future::pending::<()>().await;
                Ok(())
            });

        let (done, retries) = repeater.run(&Context::background(), ());
        collect_run(done, retries, Duration::from_millis(20)).await;
    }
}

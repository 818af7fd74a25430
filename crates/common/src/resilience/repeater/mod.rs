//! Bounded retry scheduler with two nested time budgets
//!
//! A [`Repeater`] re-invokes a context-aware operation until a success
//! condition holds, the delay sequence runs out, or a time budget elapses.
//! [`Repeater::run`] returns immediately with two streams:
//!
//! - a completion stream ([`DoneReceiver`]) that yields exactly one
//!   [`DoneEvent`],
//! - a notification stream ([`RetryReceiver`]) with one best-effort
//!   [`RetryEvent`] per retry, closed before the completion is published.
//!
//! Notifications use `try_send` on a channel sized to the delay sequence, so
//! a slow consumer loses events instead of stalling the retry loop.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use keeper_common::resilience::repeater::{Context, Repeater};
//!
//! # async fn demo() {
//! let repeater = Repeater::<u32, u32, std::io::Error>::new()
//!     .with_operation(|_ctx: Context, input: u32| async move { Ok(input * 2) })
//!     .with_delays(vec![Duration::from_millis(100), Duration::from_millis(200)])
//!     .with_duration_limits(Duration::from_secs(1), Duration::from_secs(5));
//!
//! let (done, _retries) = repeater.run(&Context::background(), 21);
//! let event = done.await.expect("run task finished");
//! assert_eq!(event.result.ok(), Some(42));
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod events;
pub mod time;

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

pub use self::config::RepeaterConfig;
pub use self::constants::{
    DEFAULT_ATTEMPT_LIMIT, DEFAULT_DELAYS, DEFAULT_TOTAL_LIMIT, MAX_DURATION_LIMIT,
};
pub use self::context::{Context, ContextError};
pub use self::error::{RepeaterError, RepeaterResult};
pub use self::events::{DoneEvent, DoneReceiver, RetryEvent, RetryReceiver};
pub use self::time::{min_duration, remaining_until};
use crate::utils::serde::as_millis_u64;

type Operation<Tin, Tout, E> =
    Arc<dyn Fn(Context, Tin) -> BoxFuture<'static, Result<Tout, E>> + Send + Sync>;

type Condition<E> = Arc<dyn Fn(Option<&RepeaterError<E>>) -> bool + Send + Sync>;

/// Retry scheduler configuration
///
/// Holds only immutable configuration; every call to [`Repeater::run`]
/// starts an independent run with its own attempt counter and deadlines.
pub struct Repeater<Tin, Tout, E> {
    operation: Option<Operation<Tin, Tout, E>>,
    condition: Option<Condition<E>>,
    delays: Arc<[Duration]>,
    attempt_limit: Option<Duration>,
    total_limit: Option<Duration>,
}

impl<Tin, Tout, E> Repeater<Tin, Tout, E> {
    /// Scheduler with default delays and budgets and no operation.
    pub fn new() -> Self {
        Self {
            operation: None,
            condition: None,
            delays: Arc::from(DEFAULT_DELAYS.as_slice()),
            attempt_limit: Some(DEFAULT_ATTEMPT_LIMIT),
            total_limit: Some(DEFAULT_TOTAL_LIMIT),
        }
    }

    /// Set the operation to retry.
    ///
    /// The operation receives a per-attempt [`Context`] that is cancelled or
    /// expires together with the attempt, plus a clone of the run input.
    pub fn with_operation<F, Fut>(mut self, operation: F) -> Self
    where
        F: Fn(Context, Tin) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Tout, E>> + Send + 'static,
        Tin: 'static,
        Tout: 'static,
        E: 'static,
    {
        self.operation = Some(Arc::new(move |ctx, input| operation(ctx, input).boxed()));
        self
    }

    /// Set the predicate deciding whether an attempt ends the run.
    ///
    /// It sees the attempt's error (`None` on success) and returns `true` to
    /// stop. Returning `true` for an error ends the run with that error.
    /// Without a condition the run stops as soon as an attempt succeeds.
    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(Option<&RepeaterError<E>>) -> bool + Send + Sync + 'static,
        E: 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Replace the delay sequence. An empty sequence is ignored.
    pub fn with_delays(mut self, delays: Vec<Duration>) -> Self {
        if delays.is_empty() {
            debug!("empty delay sequence ignored, keeping {} delays", self.delays.len());
            return self;
        }
        self.delays = Arc::from(delays);
        self
    }

    /// Set the per-attempt and whole-run budgets. Zero disables a budget.
    pub fn with_duration_limits(mut self, per_attempt: Duration, total: Duration) -> Self {
        self.attempt_limit = (!per_attempt.is_zero()).then_some(per_attempt);
        self.total_limit = (!total.is_zero()).then_some(total);
        self
    }

    /// Apply a declarative policy (delays and both budgets).
    pub fn with_config(self, config: &RepeaterConfig) -> Self {
        self.with_delays(config.delays.clone())
            .with_duration_limits(config.attempt_limit, config.total_limit)
    }

    /// Delay before each retry; its length caps the number of retries.
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Per-attempt budget, `None` when unbounded.
    pub fn attempt_limit(&self) -> Option<Duration> {
        self.attempt_limit
    }

    /// Whole-run budget, `None` when unbounded.
    pub fn total_limit(&self) -> Option<Duration> {
        self.total_limit
    }

    /// Whether [`Repeater::with_operation`] was called.
    pub fn has_operation(&self) -> bool {
        self.operation.is_some()
    }
}

impl<Tin, Tout, E> Repeater<Tin, Tout, E>
where
    Tin: Clone + Send + 'static,
    Tout: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    /// Start a run and return its completion and notification streams.
    ///
    /// The work happens on a spawned tokio task, so this must be called from
    /// within a runtime. `ctx` is the root of cancellation and of any
    /// caller-imposed deadline.
    pub fn run(&self, ctx: &Context, input: Tin) -> (DoneReceiver<Tout, E>, RetryReceiver<E>) {
        let (done_tx, done_rx) = oneshot::channel();
        let (retry_tx, retry_rx) = mpsc::channel(self.delays.len().max(1));

        let span = info_span!(
            "repeater_run",
            max_retries = self.delays.len(),
            attempt_limit_ms = self.attempt_limit.as_ref().map(as_millis_u64),
            total_limit_ms = self.total_limit.as_ref().map(as_millis_u64),
        );

        let run = Run {
            repeater: self.clone(),
            ctx: ctx.clone(),
            input,
            retry_tx,
            started: Instant::now(),
            attempts: 0,
        };

        tokio::spawn(run.execute(done_tx).instrument(span));

        (done_rx, retry_rx)
    }
}

impl<Tin, Tout, E> Default for Repeater<Tin, Tout, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tin, Tout, E> Clone for Repeater<Tin, Tout, E> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
            condition: self.condition.clone(),
            delays: Arc::clone(&self.delays),
            attempt_limit: self.attempt_limit,
            total_limit: self.total_limit,
        }
    }
}

impl<Tin, Tout, E> fmt::Debug for Repeater<Tin, Tout, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repeater")
            .field("has_operation", &self.operation.is_some())
            .field("has_condition", &self.condition.is_some())
            .field("delays", &self.delays)
            .field("attempt_limit", &self.attempt_limit)
            .field("total_limit", &self.total_limit)
            .finish_non_exhaustive()
    }
}

/// State of one run, owned by its task.
struct Run<Tin, Tout, E> {
    repeater: Repeater<Tin, Tout, E>,
    ctx: Context,
    input: Tin,
    retry_tx: mpsc::Sender<RetryEvent<E>>,
    started: Instant,
    attempts: u32,
}

impl<Tin, Tout, E> Run<Tin, Tout, E>
where
    Tin: Clone + Send + 'static,
    Tout: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    async fn execute(mut self, done_tx: oneshot::Sender<DoneEvent<Tout, E>>) {
        let result = self.drive().await;
        let event = DoneEvent { result, attempts: self.attempts, elapsed: self.started.elapsed() };

        // Closes the notification stream before the completion is visible.
        drop(self);

        match &event.result {
            Ok(_) => info!(
                attempts = event.attempts,
                elapsed_ms = as_millis_u64(&event.elapsed),
                "repeater run succeeded"
            ),
            Err(err) => warn!(
                attempts = event.attempts,
                elapsed_ms = as_millis_u64(&event.elapsed),
                kind = err.kind(),
                error = %err,
                "repeater run finished with error"
            ),
        }

        if done_tx.send(event).is_err() {
            debug!("completion receiver dropped before the run finished");
        }
    }

    async fn drive(&mut self) -> RepeaterResult<Tout, E> {
        let Some(operation) = self.repeater.operation.clone() else {
            return Err(RepeaterError::NoOperation);
        };

        let run_ctx = match self.repeater.total_limit {
            Some(limit) => self.ctx.with_timeout(limit),
            None => self.ctx.with_cancel(),
        };
        let _run_guard = run_ctx.token().clone().drop_guard();

        let mut outcome = self.attempt(&operation, &run_ctx).await;
        if self.finished(&outcome) {
            return outcome;
        }

        let delays = Arc::clone(&self.repeater.delays);
        for (index, delay) in delays.iter().copied().enumerate() {
            let ordinal = index + 1;

            if run_ctx.is_cancelled() {
                return Err(RepeaterError::Cancelled);
            }

            let remaining = remaining_until(&run_ctx);
            if remaining.is_zero() {
                return Err(RepeaterError::DeadlineExceeded);
            }

            let wait = if delay.is_zero() { Duration::ZERO } else { min_duration(delay, remaining) };

            match &outcome {
                Err(err) => warn!(
                    retry = ordinal,
                    wait_ms = as_millis_u64(&wait),
                    kind = err.kind(),
                    error = %err,
                    "attempt failed, retrying"
                ),
                Ok(_) => warn!(
                    retry = ordinal,
                    wait_ms = as_millis_u64(&wait),
                    "attempt result rejected, retrying"
                ),
            }

            let event = RetryEvent { attempt: ordinal, error: outcome.err(), wait };
            if let Err(TrySendError::Full(_)) = self.retry_tx.try_send(event) {
                debug!(retry = ordinal, "notification buffer full, event dropped");
            }

            tokio::select! {
                biased;
                reason = run_ctx.done() => return Err(reason.into()),
                () = tokio::time::sleep(wait) => {}
            }

            outcome = self.attempt(&operation, &run_ctx).await;
            if self.finished(&outcome) {
                return outcome;
            }
        }

        Err(RepeaterError::AttemptsExhausted { retries: delays.len() })
    }

    /// Whether the run ends after this attempt's outcome.
    fn finished(&self, outcome: &RepeaterResult<Tout, E>) -> bool {
        match outcome {
            Err(RepeaterError::Cancelled | RepeaterError::OperationPanicked { .. }) => true,
            _ => match &self.repeater.condition {
                Some(condition) => condition(outcome.as_ref().err()),
                None => outcome.is_ok(),
            },
        }
    }

    /// One invocation raced against its attempt context.
    async fn attempt(
        &mut self,
        operation: &Operation<Tin, Tout, E>,
        run_ctx: &Context,
    ) -> RepeaterResult<Tout, E> {
        if run_ctx.is_cancelled() {
            return Err(RepeaterError::Cancelled);
        }

        let remaining = remaining_until(run_ctx);
        if remaining.is_zero() {
            debug!("run budget spent, attempt skipped");
            return Err(RepeaterError::AttemptTimeout { limit: Duration::ZERO });
        }

        let limit = min_duration(self.repeater.attempt_limit.unwrap_or_default(), remaining);
        let attempt_ctx = if limit >= MAX_DURATION_LIMIT {
            run_ctx.with_cancel()
        } else {
            run_ctx.with_timeout(limit)
        };
        let _attempt_guard = attempt_ctx.token().clone().drop_guard();

        self.attempts += 1;
        debug!(attempt = self.attempts, limit_ms = as_millis_u64(&limit), "starting attempt");

        let input = self.input.clone();
        let call_ctx = attempt_ctx.clone();
        // Lazy so a panic while building the future is caught as well.
        let call = AssertUnwindSafe(async move { operation(call_ctx, input).await }).catch_unwind();

        tokio::select! {
            biased;
            reason = attempt_ctx.done() => match reason {
                ContextError::Cancelled => Err(RepeaterError::Cancelled),
                ContextError::DeadlineExceeded => Err(RepeaterError::AttemptTimeout { limit }),
            },
            result = call => match result {
                Ok(result) => result.map_err(|err| {
                    if run_ctx.is_cancelled() {
                        RepeaterError::Cancelled
                    } else {
                        RepeaterError::Operation(err)
                    }
                }),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(attempt = self.attempts, %message, "operation panicked");
                    Err(RepeaterError::OperationPanicked { message })
                }
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Flaky(u32);

    impl fmt::Display for Flaky {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "flaky failure #{}", self.0)
        }
    }

    fn short_delays(count: usize) -> Vec<Duration> {
        vec![Duration::from_millis(5); count]
    }

    #[test]
    fn test_defaults() {
        let repeater = Repeater::<(), (), Flaky>::new();

        assert!(!repeater.has_operation());
        assert_eq!(repeater.delays(), DEFAULT_DELAYS.as_slice());
        assert_eq!(repeater.attempt_limit(), Some(DEFAULT_ATTEMPT_LIMIT));
        assert_eq!(repeater.total_limit(), Some(DEFAULT_TOTAL_LIMIT));
    }

    /// Validates builder normalization of empty delays and zero budgets.
    ///
    /// Assertions:
    /// - Ensures an empty delay list keeps the previous sequence.
    /// - Confirms zero budgets become `None` (unbounded).
    #[test]
    fn test_builder_normalization() {
        let repeater = Repeater::<(), (), Flaky>::new()
            .with_delays(short_delays(2))
            .with_delays(Vec::new())
            .with_duration_limits(Duration::ZERO, Duration::from_secs(1));

        assert_eq!(repeater.delays().len(), 2);
        assert_eq!(repeater.attempt_limit(), None);
        assert_eq!(repeater.total_limit(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_with_config() {
        let config = RepeaterConfig {
            delays: short_delays(4),
            attempt_limit: Duration::from_millis(100),
            total_limit: Duration::ZERO,
        };

        let repeater = Repeater::<(), (), Flaky>::new().with_config(&config);

        assert_eq!(repeater.delays(), config.delays.as_slice());
        assert_eq!(repeater.attempt_limit(), Some(Duration::from_millis(100)));
        assert_eq!(repeater.total_limit(), None);
    }

    #[test]
    fn test_debug_hides_closures() {
        let repeater = Repeater::<(), (), Flaky>::new();
        let rendered = format!("{repeater:?}");

        assert!(rendered.contains("has_operation: false"));
        assert!(rendered.contains("delays"));
    }

    #[tokio::test]
    async fn test_no_operation_reports_immediately() {
        let repeater = Repeater::<(), (), Flaky>::new();
        let (done, mut retries) = repeater.run(&Context::background(), ());

        let event = done.await.unwrap();
        assert!(matches!(event.result, Err(RepeaterError::NoOperation)));
        assert_eq!(event.attempts, 0);
        assert!(retries.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_input_is_passed_to_every_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let repeater = Repeater::<String, usize, Flaky>::new()
            .with_delays(short_delays(3))
            .with_operation(move |_ctx, input: String| {
                let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if call < 3 {
                        Err(Flaky(call))
                    } else {
                        Ok(input.len())
                    }
                }
            });

        let (done, _retries) = repeater.run(&Context::background(), "vault".to_string());
        let event = done.await.unwrap();

        assert_eq!(event.result.unwrap(), 5);
        assert_eq!(event.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    /// Validates that the condition can forgive an operation error.
    ///
    /// Assertions:
    /// - Confirms the run stops after the first attempt.
    /// - Ensures the forgiven error is still reported on completion.
    #[tokio::test]
    async fn test_condition_can_forgive_error() {
        let repeater = Repeater::<(), (), Flaky>::new()
            .with_delays(short_delays(3))
            .with_operation(|_ctx, ()| async { Err(Flaky(7)) })
            .with_condition(|err| matches!(err, Some(RepeaterError::Operation(Flaky(7)))));

        let (done, mut retries) = repeater.run(&Context::background(), ());
        let event = done.await.unwrap();

        assert_eq!(event.attempts, 1);
        assert_eq!(event.error().and_then(RepeaterError::operation_error), Some(&Flaky(7)));
        assert!(retries.recv().await.is_none());
    }

    /// Validates that a rejected success is retried and reported without an
    /// error in the notification.
    #[tokio::test]
    async fn test_condition_can_reject_success() {
        let repeater = Repeater::<(), u8, Flaky>::new()
            .with_delays(short_delays(2))
            .with_operation(|_ctx, ()| async { Ok(1) })
            .with_condition(|_| false);

        let (done, mut retries) = repeater.run(&Context::background(), ());
        let event = done.await.unwrap();

        assert!(matches!(event.result, Err(RepeaterError::AttemptsExhausted { retries: 2 })));
        assert_eq!(event.attempts, 3);

        let first = retries.recv().await.unwrap();
        assert_eq!(first.attempt, 1);
        assert!(first.error.is_none());
    }

    #[tokio::test]
    async fn test_zero_delay_does_not_wait_for_deadline() {
        let repeater = Repeater::<(), (), Flaky>::new()
            .with_delays(vec![Duration::ZERO, Duration::ZERO])
            .with_duration_limits(Duration::ZERO, Duration::from_secs(30))
            .with_operation(|_ctx, ()| async { Err(Flaky(0)) });

        let (done, mut retries) = repeater.run(&Context::background(), ());
        let event = tokio::time::timeout(Duration::from_secs(1), done).await.unwrap().unwrap();

        assert!(matches!(event.result, Err(RepeaterError::AttemptsExhausted { retries: 2 })));
        while let Some(retry) = retries.recv().await {
            assert_eq!(retry.wait, Duration::ZERO);
        }
    }

    /// Validates that the operation's context expires with the attempt, so a
    /// cooperative operation can stop early.
    #[tokio::test]
    async fn test_operation_sees_attempt_deadline() {
        let repeater = Repeater::<(), (), Flaky>::new()
            .with_delays(short_delays(1))
            .with_duration_limits(Duration::from_millis(30), Duration::ZERO)
            .with_operation(|ctx: Context, ()| async move {
                assert!(ctx.deadline().is_some());
                ctx.done().await;
                Err(Flaky(1))
            });

        let (done, mut retries) = repeater.run(&Context::background(), ());
        let event = done.await.unwrap();

        assert!(matches!(event.result, Err(RepeaterError::AttemptsExhausted { .. })));
        let retry = retries.recv().await.unwrap();
        assert!(matches!(retry.error, Some(RepeaterError::AttemptTimeout { .. })));
    }

    #[tokio::test]
    async fn test_runs_are_independent() {
        let repeater = Repeater::<u32, u32, Flaky>::new()
            .with_delays(short_delays(1))
            .with_operation(|_ctx, input: u32| async move { Ok(input + 1) });

        let (first, _) = repeater.run(&Context::background(), 1);
        let (second, _) = repeater.run(&Context::background(), 10);

        assert_eq!(first.await.unwrap().result.unwrap(), 2);
        assert_eq!(second.await.unwrap().result.unwrap(), 11);
    }

    /// Validates that a panicking operation still publishes a completion.
    ///
    /// Assertions:
    /// - Ensures a panic inside the future ends the run with `OperationPanicked`.
    /// - Ensures a panic while building the future is caught the same way.
    /// - Confirms no retry follows a panic.
    #[tokio::test]
    async fn test_panicking_operation_ends_run() {
        let in_future = Repeater::<bool, (), Flaky>::new()
            .with_delays(short_delays(3))
            .with_operation(|_ctx, explode: bool| async move {
                assert!(!explode, "vault index corrupted");
                Ok::<(), Flaky>(())
            });
        let eager = Repeater::<bool, (), Flaky>::new()
            .with_delays(short_delays(3))
            .with_operation(|_ctx, explode: bool| {
                assert!(!explode, "vault index corrupted");
                async { Ok::<(), Flaky>(()) }
            });

        for repeater in [in_future, eager] {
            let (done, mut retries) = repeater.run(&Context::background(), true);
            let event = done.await.unwrap();

            match &event.result {
                Err(RepeaterError::OperationPanicked { message }) => {
                    assert!(message.contains("vault index corrupted"), "{message}");
                }
                other => panic!("unexpected result: {other:?}"),
            }
            assert_eq!(event.attempts, 1);
            assert!(retries.recv().await.is_none());
        }
    }
}

//! Records published by a repeater run

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::error::RepeaterError;

/// Emitted after a failed attempt, before the wait that precedes the next one.
#[derive(Debug)]
pub struct RetryEvent<E> {
    /// 1-based ordinal of the wait about to happen
    pub attempt: usize,
    /// Error of the attempt that triggered the retry
    ///
    /// `None` when the attempt succeeded but the condition still asked for
    /// another try.
    pub error: Option<RepeaterError<E>>,
    /// Wait actually used, after clamping to the remaining run budget
    pub wait: Duration,
}

/// Terminal record of a run, published exactly once.
#[derive(Debug)]
pub struct DoneEvent<T, E> {
    /// Final value, or the error that ended the run
    pub result: Result<T, RepeaterError<E>>,
    /// Operation invocations actually started
    pub attempts: u32,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl<T, E> DoneEvent<T, E> {
    /// Whether the run ended with a value.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Terminal error, if any.
    pub fn error(&self) -> Option<&RepeaterError<E>> {
        self.result.as_ref().err()
    }

    /// Drop the bookkeeping and keep the outcome.
    pub fn into_result(self) -> Result<T, RepeaterError<E>> {
        self.result
    }
}

/// Completion stream of a run
pub type DoneReceiver<T, E> = oneshot::Receiver<DoneEvent<T, E>>;

/// Notification stream of a run
pub type RetryReceiver<E> = mpsc::Receiver<RetryEvent<E>>;

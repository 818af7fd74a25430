// Error types for the repeater module
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::context::ContextError;
use crate::error::{CommonError, ErrorClassification, ErrorSeverity};

/// Errors reported by a repeater run
///
/// `AttemptTimeout` and `Operation` come from a single attempt and are shown
/// to the success condition. The other variants are decided by the run
/// itself and always end it.
#[derive(Debug, Error)]
pub enum RepeaterError<E> {
    /// No operation was configured, nothing to run
    #[error("operation not set, nothing to run")]
    NoOperation,

    /// A single attempt exceeded its time limit
    #[error("attempt timed out after {limit:?}")]
    AttemptTimeout { limit: Duration },

    /// The operation returned an error
    #[error("operation failed: {0}")]
    Operation(E),

    /// The time limit for the whole run elapsed
    #[error("retry deadline exceeded")]
    DeadlineExceeded,

    /// The caller's context was cancelled
    #[error("retry run cancelled")]
    Cancelled,

    /// Every delay was used without the success condition holding
    #[error("attempts are over after {retries} retries")]
    AttemptsExhausted { retries: usize },

    /// The operation panicked; the run ends without further attempts
    #[error("operation panicked: {message}")]
    OperationPanicked { message: String },
}

impl<E> RepeaterError<E> {
    /// True for errors produced by one attempt (visible to the condition).
    pub fn is_attempt_level(&self) -> bool {
        matches!(self, Self::AttemptTimeout { .. } | Self::Operation(_))
    }

    /// True for either kind of time-limit expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::AttemptTimeout { .. } | Self::DeadlineExceeded)
    }

    /// True when the caller's context was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Borrow the operation's own error, if this wraps one.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }

    /// Take the operation's own error, discarding run-level kinds.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }

    /// Stable label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoOperation => "no_operation",
            Self::AttemptTimeout { .. } => "attempt_timeout",
            Self::Operation(_) => "operation",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Cancelled => "cancelled",
            Self::AttemptsExhausted { .. } => "attempts_exhausted",
            Self::OperationPanicked { .. } => "operation_panicked",
        }
    }
}

impl<E> From<ContextError> for RepeaterError<E> {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => Self::Cancelled,
            ContextError::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

impl<E: ErrorClassification> ErrorClassification for RepeaterError<E> {
    fn is_retryable(&self) -> bool {
        match self {
            Self::AttemptTimeout { .. } => true,
            Self::Operation(err) => err.is_retryable(),
            Self::NoOperation
            | Self::DeadlineExceeded
            | Self::Cancelled
            | Self::AttemptsExhausted { .. }
            | Self::OperationPanicked { .. } => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NoOperation => ErrorSeverity::Error,
            Self::AttemptTimeout { .. } => ErrorSeverity::Warning,
            Self::Operation(err) => err.severity(),
            Self::DeadlineExceeded => ErrorSeverity::Warning,
            Self::Cancelled => ErrorSeverity::Info,
            Self::AttemptsExhausted { .. } => ErrorSeverity::Warning,
            Self::OperationPanicked { .. } => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        match self {
            Self::Operation(err) => err.is_critical(),
            Self::OperationPanicked { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Operation(err) => err.retry_after(),
            _ => None,
        }
    }
}

impl<E: ErrorClassification + fmt::Display> From<RepeaterError<E>> for CommonError {
    fn from(err: RepeaterError<E>) -> Self {
        let message = err.to_string();
        match err {
            RepeaterError::NoOperation => Self::config(message),
            RepeaterError::AttemptTimeout { limit } => Self::timeout("repeater attempt", limit),
            RepeaterError::Operation(inner) => {
                Self::backend("repeater", message, inner.is_retryable())
            }
            RepeaterError::DeadlineExceeded | RepeaterError::AttemptsExhausted { .. } => {
                Self::backend("repeater", message, false)
            }
            RepeaterError::Cancelled => Self::task_cancelled_with_reason("repeater", message),
            RepeaterError::OperationPanicked { .. } => Self::internal(message),
        }
    }
}

/// Result type for repeater runs
pub type RepeaterResult<T, E> = Result<T, RepeaterError<E>>;

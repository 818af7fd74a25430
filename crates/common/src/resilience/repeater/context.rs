//! Cancellation and deadline scope passed to retried operations
//!
//! A [`Context`] pairs a [`CancellationToken`] with an optional deadline.
//! Derived contexts use child tokens, so cancelling a parent cancels every
//! descendant while cancelling a child leaves the parent untouched. A
//! derived deadline never extends past the parent's.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reason a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The token (or one of its ancestors) was cancelled
    #[error("context cancelled")]
    Cancelled,

    /// The deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation/deadline scope.
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// Root context: never cancelled unless [`Context::cancel`] is called,
    /// no deadline.
    pub fn background() -> Self {
        Self { token: CancellationToken::new(), deadline: None }
    }

    /// Root context driven by an existing token (e.g. a shutdown token).
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    /// Child context that can be cancelled on its own.
    pub fn with_cancel(&self) -> Self {
        Self { token: self.token.child_token(), deadline: self.deadline }
    }

    /// Child context bounded by `deadline` (or the parent's, if earlier).
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent <= deadline => parent,
            _ => deadline,
        };

        Self { token: self.token.child_token(), deadline: Some(deadline) }
    }

    /// Child context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.with_cancel(),
        }
    }

    /// Instant after which the context is done, if bounded.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Underlying token, for APIs that take a `CancellationToken`.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel this context and all contexts derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether this context or an ancestor was cancelled. An expired
    /// deadline does not count; see [`Context::err`].
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Why the context is done, or `None` while it is still live.
    ///
    /// Cancellation takes precedence over an expired deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => ContextError::Cancelled,
                    () = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }
}

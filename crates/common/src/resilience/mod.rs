//! Resilience patterns for fault tolerance
//!
//! - **[`repeater`]**: bounded retry over a fixed delay sequence with a
//!   per-attempt and a whole-run time budget, cancellable through a
//!   [`Context`](repeater::Context) and reporting progress on a
//!   non-blocking channel.
//!
//! Retry here is strictly bounded: the delay sequence length caps the number
//! of retries and no state survives a run. Adaptive backoff and circuit
//! breaking are not provided.

pub mod repeater;

pub use repeater::{
    Context, ContextError, DoneEvent, DoneReceiver, Repeater, RepeaterConfig, RepeaterError,
    RepeaterResult, RetryEvent, RetryReceiver,
};

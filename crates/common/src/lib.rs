//! Shared building blocks for the keeper crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: errors, serde helpers, utility macros
//! - `runtime`: async infrastructure (the retry scheduler, logging setup,
//!   async test helpers)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
#[macro_use]
pub mod utils;
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod observability;
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use observability::{init_logging, LogFormat, LogLevel};
#[cfg(feature = "runtime")]
pub use resilience::repeater::{
    Context, ContextError, DoneEvent, Repeater, RepeaterConfig, RepeaterError, RetryEvent,
};
#[cfg(feature = "foundation")]
pub use utils::serde::{as_millis_u64, duration_millis, duration_millis_vec};

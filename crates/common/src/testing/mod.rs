//! Testing utilities and helpers
//!
//! - **[`assertions`]**: assertions for error messages, retry counts and
//!   timing windows
//! - **[`async_utils`]**: timeouts and polling for async tests
//! - **[`repeater`]**: draining both streams of a repeater run
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "runtime")]
//! # {
//! fn test_error_message() {
//!     let result: Result<(), String> = Err("Connection timeout".to_string());
//!     keeper_common::assert_error_contains!(result, "timeout");
//! }
//! # }
//! ```

pub mod assertions;
pub mod async_utils;
pub mod repeater;

// Macros exported with #[macro_export] are available at crate root
pub use assertions::assert_duration_in_range;
pub use async_utils::{poll_until, timeout_ok};
pub use repeater::{collect_run, RunSummary};

//! Observability setup
//!
//! - **[`logging`]**: `tracing` subscriber installation with level and
//!   output format taken from configuration

pub mod logging;

pub use logging::{init_logging, LogFormat, LogLevel};

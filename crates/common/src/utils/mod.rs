//! Common utility functions and helper macros
//!
//! - **[`macros`]**: boilerplate-reducing macros (`impl_status_conversions!`)
//! - **[`serde`]**: millisecond serialization for durations

#[macro_use]
pub mod macros;
pub mod serde;

pub use self::serde::{as_millis_u64, duration_millis, duration_millis_vec};

//! Remaining-time arithmetic for the two nested time budgets
//!
//! Both helpers are pure so the clamping rules can be tested without timers.

use std::time::Duration;

use tokio::time::Instant;

use super::constants::MAX_DURATION_LIMIT;
use super::context::Context;

/// Time left until `deadline` as seen from `now`.
///
/// A deadline in the past yields `Duration::ZERO`; no deadline yields
/// [`MAX_DURATION_LIMIT`].
pub fn remaining_at(deadline: Option<Instant>, now: Instant) -> Duration {
    match deadline {
        Some(deadline) => deadline.saturating_duration_since(now),
        None => MAX_DURATION_LIMIT,
    }
}

/// Time left until the context's deadline.
pub fn remaining_until(ctx: &Context) -> Duration {
    remaining_at(ctx.deadline(), Instant::now())
}

/// Smaller of two optional durations, where zero means "not set".
///
/// If either operand is zero the other one is returned unchanged, so both
/// budgets can be switched off independently.
pub fn min_duration(first: Duration, second: Duration) -> Duration {
    if first.is_zero() {
        return second;
    }
    if second.is_zero() {
        return first;
    }
    first.min(second)
}

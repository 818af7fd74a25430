// Defaults for the repeater module
use std::time::Duration;

/// Waits used when the caller does not supply a delay sequence
pub const DEFAULT_DELAYS: [Duration; 3] =
    [Duration::from_millis(500), Duration::from_secs(1), Duration::from_secs(2)];

/// Default time limit for a single attempt
pub const DEFAULT_ATTEMPT_LIMIT: Duration = Duration::from_secs(2);

/// Default time limit for the whole run (all attempts and waits)
pub const DEFAULT_TOTAL_LIMIT: Duration = Duration::from_secs(10);

/// Remaining time reported when no deadline is set
///
/// Large enough never to clamp a realistic timer, small enough to add to an
/// `Instant` without overflow.
pub const MAX_DURATION_LIMIT: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

//! Custom assertions for tests

use std::time::Duration;

/// Assert that a `Result` is an error whose message contains a substring
///
/// # Examples
///
/// ```
/// let result: Result<(), String> = Err("attempts are over after 3 retries".to_string());
/// keeper_common::assert_error_contains!(result, "3 retries");
/// ```
#[macro_export]
macro_rules! assert_error_contains {
    ($result:expr, $substring:expr) => {
        match &$result {
            Ok(_) => panic!("Expected error but got Ok"),
            Err(e) => {
                let error_msg = format!("{}", e);
                assert!(
                    error_msg.contains($substring),
                    "Error message '{}' does not contain '{}'",
                    error_msg,
                    $substring
                );
            }
        }
    };
}

/// Assert the number of retries observed for a run
///
/// # Examples
///
/// ```
/// let retries = vec![1, 2];
/// keeper_common::assert_retry_count!(retries.len(), 2);
/// ```
#[macro_export]
macro_rules! assert_retry_count {
    ($actual:expr, $expected:expr) => {
        assert_eq!($actual, $expected, "Expected {} retries but got {}", $expected, $actual);
    };
}

/// Assert that a duration is within `tolerance` of `expected`
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use keeper_common::testing::assertions::assert_duration_in_range;
///
/// assert_duration_in_range(
///     Duration::from_millis(105),
///     Duration::from_millis(100),
///     Duration::from_millis(10),
/// );
/// ```
pub fn assert_duration_in_range(actual: Duration, expected: Duration, tolerance: Duration) {
    let min = expected.saturating_sub(tolerance);
    let max = expected + tolerance;

    assert!(
        actual >= min && actual <= max,
        "Duration {:?} not in range [{:?}, {:?}]",
        actual,
        min,
        max
    );
}

//! Serialization helpers for durations
//!
//! Durations are stored as integer milliseconds so configuration files stay
//! readable (`attempt_limit_ms = 2000`).

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serde serialization result type
type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

/// Whole milliseconds of `duration`, saturating at `u64::MAX`.
///
/// Used for config output and for `*_ms` log fields.
pub fn as_millis_u64(duration: &Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// `Duration` as milliseconds (u64)
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use keeper_common::duration_millis;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Example {
///     #[serde(with = "duration_millis")]
///     timeout: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_u64(as_millis_u64(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// `Vec<Duration>` as a list of milliseconds
pub mod duration_millis_vec {
    use serde::ser::SerializeSeq;

    use super::*;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(durations.len()))?;
        for duration in durations {
            seq.serialize_element(&as_millis_u64(duration))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u64>::deserialize(deserializer)?;
        Ok(millis.into_iter().map(Duration::from_millis).collect())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for serialization utilities

    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Policy {
        #[serde(with = "duration_millis")]
        timeout: Duration,
        #[serde(with = "duration_millis_vec")]
        backoff: Vec<Duration>,
    }

    #[test]
    fn test_serialize_as_millis() {
        let policy = Policy {
            timeout: Duration::from_millis(1500),
            backoff: vec![Duration::from_millis(500), Duration::from_secs(1)],
        };

        let json = serde_json::to_string(&policy).expect("Should serialize valid struct");
        assert_eq!(json, r#"{"timeout":1500,"backoff":[500,1000]}"#);
    }

    #[test]
    fn test_deserialize_from_toml() {
        let policy: Policy =
            toml::from_str("timeout = 2500\nbackoff = [10, 20, 40]").expect("Should parse TOML");

        assert_eq!(policy.timeout, Duration::from_millis(2500));
        assert_eq!(
            policy.backoff,
            vec![Duration::from_millis(10), Duration::from_millis(20), Duration::from_millis(40)]
        );
    }

    /// Validates that sub-millisecond precision is truncated on output.
    ///
    /// Assertions:
    /// - Confirms `1_999_999ns` serializes as `1`.
    #[test]
    fn test_sub_millisecond_truncates() {
        let policy = Policy { timeout: Duration::from_nanos(1_999_999), backoff: Vec::new() };

        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("\"timeout\":1"));
        assert!(json.contains("\"backoff\":[]"));
    }

    #[test]
    fn test_as_millis_saturates() {
        assert_eq!(as_millis_u64(&Duration::from_millis(1500)), 1500);
        assert_eq!(as_millis_u64(&Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_zero_and_empty() {
        let json = r#"{"timeout":0,"backoff":[]}"#;
        let policy: Policy = serde_json::from_str(json).unwrap();

        assert_eq!(policy.timeout, Duration::ZERO);
        assert!(policy.backoff.is_empty());
    }

    #[test]
    fn test_rejects_non_numeric() {
        let result: Result<Policy, _> =
            serde_json::from_str(r#"{"timeout":"soon","backoff":[]}"#);
        assert!(result.is_err());

        let result: Result<Policy, _> = serde_json::from_str(r#"{"timeout":1,"backoff":[-5]}"#);
        assert!(result.is_err());
    }
}

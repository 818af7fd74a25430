//! Declarative retry policy loadable from configuration files

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_ATTEMPT_LIMIT, DEFAULT_DELAYS, DEFAULT_TOTAL_LIMIT};
use crate::error::{CommonError, CommonResult};
use crate::utils::serde::{duration_millis, duration_millis_vec};

/// Delay sequence and time budgets of a repeater
///
/// Durations are expressed in milliseconds when serialized. A zero budget
/// means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeaterConfig {
    #[serde(rename = "delays_ms", with = "duration_millis_vec")]
    pub delays: Vec<Duration>,
    #[serde(rename = "attempt_limit_ms", with = "duration_millis")]
    pub attempt_limit: Duration,
    #[serde(rename = "total_limit_ms", with = "duration_millis")]
    pub total_limit: Duration,
}

impl Default for RepeaterConfig {
    fn default() -> Self {
        Self {
            delays: DEFAULT_DELAYS.to_vec(),
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
            total_limit: DEFAULT_TOTAL_LIMIT,
        }
    }
}

impl RepeaterConfig {
    /// Number of retries this policy allows.
    pub fn max_retries(&self) -> usize {
        self.delays.len()
    }

    /// Worst-case time spent waiting between attempts.
    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }

    /// Reject an empty delay list and a per-attempt budget larger than a
    /// bounded total budget.
    pub fn validate(&self) -> CommonResult<()> {
        if self.delays.is_empty() {
            return Err(CommonError::validation("delays_ms", "at least one delay is required"));
        }

        if !self.attempt_limit.is_zero()
            && !self.total_limit.is_zero()
            && self.attempt_limit > self.total_limit
        {
            return Err(CommonError::validation_with_value(
                "attempt_limit_ms",
                "must not exceed total_limit_ms",
                self.attempt_limit.as_millis().to_string(),
            ));
        }

        Ok(())
    }
}

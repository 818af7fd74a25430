//! Structured logging setup
//!
//! Installs a global `tracing` subscriber whose default level comes from
//! configuration. `RUST_LOG` directives, when present, refine it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::error::{CommonError, CommonResult};

/// Minimum severity that gets logged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl_status_conversions!(LogLevel {
    Debug => "debug",
    Info => "info",
    Warn => "warn" | "warning",
    Error => "error",
});

impl LogLevel {
    /// Parse a level name, falling back to `Error` for anything unknown.
    ///
    /// A misspelled level therefore makes logging quieter, never noisier.
    pub fn parse_lossy(value: &str) -> Self {
        value.parse().unwrap_or(Self::Error)
    }

    /// Matching `tracing` level.
    pub fn as_tracing(self) -> Level {
        match self {
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        level.as_tracing()
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lossy(&raw))
    }
}

/// Output format of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

impl_status_conversions!(LogFormat {
    Compact => "compact" | "text",
    Json => "json",
});

/// Filter with `level` as the default directive, refined by `RUST_LOG`.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::builder().with_default_directive(level.as_tracing().into()).from_env_lossy()
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(level: LogLevel, format: LogFormat) -> CommonResult<()> {
    let filter = env_filter(level);

    let stdout = match format {
        LogFormat::Compact => fmt::layer().compact().with_target(false).with_filter(filter).boxed(),
        LogFormat::Json => fmt::layer().json().with_filter(filter).boxed(),
    };

    tracing_subscriber::registry().with(stdout).try_init().map_err(|err| CommonError::Internal {
        message: err.to_string(),
        context: Some("logging".to_string()),
    })?;

    tracing::debug!(%level, ?format, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("info".parse::<LogLevel>(), Ok(LogLevel::Info));
    }

    /// Validates that unknown level names clamp to `Error`.
    ///
    /// Assertions:
    /// - Confirms `"verbose"` and `""` map to `LogLevel::Error`.
    /// - Confirms known names are unaffected.
    #[test]
    fn test_unknown_level_clamps_to_error() {
        assert_eq!(LogLevel::parse_lossy("verbose"), LogLevel::Error);
        assert_eq!(LogLevel::parse_lossy(""), LogLevel::Error);
        assert_eq!(LogLevel::parse_lossy("Debug"), LogLevel::Debug);
    }

    #[test]
    fn test_level_ordering_matches_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
    }

    #[test]
    fn test_level_serde_is_lossy() {
        #[derive(Deserialize, Serialize)]
        struct Holder {
            level: LogLevel,
        }

        let holder: Holder = toml::from_str("level = \"warning\"").unwrap();
        assert_eq!(holder.level, LogLevel::Warn);

        let holder: Holder = toml::from_str("level = \"chatty\"").unwrap();
        assert_eq!(holder.level, LogLevel::Error);

        let json = serde_json::to_string(&Holder { level: LogLevel::Debug }).unwrap();
        assert_eq!(json, r#"{"level":"debug"}"#);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("TEXT".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_logging(LogLevel::Error, LogFormat::Compact);

        let err = init_logging(LogLevel::Error, LogFormat::Json).unwrap_err();
        assert_eq!(err.error_type_name(), "internal");
    }
}

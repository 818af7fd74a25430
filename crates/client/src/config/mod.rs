//! Client configuration
//!
//! Values are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. the optional file given with `--config` (TOML, or JSON by extension)
//! 3. `KEEPER_SERVER_ADDRESS` and `KEEPER_LOG_LEVEL`
//! 4. command-line flags
//!
//! The merged result is normalized and validated before use.

mod cli;

use std::fs;
use std::path::Path;

pub use cli::Cli;
use keeper_common::error::{CommonError, CommonResult};
use keeper_common::{LogFormat, LogLevel, RepeaterConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:8080";
pub const ENV_SERVER_ADDRESS: &str = "KEEPER_SERVER_ADDRESS";
pub const ENV_LOG_LEVEL: &str = "KEEPER_LOG_LEVEL";

const HTTP_PREFIX: &str = "http://";
const HTTPS_PREFIX: &str = "https://";

/// Effective client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server to contact; normalized to `http://host:port` by `validate`
    pub server_address: String,
    /// Minimum level of emitted log events
    pub log_level: LogLevel,
    /// Compact text or JSON lines
    pub log_format: LogFormat,
    /// Retry policy for the startup handshake
    pub retry: RepeaterConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
            retry: RepeaterConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Read a configuration file. `.json` files are parsed as JSON,
    /// anything else as TOML.
    pub fn from_file(path: &Path) -> CommonResult<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            CommonError::config_field(
                "config",
                format!("cannot read {}: {err}", path.display()),
            )
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json { serde_json::from_str(&raw)? } else { toml::from_str(&raw)? };
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Apply environment overrides; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(address) = non_empty(ENV_SERVER_ADDRESS) {
            debug!(key = ENV_SERVER_ADDRESS, "server address overridden from environment");
            self.server_address = address;
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            self.log_level = LogLevel::parse_lossy(&level);
        }
    }

    /// Apply explicitly given flags.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(address) = &cli.address {
            self.server_address = address.clone();
        }
        if let Some(level) = &cli.log_level {
            self.log_level = LogLevel::parse_lossy(level);
        }
        if cli.json_logs {
            self.log_format = LogFormat::Json;
        }
    }

    /// Normalize the server address and check the retry policy.
    ///
    /// The address always ends up with exactly one `http://` prefix; an
    /// `https://` prefix is replaced.
    pub fn validate(&mut self) -> CommonResult<()> {
        let trimmed = self.server_address.trim();
        let bare = trimmed
            .strip_prefix(HTTP_PREFIX)
            .or_else(|| trimmed.strip_prefix(HTTPS_PREFIX))
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        if bare.is_empty() {
            return Err(CommonError::config_field("server_address", "must not be empty"));
        }

        self.server_address = format!("{HTTP_PREFIX}{bare}");
        self.retry.validate()
    }
}

/// Build the effective configuration from every source.
pub fn load<F>(cli: &Cli, env: F) -> CommonResult<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };

    config.apply_env(env);
    config.apply_cli(cli);
    config.validate()?;

    Ok(config)
}

//! Configuration structures.
//!
//! Configuration is loaded from a JSON file and/or environment variables, on
//! top of defaults that match the remote service's expectations.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::errors::{Error, Result};

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_BASE_URL: &str = "MARKET_CLIENT_BASE_URL";
/// Environment variable overriding the per-attempt timeout (milliseconds).
pub const ENV_TIMEOUT_MS: &str = "MARKET_CLIENT_TIMEOUT_MS";
/// Environment variable overriding the retry budget.
pub const ENV_MAX_RETRIES: &str = "MARKET_CLIENT_MAX_RETRIES";
/// Environment variable overriding the fixed retry delay (milliseconds).
pub const ENV_RETRY_DELAY_MS: &str = "MARKET_CLIENT_RETRY_DELAY_MS";
/// Environment variable overriding the concurrency limit.
pub const ENV_MAX_CONCURRENCY: &str = "MARKET_CLIENT_MAX_CONCURRENCY";
/// Environment variable selecting the log format (`json` or anything else for compact).
pub const ENV_LOG_FORMAT: &str = "MARKET_CLIENT_LOG_FORMAT";

/// Global client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base address every endpoint is resolved against.
    pub base_url: String,

    /// Default per-call options.
    pub call: CallOptions,

    /// Maximum number of calls in flight at once.
    pub max_concurrency: usize,

    /// Observability configuration.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            call: CallOptions::default(),
            max_concurrency: 3,
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MARKET_CLIENT_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_TIMEOUT_MS)? {
            self.call.timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_var::<u32, _>(&lookup, ENV_MAX_RETRIES)? {
            self.call.max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_RETRY_DELAY_MS)? {
            self.call.retry_delay = Duration::from_millis(ms);
        }
        if let Some(limit) = parse_var::<usize, _>(&lookup, ENV_MAX_CONCURRENCY)? {
            self.max_concurrency = limit;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.observability.json_logs = format.eq_ignore_ascii_case("json");
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::config("max_concurrency must be at least 1"));
        }
        reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_url(format!("{}: {}", self.base_url, e)))?;
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::config(format!("{}={:?}: {}", key, raw, e))),
    }
}

/// Per-call execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallOptions {
    /// Deadline for a single attempt.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Retries after the first attempt; total tries never exceed `max_retries + 1`.
    pub max_retries: u32,

    /// Fixed delay between attempts.
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(45_000),
            max_retries: 2,
            retry_delay: Duration::from_millis(1_000),
        }
    }
}

impl CallOptions {
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Partial per-call options merged over the client defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOverrides {
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<Duration>,
}

impl CallOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = Some(retry_delay);
        self
    }

    pub fn apply(&self, base: CallOptions) -> CallOptions {
        CallOptions {
            timeout: self.timeout.unwrap_or(base.timeout),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            retry_delay: self.retry_delay.unwrap_or(base.retry_delay),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hook configuration and the lookup interface it is read from.

use crate::error::{ConfigError, SubmitError};
use crate::formatter::{MessageFormatter, SimpleTextFormatter};
use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// URL of the LogDNA ingestion API endpoint
pub const DEFAULT_INGEST_URL: &str = "https://logs.logdna.com/logs/ingest";
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
pub const DEFAULT_QUEUE_SIZE: usize = 128;
pub const DEFAULT_FLUSH_EVERY: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Called by the engine for every failed batch submission.
pub type ErrorReporter = Arc<dyn Fn(&SubmitError) + Send + Sync>;

/// Configuration for a hook. One instance is owned by exactly one engine.
#[derive(Clone)]
pub struct Config {
    pub ingest_url: String,
    pub api_key: String,
    /// Resolved from the local system when left empty
    pub hostname: String,
    pub mac: Option<String>,
    pub ip: Option<String>,
    pub app: Option<String>,
    pub env: Option<String>,
    /// Number of pending entries that triggers an immediate submission
    pub buffer_size: usize,
    /// Capacity of the queue between producers and the flusher
    pub queue_size: usize,
    pub flush_every: Duration,
    /// Discard entries when the queue is full and batches when submission
    /// fails, instead of blocking producers and retaining batches
    pub may_drop: bool,
    /// Ship the message and fields as one JSON-encoded line
    pub line_json: bool,
    pub message_formatter: Option<Arc<dyn MessageFormatter>>,
    /// Per-request HTTP timeout
    pub timeout: Duration,
    pub proxy: Option<String>,
    pub on_error: Option<ErrorReporter>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ingest_url: DEFAULT_INGEST_URL.to_string(),
            api_key: String::new(),
            hostname: String::new(),
            mac: None,
            ip: None,
            app: None,
            env: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            queue_size: DEFAULT_QUEUE_SIZE,
            flush_every: DEFAULT_FLUSH_EVERY,
            may_drop: false,
            line_json: false,
            message_formatter: None,
            timeout: DEFAULT_TIMEOUT,
            proxy: None,
            on_error: None,
        }
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("ingest_url", &self.ingest_url)
            .field("api_key", &"<redacted>")
            .field("hostname", &self.hostname)
            .field("mac", &self.mac)
            .field("ip", &self.ip)
            .field("app", &self.app)
            .field("env", &self.env)
            .field("buffer_size", &self.buffer_size)
            .field("queue_size", &self.queue_size)
            .field("flush_every", &self.flush_every)
            .field("may_drop", &self.may_drop)
            .field("line_json", &self.line_json)
            .field("message_formatter", &self.message_formatter.is_some())
            .field("timeout", &self.timeout)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Builds a configuration from a lookup source, applying defaults for
    /// every missing key.
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let message_formatter: Option<Arc<dyn MessageFormatter>> =
            if source.get_bool("text-format", false) {
                Some(Arc::new(SimpleTextFormatter {
                    quote_empty_fields: source.get_bool("quote-empty-fields", true),
                }))
            } else {
                None
            };

        Self {
            ingest_url: source.get_string_or("url", DEFAULT_INGEST_URL),
            api_key: source.get_string_or("api-key", ""),
            hostname: source.get_string_or("hostname", ""),
            mac: non_empty(source.get_string("mac")),
            ip: non_empty(source.get_string("ip")),
            app: non_empty(source.get_string("app")),
            env: non_empty(source.get_string("env")),
            buffer_size: source.get_usize("size", DEFAULT_BUFFER_SIZE),
            queue_size: source.get_usize("qsize", DEFAULT_QUEUE_SIZE),
            flush_every: source.get_duration("flush", DEFAULT_FLUSH_EVERY),
            may_drop: source.get_bool("drop", false),
            line_json: source.get_bool("json", false),
            message_formatter,
            timeout: source.get_duration("timeout", DEFAULT_TIMEOUT),
            proxy: non_empty(source.get_string("proxy")),
            on_error: None,
        }
    }

    #[must_use]
    pub fn with_error_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.on_error = Some(reporter);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        if self.ingest_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ingest URL cannot be empty".to_string(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "buffer size must be greater than 0".to_string(),
            ));
        }

        if self.flush_every.is_zero() {
            return Err(ConfigError::Invalid(
                "flush interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Key/value lookup the configuration is read from.
///
/// Only [`ConfigSource::get_string`] has to be implemented; the typed getters
/// parse its result and fall back to the default when the key is missing or
/// does not parse.
pub trait ConfigSource {
    fn get_string(&self, key: &str) -> Option<String>;

    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key)
            .unwrap_or_else(|| default.to_string())
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        parse_or(self.get_string(key), key, default, |v| v.trim().parse().ok())
    }

    fn get_usize(&self, key: &str, default: usize) -> usize {
        parse_or(self.get_string(key), key, default, |v| v.trim().parse().ok())
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        parse_or(self.get_string(key), key, default, parse_bool)
    }

    fn get_duration(&self, key: &str, default: Duration) -> Duration {
        parse_or(self.get_string(key), key, default, parse_duration)
    }
}

fn parse_or<T, F>(value: Option<String>, key: &str, default: T, parse: F) -> T
where
    F: FnOnce(&str) -> Option<T>,
{
    let Some(value) = value else {
        return default;
    };
    match parse(&value) {
        Some(parsed) => parsed,
        None => {
            warn!("Ignoring invalid value '{value}' for '{key}', using default");
            default
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parses `500ms`, `10s`, `2m`, `1h` or a bare number of seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);
    let amount: u64 = amount.parse().ok()?;
    match unit.trim() {
        "" | "s" => Some(Duration::from_secs(amount)),
        "ms" => Some(Duration::from_millis(amount)),
        "m" => amount.checked_mul(60).map(Duration::from_secs),
        "h" => amount.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Reads configuration keys from `LOGDNA_`-prefixed environment variables;
/// `api-key` is looked up as `LOGDNA_API_KEY`.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::with_prefix("LOGDNA_")
    }
}

impl EnvSource {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn variable(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.replace('-', "_").to_uppercase())
    }
}

impl ConfigSource for EnvSource {
    fn get_string(&self, key: &str) -> Option<String> {
        env::var(self.variable(key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_source(&source(&[("api-key", "secret")]));
        assert_eq!(config.ingest_url, DEFAULT_INGEST_URL);
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.queue_size, 128);
        assert_eq!(config.flush_every, Duration::from_secs(10));
        assert!(!config.may_drop);
        assert!(!config.line_json);
        assert!(config.message_formatter.is_none());
        assert!(config.mac.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_source_reads_every_key() {
        let config = Config::from_source(&source(&[
            ("url", "http://localhost:1234/ingest"),
            ("api-key", "secret"),
            ("hostname", "web-1"),
            ("mac", "c0:ff:ee:c0:ff:ee"),
            ("ip", "10.0.0.1"),
            ("app", "billing"),
            ("env", "staging"),
            ("size", "4"),
            ("qsize", "2"),
            ("flush", "1s"),
            ("drop", "true"),
            ("json", "yes"),
            ("text-format", "true"),
            ("timeout", "500ms"),
        ]));
        assert_eq!(config.ingest_url, "http://localhost:1234/ingest");
        assert_eq!(config.hostname, "web-1");
        assert_eq!(config.mac.as_deref(), Some("c0:ff:ee:c0:ff:ee"));
        assert_eq!(config.ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(config.app.as_deref(), Some("billing"));
        assert_eq!(config.env.as_deref(), Some("staging"));
        assert_eq!(config.buffer_size, 4);
        assert_eq!(config.queue_size, 2);
        assert_eq!(config.flush_every, Duration::from_secs(1));
        assert!(config.may_drop);
        assert!(config.line_json);
        assert!(config.message_formatter.is_some());
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_empty_tags_are_omitted() {
        let config = Config::from_source(&source(&[("api-key", "secret"), ("app", "  ")]));
        assert!(config.app.is_none());
    }

    #[test]
    #[traced_test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = Config::from_source(&source(&[
            ("api-key", "secret"),
            ("size", "lots"),
            ("drop", "maybe"),
            ("flush", "soon"),
        ]));
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert!(!config.may_drop);
        assert_eq!(config.flush_every, DEFAULT_FLUSH_EVERY);
        assert!(logs_contain("Ignoring invalid value 'lots' for 'size'"));
    }

    #[test]
    fn test_validate_missing_api_key() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_validate_zero_flush_interval() {
        let config = Config {
            api_key: "secret".to_string(),
            flush_every: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_zero_buffer_size() {
        let config = Config {
            api_key: "secret".to_string(),
            buffer_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("10s"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration(" 250ms "), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1d"), None);
        assert_eq!(parse_duration("s"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_env_source_variable_names() {
        let env_source = EnvSource::with_prefix("LOGDNA_TEST_CONFIG_");
        assert_eq!(env_source.variable("api-key"), "LOGDNA_TEST_CONFIG_API_KEY");

        env::set_var("LOGDNA_TEST_CONFIG_QSIZE", "7");
        assert_eq!(env_source.get_usize("qsize", 128), 7);
        env::remove_var("LOGDNA_TEST_CONFIG_QSIZE");
        assert_eq!(env_source.get_usize("qsize", 128), 128);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config {
            api_key: "super-secret".to_string(),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}

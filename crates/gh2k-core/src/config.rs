//! Configuration structures for gh2k.
//!
//! Every field has a fixed default, so the producer runs with no file at all.
//! Values can then be layered from a TOML file, `GH2K_*` environment
//! variables and finally CLI flags.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding [`SourceConfig::feed_url`].
pub const ENV_FEED_URL: &str = "GH2K_FEED_URL";
/// Environment variable overriding [`StreamConfig::stream_name`].
pub const ENV_STREAM_NAME: &str = "GH2K_STREAM_NAME";
/// Environment variable overriding [`StreamConfig::region`].
pub const ENV_REGION: &str = "GH2K_REGION";
/// Environment variable overriding [`StreamConfig::endpoint_url`].
pub const ENV_ENDPOINT_URL: &str = "GH2K_ENDPOINT_URL";
/// Environment variable overriding [`PollConfig::interval_seconds`].
pub const ENV_POLL_INTERVAL_SECONDS: &str = "GH2K_POLL_INTERVAL_SECONDS";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Event feed configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Kinesis stream configuration
    #[serde(default)]
    pub stream: StreamConfig,

    /// Poll loop configuration
    #[serde(default)]
    pub poll: PollConfig,

    /// Monitoring configuration
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Public event feed configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Endpoint polled once per cycle
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Value of the `Accept` header
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Value of the `User-Agent` header (GitHub rejects requests without one)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds; unset leaves the transport default
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            accept: default_accept(),
            user_agent: default_user_agent(),
            request_timeout_seconds: None,
        }
    }
}

/// Kinesis stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Target stream name
    #[serde(default = "default_stream_name")]
    pub stream_name: String,

    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Endpoint override (e.g. a local Kinesis emulator)
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Explicit access key; otherwise the default credential chain is used
    #[serde(default)]
    pub aws_access_key_id: Option<String>,

    /// Explicit secret key, required together with the access key
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stream_name: default_stream_name(),
            region: default_region(),
            endpoint_url: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
        }
    }
}

/// Poll loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    /// Delay between the end of one cycle and the start of the next
    #[serde(default = "default_poll_interval_seconds")]
    pub interval_seconds: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_poll_interval_seconds(),
        }
    }
}

impl PollConfig {
    /// Poll interval as a [`std::time::Duration`].
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_seconds)
    }
}

/// Monitoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Serve `/health`, `/healthz`, `/readyz` and `/metrics`
    #[serde(default = "default_http_enabled")]
    pub http_enabled: bool,

    /// Port for the health and metrics server
    #[serde(default = "default_health_port")]
    pub health_port: u16,

    /// Log format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            http_enabled: default_http_enabled(),
            health_port: default_health_port(),
            log_format: LogFormat::default(),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Plain text format
    Text,
}

// Default value functions
fn default_feed_url() -> String {
    "https://api.github.com/events".to_string()
}
fn default_accept() -> String {
    "application/vnd.github.v3+json".to_string()
}
fn default_user_agent() -> String {
    concat!("gh2k/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_stream_name() -> String {
    "job-analytics-stream".to_string()
}
fn default_region() -> String {
    "eu-north-1".to_string()
}
fn default_poll_interval_seconds() -> u64 {
    10
}
fn default_http_enabled() -> bool {
    true
}
fn default_health_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `GH2K_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> crate::Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// wipe a default.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_FEED_URL) {
            self.source.feed_url = url;
        }
        if let Some(name) = get(ENV_STREAM_NAME) {
            self.stream.stream_name = name;
        }
        if let Some(region) = get(ENV_REGION) {
            self.stream.region = region;
        }
        if let Some(endpoint) = get(ENV_ENDPOINT_URL) {
            self.stream.endpoint_url = Some(endpoint);
        }
        if let Some(raw) = get(ENV_POLL_INTERVAL_SECONDS) {
            self.poll.interval_seconds = raw.trim().parse().map_err(|_| {
                crate::Error::Config(format!(
                    "{} must be a whole number of seconds, got {:?}",
                    ENV_POLL_INTERVAL_SECONDS, raw
                ))
            })?;
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        match reqwest::Url::parse(&self.source.feed_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(crate::Error::Config(format!(
                    "Feed URL must be an absolute http(s) URL: {}",
                    self.source.feed_url
                )));
            }
        }

        if self.stream.stream_name.trim().is_empty() {
            return Err(crate::Error::Config("Stream name is required".into()));
        }

        if self.stream.region.trim().is_empty() {
            return Err(crate::Error::Config("AWS region is required".into()));
        }

        if self.poll.interval_seconds == 0 {
            return Err(crate::Error::Config(
                "Poll interval must be at least one second".into(),
            ));
        }

        if self.stream.aws_access_key_id.is_some() != self.stream.aws_secret_access_key.is_some()
        {
            return Err(crate::Error::Config(
                "aws_access_key_id and aws_secret_access_key must be set together".into(),
            ));
        }

        if self.source.request_timeout_seconds == Some(0) {
            tracing::warn!("request_timeout_seconds = 0 will fail every feed request");
        }

        Ok(())
    }
}

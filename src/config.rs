// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact relay.
//!
//! Defaults match the behaviour of the public contact form: one submission
//! per minute per address, Web3Forms as the delivery endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration errors surfaced at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid relay endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Configuration for the contact relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server-side rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Client-side resubmission window and UI delays
    #[serde(default)]
    pub client: ClientConfig,

    /// Outbound delivery endpoint
    #[serde(default)]
    pub relay: RelayConfig,

    /// Form field handling
    #[serde(default)]
    pub form: FormConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Sliding-window limits applied per client address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum accepted requests per window per address (default: 1)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Interval between stale-entry sweeps in seconds (default: 60)
    #[serde(default = "default_cleanup_secs")]
    pub cleanup_interval_secs: u64,
}

/// Client tier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Minimum seconds between successful submissions (default: 60)
    #[serde(default = "default_window_secs")]
    pub resubmit_window_secs: u64,

    /// Submit control stays disabled this long after a call (default: 1000)
    #[serde(default = "default_reenable_ms")]
    pub reenable_delay_ms: u64,

    /// Status message is hidden this long after re-enable (default: 3000)
    #[serde(default = "default_status_hide_ms")]
    pub status_hide_delay_ms: u64,

    /// Path of the durable timestamp store used by `send`
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

/// Outbound relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Form-delivery endpoint (default: Web3Forms submit API)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Access key merged into each relayed form when the form lacks one
    #[serde(default)]
    pub access_key: Option<String>,

    /// Request timeout in milliseconds (default: 10000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Form handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Hidden field that humans never fill (default: botcheck)
    #[serde(default = "default_honeypot_field")]
    pub honeypot_field: String,

    /// Use the left-most `X-Forwarded-For` address as the client address
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    1
}

fn default_window_secs() -> u64 {
    60
}

fn default_cleanup_secs() -> u64 {
    60
}

fn default_reenable_ms() -> u64 {
    1000
}

fn default_status_hide_ms() -> u64 {
    3000
}

fn default_state_path() -> String {
    ".contact-relay-state.json".to_string()
}

fn default_endpoint() -> String {
    "https://api.web3forms.com/submit".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_honeypot_field() -> String {
    "botcheck".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            client: ClientConfig::default(),
            relay: RelayConfig::default(),
            form: FormConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            cleanup_interval_secs: default_cleanup_secs(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            resubmit_window_secs: default_window_secs(),
            reenable_delay_ms: default_reenable_ms(),
            status_hide_delay_ms: default_status_hide_ms(),
            state_path: default_state_path(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            access_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            honeypot_field: default_honeypot_field(),
            trust_forwarded_for: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl ClientConfig {
    pub fn resubmit_window(&self) -> Duration {
        Duration::from_secs(self.resubmit_window_secs)
    }

    pub fn reenable_delay(&self) -> Duration {
        Duration::from_millis(self.reenable_delay_ms)
    }

    pub fn status_hide_delay(&self) -> Duration {
        Duration::from_millis(self.status_hide_delay_ms)
    }
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parse the endpoint, accepting only http(s) URLs with a host.
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidEndpoint {
                url: self.endpoint.clone(),
                reason: "expected an http(s) URL with a host".to_string(),
            });
        }

        Ok(url)
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
    /// - `RATE_LIMIT_MAX`: Requests per window per address (default: 1)
    /// - `RATE_LIMIT_WINDOW_SECS`: Window length (default: 60)
    /// - `RESUBMIT_WINDOW_SECS`: Client resubmission window (default: 60)
    /// - `CLIENT_STATE_PATH`: Client timestamp store
    /// - `RELAY_ENDPOINT`: Delivery endpoint
    /// - `RELAY_ACCESS_KEY`: Delivery access key
    /// - `RELAY_TIMEOUT_MS`: Outbound timeout (default: 10000)
    /// - `HONEYPOT_FIELD`: Honeypot field name (default: botcheck)
    /// - `TRUST_FORWARDED_FOR`: Honour `X-Forwarded-For` (default: false)
    /// - `METRICS_ENABLED`: Expose `/metrics` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(v) = parsed(&lookup, "RATE_LIMIT_MAX")? {
            config.rate_limit.max_requests = v;
        }
        if let Some(v) = parsed(&lookup, "RATE_LIMIT_WINDOW_SECS")? {
            config.rate_limit.window_secs = v;
        }
        if let Some(v) = parsed(&lookup, "RESUBMIT_WINDOW_SECS")? {
            config.client.resubmit_window_secs = v;
        }
        if let Some(path) = lookup("CLIENT_STATE_PATH") {
            config.client.state_path = path;
        }
        if let Some(endpoint) = lookup("RELAY_ENDPOINT") {
            config.relay.endpoint = endpoint;
        }
        config.relay.access_key = lookup("RELAY_ACCESS_KEY").filter(|k| !k.trim().is_empty());
        if let Some(v) = parsed(&lookup, "RELAY_TIMEOUT_MS")? {
            config.relay.timeout_ms = v;
        }
        if let Some(field) = lookup("HONEYPOT_FIELD") {
            config.form.honeypot_field = field;
        }
        if let Some(v) = parsed(&lookup, "TRUST_FORWARDED_FOR")? {
            config.form.trust_forwarded_for = v;
        }
        if let Some(v) = parsed(&lookup, "METRICS_ENABLED")? {
            config.metrics.enabled = v;
        }

        config.relay.endpoint_url()?;
        Ok(config)
    }
}

fn parsed<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
    }
}

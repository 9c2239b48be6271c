//! Configuration for the Akka cluster exporter.

use akka_cluster_common::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::mapping::is_valid_namespace;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Akka Management endpoint settings.
    #[serde(default)]
    pub akka: AkkaConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream Akka Management endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AkkaConfig {
    /// URI of the cluster members route (default: "http://localhost:19999/members").
    #[serde(default = "default_scrape_uri")]
    pub scrape_uri: String,

    /// Timeout for one fetch of the members route, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_scrape_uri() -> String {
    "http://localhost:19999/members".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl AkkaConfig {
    /// The fetch timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AkkaConfig {
    fn default() -> Self {
        Self {
            scrape_uri: default_scrape_uri(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0:9110").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,

    /// Metric namespace (default: "akka").
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_listen() -> String {
    "0.0.0.0:9110".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

fn default_namespace() -> String {
    "akka".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            namespace: default_namespace(),
        }
    }
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// The scrape URI scheme is checked when the fetcher is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.akka.scrape_uri.trim().is_empty() {
            return Err(ConfigError::Validation(
                "scrape_uri must not be empty".to_string(),
            ));
        }

        if self.akka.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "timeout_ms must be > 0".to_string(),
            ));
        }

        if self
            .prometheus
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen
            )));
        }

        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if matches!(self.prometheus.path.as_str(), "/" | "/health" | "/ready") {
            return Err(ConfigError::Validation(format!(
                "Metrics path {} collides with a built-in route",
                self.prometheus.path
            )));
        }

        if !is_valid_namespace(&self.prometheus.namespace) {
            return Err(ConfigError::Validation(format!(
                "Invalid metric namespace: {}",
                self.prometheus.namespace
            )));
        }

        Ok(())
    }
}

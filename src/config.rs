//! Configuration loading and validation.
//!
//! Every key is optional: the collector runs with built-in defaults when no
//! configuration file is present.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result, ValidationError};
use crate::pipeline::PipelineSettings;

/// Default collection endpoint for newly observed answers.
pub const DEFAULT_INGEST_URL: &str = "https://collect.packetengine.co.uk/ingest";

/// Smallest snapshot length that still holds a full DNS-over-UDP packet.
pub const MIN_SNAPSHOT_LEN: u32 = 1600;

/// Largest snapshot length libpcap accepts.
pub const MAX_SNAPSHOT_LEN: u32 = 262_144;

/// Main configuration for the collector.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Network interface to capture on. If None, auto-detect.
    pub interface: Option<String>,

    /// Endpoint receiving `{"answer": "<name>"}` reports.
    #[serde(default = "default_ingest_url")]
    pub ingest_url: String,

    /// Capacity of the delivery queue between capture and dispatch.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Capture snapshot length in bytes.
    #[serde(default = "default_snapshot_len")]
    pub snapshot_len: u32,

    /// Put the interface in promiscuous mode.
    #[serde(default = "default_promiscuous")]
    pub promiscuous: bool,

    /// Timeout for a single delivery request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Optional cap on concurrent deliveries. Unset means one task per
    /// dequeued answer with no upper bound.
    pub max_in_flight: Option<usize>,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interface: None,
            ingest_url: default_ingest_url(),
            channel_capacity: default_channel_capacity(),
            snapshot_len: default_snapshot_len(),
            promiscuous: default_promiscuous(),
            request_timeout_secs: default_request_timeout(),
            max_in_flight: None,
            metrics: MetricsConfig::default(),
        }
    }
}

fn default_ingest_url() -> String {
    DEFAULT_INGEST_URL.to_string()
}

const fn default_channel_capacity() -> usize {
    100
}

const fn default_snapshot_len() -> u32 {
    MIN_SNAPSHOT_LEN
}

const fn default_promiscuous() -> bool {
    true
}

const fn default_request_timeout() -> u64 {
    30
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9090))
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::ReadFile(err).into()),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate().map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Per-delivery HTTP timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Queue and concurrency settings for the pipeline.
    #[must_use]
    pub const fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            channel_capacity: self.channel_capacity,
            max_in_flight: self.max_in_flight,
        }
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.pipeline_settings().validate()?;

        if self.request_timeout_secs == 0 {
            return Err(ValidationError::ZeroRequestTimeout);
        }

        if !(MIN_SNAPSHOT_LEN..=MAX_SNAPSHOT_LEN).contains(&self.snapshot_len) {
            return Err(ValidationError::SnapshotLenOutOfRange {
                value: self.snapshot_len,
                min: MIN_SNAPSHOT_LEN,
                max: MAX_SNAPSHOT_LEN,
            });
        }

        if self.interface.as_deref().is_some_and(str::is_empty) {
            return Err(ValidationError::EmptyInterface);
        }

        if !self.ingest_url.starts_with("http://") && !self.ingest_url.starts_with("https://") {
            return Err(ValidationError::InvalidIngestUrl {
                url: self.ingest_url.clone(),
            });
        }

        Ok(())
    }
}

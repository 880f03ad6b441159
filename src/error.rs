//! Error types for the DNS answer collector.

use std::io;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

/// Main error type for collector operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("metrics error: {0}")]
    Metrics(#[from] BuildError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation errors for configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("channel_capacity must be greater than 0")]
    ZeroChannelCapacity,

    #[error("request_timeout_secs must be greater than 0")]
    ZeroRequestTimeout,

    #[error("max_in_flight must be greater than 0 when set")]
    ZeroMaxInFlight,

    #[error("max_in_flight must be at most {max}, got {value}")]
    MaxInFlightTooLarge { value: usize, max: usize },

    #[error("snapshot_len must be between {min} and {max}, got {value}")]
    SnapshotLenOutOfRange { value: u32, min: u32, max: u32 },

    #[error("interface name cannot be empty")]
    EmptyInterface,

    #[error("ingest_url must start with http:// or https://: {url:?}")]
    InvalidIngestUrl { url: String },
}

/// Network-related errors. All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("no active network interface found")]
    NoInterface,

    #[error("failed to enumerate network interfaces: {0}")]
    InterfaceList(String),

    #[error("failed to open capture on {interface}: {reason}")]
    CaptureOpen { interface: String, reason: String },

    #[error("capture filter {filter:?} rejected: {reason}")]
    FilterRejected { filter: String, reason: String },

    #[error("failed to spawn capture thread: {0}")]
    ThreadSpawn(#[source] io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

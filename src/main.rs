//! dnscollect - Entry point.
//!
//! This binary captures DNS responses on the active network interface,
//! deduplicates the answer names it sees, and reports each new one to the
//! ingest endpoint. It needs capture privileges (root or administrator).

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dnscollect::config::Config;
use dnscollect::delivery::HttpSink;
use dnscollect::network::{CaptureSettings, PcapCapture, platform_discovery, select_interface};
use dnscollect::pipeline::run_pipeline;

/// Configuration file read when `CONFIG_PATH` is not set. Optional.
const DEFAULT_CONFIG_PATH: &str = "dnscollect.toml";

/// Cancel `shutdown` on Ctrl-C.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, draining pending deliveries...");
                shutdown.cancel();
            }
            Err(err) => warn!("Failed to listen for Ctrl-C: {err}"),
        }
    });
}

async fn run() -> Result<()> {
    let config = match std::env::var("CONFIG_PATH") {
        Ok(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {path}"))?,
        Err(_) => Config::load_or_default(DEFAULT_CONFIG_PATH)
            .context("Failed to load configuration")?,
    };

    dnscollect::metrics::init(&config.metrics).context("Failed to initialize metrics")?;
    if config.metrics.enabled {
        info!("Metrics enabled on {}", config.metrics.listen);
    }

    info!("Starting dnscollect...");
    info!("Ingest endpoint: {}", config.ingest_url);

    let interface = match config.interface.clone() {
        Some(name) => name,
        None => select_interface(&platform_discovery())
            .context("Error detecting active network interface")?,
    };
    info!("Using interface: {interface}");

    let capture = PcapCapture::open(
        &interface,
        &CaptureSettings {
            snapshot_len: config.snapshot_len,
            promiscuous: config.promiscuous,
        },
    )
    .context("Failed to open packet capture (are you running as root?)")?;

    let sink = HttpSink::new(config.ingest_url.clone(), config.request_timeout())
        .context("Failed to create HTTP client")?;

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    info!("Starting DNS capture...");
    let report = run_pipeline(
        capture,
        sink,
        config.pipeline_settings(),
        shutdown,
    )
    .await?;

    if let Some(capture) = report.capture {
        info!(
            frames = capture.frames,
            answers = capture.answers,
            enqueued = capture.enqueued,
            "Capture finished"
        );
    }
    info!(
        dispatched = report.dispatch.dispatched,
        delivered = report.dispatch.delivered,
        failed = report.dispatch.failed,
        "Shutdown complete."
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        error!("{err:#}");
        std::process::exit(1);
    }
}

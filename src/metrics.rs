//! Metrics initialization for Prometheus exporter.

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;
use crate::error::Result;

/// Initialize the metrics system based on configuration.
///
/// When metrics are enabled, this starts an HTTP server that exposes
/// a `/metrics` endpoint for Prometheus to scrape. Must be called from
/// within the tokio runtime.
///
/// When metrics are disabled, this is a no-op. The `metrics` crate
/// handles unregistered metrics gracefully (they become no-ops).
pub fn init(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen)
        .install()?;

    describe();
    Ok(())
}

fn describe() {
    metrics::describe_counter!(
        "dnscollect_frames_total",
        "Frames read from the capture device"
    );
    metrics::describe_counter!(
        "dnscollect_answers_new_total",
        "Answer names seen for the first time"
    );
    metrics::describe_counter!(
        "dnscollect_deliveries_total",
        "Delivery attempts by outcome"
    );
    metrics::describe_gauge!(
        "dnscollect_deliveries_in_flight",
        "Deliveries currently awaiting a response"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;
    use std::error::Error as _;

    #[test]
    fn disabled_metrics_is_a_no_op() {
        assert!(init(&MetricsConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn second_install_keeps_exporter_error() {
        let config = MetricsConfig {
            enabled: true,
            listen: "127.0.0.1:0".parse().unwrap(),
        };

        init(&config).unwrap();
        let err = init(&config).unwrap_err();

        assert!(matches!(err, Error::Metrics(_)));
        assert!(err.source().is_some());
    }
}

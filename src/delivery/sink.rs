//! Delivery of answer names to the remote ingest endpoint.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

/// User-Agent header value for ingest requests.
const USER_AGENT: &str = concat!("dnscollect/", env!("CARGO_PKG_VERSION"));

/// Error type for a single failed delivery.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The endpoint answered with something other than 200 or 201.
    #[error("ingest endpoint returned status {status}")]
    HttpStatus {
        /// HTTP status code returned.
        status: u16,
    },

    /// Network error during the request (DNS, connect, TLS, ...).
    #[error("network error posting to {url}: {source}")]
    Network {
        /// URL that was requested.
        url: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete in time.
    #[error("timeout posting to {url}")]
    Timeout {
        /// URL that timed out.
        url: String,
    },

    /// Failed to create HTTP client.
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// A successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered {
    pub status: u16,
}

/// Trait for answer delivery.
///
/// Implementations make exactly one attempt per call; retrying is not the
/// sink's business.
pub trait DeliverySink: Send + Sync + 'static {
    /// Report a newly observed answer name.
    fn deliver(&self, name: &str) -> impl Future<Output = Result<Delivered, DeliveryError>> + Send;
}

/// Body of an ingest request.
#[derive(Debug, Serialize)]
struct Report<'a> {
    answer: &'a str,
}

/// Production sink posting JSON to the ingest endpoint.
#[derive(Clone, Debug)]
pub struct HttpSink {
    client: Client,
    endpoint: String,
}

impl HttpSink {
    /// Create a sink posting to `endpoint` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::ClientBuild`] if the HTTP client cannot be
    /// created (e.g. no TLS backend available).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(DeliveryError::ClientBuild)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl DeliverySink for HttpSink {
    async fn deliver(&self, name: &str) -> Result<Delivered, DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&Report { answer: name })
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    DeliveryError::Timeout {
                        url: self.endpoint.clone(),
                    }
                } else {
                    DeliveryError::Network {
                        url: self.endpoint.clone(),
                        source: err,
                    }
                }
            })?;

        match response.status() {
            status @ (StatusCode::OK | StatusCode::CREATED) => Ok(Delivered {
                status: status.as_u16(),
            }),
            status => Err(DeliveryError::HttpStatus {
                status: status.as_u16(),
            }),
        }
    }
}

// # DuckDNS Client
//
// HTTP implementation of `DnsUpdater` for the DuckDNS update endpoint.
//
// ## Protocol
//
// One GET per attempt:
//
// ```text
// GET <endpoint>?domains=<domain>&token=<token>&ip=
// ```
//
// The empty `ip` asks the server to use the caller's public address.
// The body is plain text: `OK` (after trimming) is a success, anything else
// (typically `KO`) is a remote error. The HTTP status is not consulted.
//
// ## Constraints
//
// - One request per call, no retries (the scheduler owns the cadence)
// - Bounded by the request timeout (10 seconds by default)
// - Failures come back as `UpdateResponse` values, never as `Err`
// - The token is part of the URL, so URLs are stripped from every error
//   message and never logged

use async_trait::async_trait;
use duckdns_core::config::{AppConfig, DEFAULT_ENDPOINT};
use duckdns_core::traits::{DnsUpdater, UpdateResponse};
use duckdns_core::{Error, Result};
use std::time::Duration;

/// Default upper bound on a single update request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// DuckDNS update client
///
/// Stateless apart from the connection pool; safe to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct DuckDnsClient {
    /// Update endpoint URL (without query)
    endpoint: String,

    /// HTTP client carrying the request timeout
    client: reqwest::Client,
}

impl DuckDnsClient {
    /// Create a client for the public endpoint with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client for a specific endpoint
    ///
    /// # Parameters
    ///
    /// - `endpoint`: `http://` or `https://` URL of the update endpoint
    /// - `timeout`: Upper bound on the whole request, body included
    ///
    /// # Returns
    ///
    /// - `Ok(DuckDnsClient)`: Ready to use
    /// - `Err(Error::Config)`: The endpoint is not an HTTP(S) URL
    /// - `Err(Error::Http)`: The HTTP client could not be built (TLS setup)
    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Self::with_client(endpoint, client)
    }

    /// Create a client around an existing `reqwest::Client`
    ///
    /// The caller is responsible for configuring the timeout.
    pub fn with_client(endpoint: impl Into<String>, client: reqwest::Client) -> Result<Self> {
        let endpoint = endpoint.into();
        if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
            return Err(Error::config(format!(
                "Endpoint must use HTTP or HTTPS scheme. Got: {}",
                endpoint
            )));
        }

        Ok(Self { endpoint, client })
    }

    /// Create a client from the application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::with_endpoint(config.endpoint.clone(), config.scheduler.request_timeout())
    }

    /// Endpoint this client talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DnsUpdater for DuckDnsClient {
    async fn update(&self, domain: &str, token: &str) -> UpdateResponse {
        tracing::debug!("Sending DuckDNS update for domain {}", domain);

        let response = match self
            .client
            .get(&self.endpoint)
            .query(&[("domains", domain), ("token", token), ("ip", "")])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let reason = describe_transport_error(e);
                tracing::warn!("DuckDNS request failed: {}", reason);
                return UpdateResponse::TransportError(reason);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let reason = describe_transport_error(e);
                tracing::warn!("Failed to read DuckDNS response: {}", reason);
                return UpdateResponse::TransportError(reason);
            }
        };

        tracing::debug!("DuckDNS answered {} with {} byte body", status, body.len());

        match UpdateResponse::from_body(body) {
            UpdateResponse::RemoteError(body) if body.trim().is_empty() => {
                UpdateResponse::RemoteError(format!("HTTP {}", status))
            }
            response => response,
        }
    }

    fn updater_name(&self) -> &'static str {
        "duckdns"
    }
}

/// Render a reqwest error without the request URL (it carries the token)
fn describe_transport_error(error: reqwest::Error) -> String {
    let kind = if error.is_timeout() {
        "timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };

    let error = error.without_url();
    let mut reason = format!("{}: {}", kind, error);

    let mut source = std::error::Error::source(&error);
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }

    reason
}

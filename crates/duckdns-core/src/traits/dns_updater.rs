// # DNS Updater Trait
//
// Defines the interface for pushing the caller's address to a dynamic DNS
// provider.
//
// ## Implementations
//
// - DuckDNS: `duckdns-client` crate
//
// ## Usage
//
// ```rust,ignore
// use duckdns_core::traits::{DnsUpdater, UpdateResponse};
//
// let updater = /* DnsUpdater implementation */;
// match updater.update("myhome", "token").await {
//     UpdateResponse::Success(_) => println!("record updated"),
//     other => println!("update failed: {}", other.message()),
// }
// ```

use async_trait::async_trait;

/// Classified result of a single update request
///
/// Every request ends in exactly one of these. None of them is an `Err`:
/// the scheduler records failures and carries on with its cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResponse {
    /// The endpoint answered with the literal body `OK`
    Success(String),

    /// The endpoint was reached but answered with anything else
    RemoteError(String),

    /// The request never produced a body (DNS failure, refusal, timeout)
    TransportError(String),
}

impl UpdateResponse {
    /// Classify a response body
    ///
    /// The body is trimmed before comparing against `OK`; the raw
    /// text is kept for the remote-error message.
    pub fn from_body(body: impl Into<String>) -> Self {
        let body = body.into();
        if body.trim() == "OK" {
            Self::Success(body.trim().to_string())
        } else {
            Self::RemoteError(body)
        }
    }

    /// Whether the update was accepted
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The response text or failure reason
    pub fn message(&self) -> &str {
        match self {
            Self::Success(text) | Self::RemoteError(text) | Self::TransportError(text) => text,
        }
    }
}

/// Trait for dynamic DNS updater implementations
///
/// # Trust Level: Untrusted
///
/// Updaters are single-shot: one request per call, no retries, no
/// background tasks, no scheduling decisions. Retry happens through the
/// scheduler's periodic cadence. The only bound on a call's duration is the
/// implementation's request timeout.
///
/// Implementations must never log the token.
#[async_trait]
pub trait DnsUpdater: Send + Sync {
    /// Ask the provider to point `domain` at the caller's current address
    ///
    /// # Parameters
    ///
    /// - `domain`: The provider-side record name
    /// - `token`: The account token
    async fn update(&self, domain: &str, token: &str) -> UpdateResponse;

    /// Get the updater name (for logging/debugging)
    fn updater_name(&self) -> &'static str;
}

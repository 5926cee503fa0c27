//! Configuration types for the DuckDNS updater
//!
//! This module defines the credentials record and the runtime settings
//! consumed by the scheduler, the instance guard and the daemon.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default DuckDNS update endpoint
pub const DEFAULT_ENDPOINT: &str = "https://www.duckdns.org/update";

/// Default rendezvous key for the single-instance guard
pub const DEFAULT_INSTANCE_KEY: &str = "DuckDNSUpdaterUniqueKey1234";

/// DuckDNS credentials
///
/// Both fields must be non-empty before an update attempt may touch the
/// network.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// DuckDNS subdomain (e.g. "myhome" for myhome.duckdns.org)
    #[serde(default)]
    pub domain: String,

    /// DuckDNS account token
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub token: String,
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("domain", &self.domain)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl Credentials {
    /// Create credentials, trimming surrounding whitespace
    pub fn new(domain: impl AsRef<str>, token: impl AsRef<str>) -> Self {
        Self {
            domain: domain.as_ref().trim().to_string(),
            token: token.as_ref().trim().to_string(),
        }
    }

    /// Whether both fields are present
    pub fn is_complete(&self) -> bool {
        !self.domain.is_empty() && !self.token.is_empty()
    }

    /// Validate the credentials
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.is_complete() {
            return Err(crate::Error::config("domain and token cannot be empty"));
        }
        Ok(())
    }
}

/// Main updater configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path of the credentials file
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// Application-unique key naming the rendezvous channel
    #[serde(default = "default_instance_key")]
    pub instance_key: String,

    /// Directory holding the rendezvous socket (unix only)
    ///
    /// `None` selects `$XDG_RUNTIME_DIR`, falling back to the temp dir.
    #[serde(default)]
    pub runtime_dir: Option<PathBuf>,

    /// Update endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Maximum number of entries kept in the status log
    #[serde(default = "default_status_log_capacity")]
    pub status_log_capacity: usize,

    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            settings_path: default_settings_path(),
            instance_key: default_instance_key(),
            runtime_dir: None,
            endpoint: default_endpoint(),
            status_log_capacity: default_status_log_capacity(),
            scheduler: SchedulerConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.instance_key.trim().is_empty() {
            return Err(crate::Error::config("Instance key cannot be empty"));
        }

        if self
            .instance_key
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace())
        {
            return Err(crate::Error::config(format!(
                "Instance key contains path separators or whitespace: '{}'",
                self.instance_key
            )));
        }

        if !self.endpoint.starts_with("https://") && !self.endpoint.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "Endpoint must use HTTP or HTTPS scheme. Got: {}",
                self.endpoint
            )));
        }

        if self.status_log_capacity == 0 {
            return Err(crate::Error::config("Status log capacity must be > 0"));
        }

        self.scheduler.validate()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between periodic update attempts (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound on a single update request (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long the instance guard waits for a live holder (in milliseconds)
    #[serde(default = "default_guard_timeout_ms")]
    pub guard_timeout_ms: u64,
}

impl SchedulerConfig {
    /// Periodic update interval
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Guard connect timeout
    pub fn guard_timeout(&self) -> Duration {
        Duration::from_millis(self.guard_timeout_ms)
    }

    /// Validate the scheduler configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Update interval must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }
        if self.guard_timeout_ms == 0 {
            return Err(crate::Error::config("Guard timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            guard_timeout_ms: default_guard_timeout_ms(),
        }
    }
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("settings.json")
}

fn default_instance_key() -> String {
    DEFAULT_INSTANCE_KEY.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_status_log_capacity() -> usize {
    200
}

fn default_interval_secs() -> u64 {
    60 * 60
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_guard_timeout_ms() -> u64 {
    500
}

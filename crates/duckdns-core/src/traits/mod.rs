//! Core traits for the DuckDNS updater
//!
//! This module defines the seams between the update engine and its
//! collaborators.
//!
//! - [`DnsUpdater`]: Issue a dynamic DNS update request
//! - [`ConfigStore`]: Get/set contract for the credentials
//! - [`StatusSink`]: User-visible outcome log

pub mod dns_updater;
pub mod config_store;
pub mod status_sink;

pub use dns_updater::{DnsUpdater, UpdateResponse};
pub use config_store::{ConfigStore, save_credentials};
pub use status_sink::StatusSink;

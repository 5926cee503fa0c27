// # duckdns-core
//
// Core library for the DuckDNS updater.
//
// ## Architecture Overview
//
// This library provides the update-and-coordination engine:
// - **SingleInstanceGuard**: Only one updater per machine
// - **UpdateScheduler**: Periodic, serialized update attempts and their recorded outcome
// - **VisibilitySignal**: Coalescing mailbox for toggle requests from other contexts
// - **DnsUpdater / ConfigStore / StatusSink**: Seams to the HTTP client, credentials and log
// - **Controller**: Control loop consuming visibility requests and scheduler snapshots
//
// ## Design Principles
//
// 1. **Guard first**: A second instance exits before any config or network I/O
// 2. **Failures are values**: Transport and remote errors are recorded, never raised
// 3. **No regression**: A failed attempt never moves the last-success timestamp
// 4. **Single owner**: Visibility is only mutated by the control loop

pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod instance;
pub mod scheduler;
pub mod signal;
pub mod status;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use app::{Launch, Running, launch};
pub use config::{AppConfig, Credentials, SchedulerConfig};
pub use controller::{Controller, StatusView};
pub use error::{Error, Result};
pub use instance::{InstanceClaim, InstanceLock, SingleInstanceGuard};
pub use scheduler::{SchedulerHandle, TriggerResult, UpdateOutcome, UpdateScheduler, UpdateState};
pub use signal::{VisibilityMailbox, VisibilityTrigger, visibility_signal};
pub use status::{StatusEntry, StatusLog};
pub use store::{FileConfigStore, MemoryConfigStore};
pub use traits::{ConfigStore, DnsUpdater, StatusSink, UpdateResponse};

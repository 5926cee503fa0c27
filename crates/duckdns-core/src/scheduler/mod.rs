//! Periodic update scheduler
//!
//! The UpdateScheduler is responsible for:
//! - Driving update attempts on a fixed cadence (plus manual triggers)
//! - Rejecting attempts with incomplete credentials before any network I/O
//! - Serializing attempts: at most one request in flight
//! - Recording each outcome into [`UpdateState`] and the status sink
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   tick / trigger_now()   ┌─────────────────┐
//! │ interval     │─────────────────────────▶│ UpdateScheduler │
//! └──────────────┘                          └─────────────────┘
//!                                                    │
//!         ┌──────────────────────────┬───────────────┼──────────────────┐
//!         ▼                          ▼               ▼                  ▼
//! ┌─────────────┐           ┌──────────────┐  ┌─────────────┐   ┌─────────────┐
//! │ ConfigStore │           │ DnsUpdater   │  │ UpdateState │   │ StatusSink  │
//! │ (read)      │           │ (one call)   │  │ (write)     │   │ (record)    │
//! └─────────────┘           └──────────────┘  └─────────────┘   └─────────────┘
//! ```
//!
//! ## Attempt Flow
//!
//! 1. Claim the in-flight slot; if taken, drop the trigger
//! 2. Read fresh credentials from the ConfigStore
//! 3. If incomplete, record `Rejected` and stop (no network call)
//! 4. Call DnsUpdater::update()
//! 5. Write the outcome; `last_success_time` moves only on success

use crate::traits::{ConfigStore, DnsUpdater, StatusSink, UpdateResponse};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info, warn};

/// Shortest cadence accepted by [`UpdateScheduler::start`]
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Message recorded when an attempt is skipped for missing credentials
pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid credentials";

/// Classification of the last attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOutcome {
    /// The endpoint accepted the update
    Success,
    /// The attempt never reached the network (incomplete credentials)
    Rejected,
    /// The endpoint answered with something other than `OK`
    RemoteError,
    /// The request failed below the application layer
    TransportError,
}

impl UpdateOutcome {
    /// Whether this outcome counts as a success for display purposes
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<&UpdateResponse> for UpdateOutcome {
    fn from(response: &UpdateResponse) -> Self {
        match response {
            UpdateResponse::Success(_) => Self::Success,
            UpdateResponse::RemoteError(_) => Self::RemoteError,
            UpdateResponse::TransportError(_) => Self::TransportError,
        }
    }
}

/// Observable state of the scheduler
///
/// Only the scheduler writes it; everyone else reads a snapshot via
/// [`UpdateScheduler::current_state`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateState {
    /// Time of the last successful update (never regressed by a failure)
    pub last_success_time: Option<DateTime<Utc>>,
    /// Message recorded for the last attempt
    pub last_message: String,
    /// Outcome of the last attempt (`None` before the first one)
    pub last_outcome: Option<UpdateOutcome>,
}

/// What caused an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOrigin {
    /// The periodic timer (including the immediate startup tick)
    Timer,
    /// An explicit `trigger_now()` call
    Manual,
}

/// Result of asking the scheduler for an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerResult {
    /// The attempt ran to completion with this outcome
    Completed(UpdateOutcome),
    /// Another attempt was already in flight; this request was dropped
    Dropped,
}

/// Periodic update scheduler
///
/// Share it behind an `Arc`: the periodic task, manual triggers and the
/// controller all hold the same instance.
///
/// ## Serialization
///
/// Attempts are mutually exclusive. A trigger that arrives while an
/// attempt is running is dropped, not queued. No lock is held across the
/// network call; the state lock is taken only to write the outcome.
pub struct UpdateScheduler {
    /// DNS updater (one request per attempt)
    updater: Arc<dyn DnsUpdater>,

    /// Credentials, re-read on every attempt
    store: Arc<dyn ConfigStore>,

    /// User-visible outcome log
    sink: Arc<dyn StatusSink>,

    /// Last recorded outcome
    state: RwLock<UpdateState>,

    /// Set while an attempt is running
    in_flight: AtomicBool,
}

impl UpdateScheduler {
    /// Create a new scheduler
    ///
    /// # Parameters
    ///
    /// - `updater`: DNS updater implementation
    /// - `store`: Credentials store
    /// - `sink`: Status sink receiving one line per attempt
    pub fn new(
        updater: Arc<dyn DnsUpdater>,
        store: Arc<dyn ConfigStore>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            updater,
            store,
            sink,
            state: RwLock::new(UpdateState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Start the periodic cadence
    ///
    /// One attempt runs immediately, then one per `interval` for as long as
    /// the returned handle lives. Dropping or stopping the handle aborts the
    /// task at once, abandoning any outstanding request.
    ///
    /// An interval shorter than [`MIN_INTERVAL`] is raised to it.
    pub fn start(self: &Arc<Self>, interval: Duration) -> SchedulerHandle {
        let scheduler = Arc::clone(self);
        let interval = if interval < MIN_INTERVAL {
            warn!("Update interval {:?} too short; using {:?}", interval, MIN_INTERVAL);
            MIN_INTERVAL
        } else {
            interval
        };

        let task = tokio::spawn(async move {
            info!(
                "Starting update scheduler (updater={}, interval={:?})",
                scheduler.updater.updater_name(),
                interval
            );

            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = IntervalStream::new(timer);

            while ticks.next().await.is_some() {
                scheduler.attempt(AttemptOrigin::Timer).await;
            }
        });

        SchedulerHandle { task }
    }

    /// Run an attempt now, unless one is already in flight
    pub async fn trigger_now(&self) -> TriggerResult {
        self.attempt(AttemptOrigin::Manual).await
    }

    /// Snapshot of the observable state
    pub fn current_state(&self) -> UpdateState {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether an attempt is currently running
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Perform a single serialized attempt
    async fn attempt(&self, origin: AttemptOrigin) -> TriggerResult {
        let Some(_slot) = InFlightSlot::acquire(&self.in_flight) else {
            debug!("Update attempt ({:?}) dropped: another attempt is in flight", origin);
            return TriggerResult::Dropped;
        };

        debug!("Update attempt started ({:?})", origin);

        let credentials = match self.store.load().await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!("Failed to read credentials from {} store: {}", self.store.store_name(), e);
                let message = format!("{}: {}", INVALID_CREDENTIALS_MESSAGE, e);
                return self.finish(UpdateOutcome::Rejected, message, None);
            }
        };

        if !credentials.is_complete() {
            warn!("Update skipped: domain or token is empty");
            return self.finish(
                UpdateOutcome::Rejected,
                INVALID_CREDENTIALS_MESSAGE.to_string(),
                None,
            );
        }

        let attempted_at = Utc::now();
        let response = self
            .updater
            .update(&credentials.domain, &credentials.token)
            .await;

        let outcome = UpdateOutcome::from(&response);
        let message = match &response {
            UpdateResponse::Success(text) => format!("update succeeded: {}", text),
            UpdateResponse::RemoteError(body) => format!("update failed: {}", body),
            UpdateResponse::TransportError(reason) => format!("error: {}", reason),
        };

        let success_time = outcome.is_success().then_some(attempted_at);
        self.finish(outcome, message, success_time)
    }

    /// Record an outcome into the state and the status sink
    fn finish(
        &self,
        outcome: UpdateOutcome,
        message: String,
        success_time: Option<DateTime<Utc>>,
    ) -> TriggerResult {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if let Some(at) = success_time {
                state.last_success_time = Some(at);
            }
            state.last_message = message.clone();
            state.last_outcome = Some(outcome);
        }

        self.sink.record(&message, outcome.is_success());
        TriggerResult::Completed(outcome)
    }
}

/// Handle to the periodic task
///
/// The task is aborted when the handle is stopped or dropped.
#[derive(Debug)]
pub struct SchedulerHandle {
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Abort the periodic task immediately
    pub fn stop(self) {
        // Drop does the abort
    }

    /// Whether the periodic task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// RAII claim on the in-flight flag
///
/// Released on drop, including when the attempt future is cancelled.
struct InFlightSlot<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightSlot<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

//! Control loop
//!
//! The Controller is the single owner of visibility. It consumes toggle
//! requests from the [`VisibilityMailbox`], reads scheduler snapshots for
//! display, and hands manual updates off to a worker task so the loop never
//! waits on the network.

use chrono::{DateTime, Local};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use crate::scheduler::{TriggerResult, UpdateOutcome, UpdateScheduler};
use crate::signal::{VisibilityMailbox, VisibilityTrigger};
use crate::traits::StatusSink;

/// Display text used before the first successful update
pub const NOT_YET_UPDATED: &str = "not yet";

/// Status line recorded when the surface is shown
pub const SHOWN_MESSAGE: &str = "shown";

/// Status line recorded when the surface is hidden
pub const HIDDEN_MESSAGE: &str = "hidden; still running in the background";

/// Snapshot of everything a front end would display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    /// Wall clock at the time of the snapshot
    pub now: DateTime<Local>,
    /// Whether the surface is currently shown
    pub visible: bool,
    /// Last successful update, in local time
    pub last_success: Option<DateTime<Local>>,
    /// Message of the last attempt
    pub last_message: String,
    /// Outcome of the last attempt
    pub last_outcome: Option<UpdateOutcome>,
}

impl StatusView {
    /// `YYYY-mm-dd HH:MM:SS` of the last success, or "not yet"
    pub fn last_success_display(&self) -> String {
        self.last_success
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| NOT_YET_UPDATED.to_string())
    }

    /// `YYYY-mm-dd HH:MM:SS` of the snapshot time
    pub fn clock_display(&self) -> String {
        self.now.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Control loop owning visibility
pub struct Controller {
    scheduler: Arc<UpdateScheduler>,
    sink: Arc<dyn StatusSink>,
    mailbox: VisibilityMailbox,
    visible: bool,
    clock_interval: Duration,
}

impl Controller {
    /// Create a controller; the surface starts visible
    pub fn new(
        scheduler: Arc<UpdateScheduler>,
        sink: Arc<dyn StatusSink>,
        mailbox: VisibilityMailbox,
    ) -> Self {
        Self {
            scheduler,
            sink,
            mailbox,
            visible: true,
            clock_interval: Duration::from_secs(1),
        }
    }

    /// Set how often the clock refreshes
    pub fn with_clock_interval(mut self, interval: Duration) -> Self {
        self.clock_interval = interval;
        self
    }

    /// Whether the surface is shown
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// A trigger feeding this controller's mailbox
    pub fn visibility_trigger(&self) -> VisibilityTrigger {
        self.mailbox.trigger()
    }

    /// Apply a pending toggle, if any
    ///
    /// Returns whether a toggle was applied.
    pub fn apply_pending(&mut self) -> bool {
        if !self.mailbox.drain_pending() {
            return false;
        }
        self.visible = !self.visible;
        if self.visible {
            self.sink.record(SHOWN_MESSAGE, true);
        } else {
            self.sink.record(HIDDEN_MESSAGE, true);
        }
        true
    }

    /// Hide instead of quitting (close or minimize)
    pub fn hide_to_background(&mut self) {
        if self.visible {
            self.visible = false;
            self.sink.record(HIDDEN_MESSAGE, true);
        }
    }

    /// Start a manual update on a worker task
    ///
    /// Dropped by the scheduler if an attempt is already running.
    pub fn request_update(&self) -> JoinHandle<TriggerResult> {
        let scheduler = Arc::clone(&self.scheduler);
        tokio::spawn(async move { scheduler.trigger_now().await })
    }

    /// Snapshot for display
    pub fn view(&self) -> StatusView {
        let state = self.scheduler.current_state();
        StatusView {
            now: Local::now(),
            visible: self.visible,
            last_success: state.last_success_time.map(|at| at.with_timezone(&Local)),
            last_message: state.last_message,
            last_outcome: state.last_outcome,
        }
    }

    /// Run the control loop until `shutdown` resolves
    ///
    /// Shutdown is immediate: nothing is drained or awaited on the way out.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut clock = tokio::time::interval(self.clock_interval);
        clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!("Control loop started");

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Control loop stopping");
                    break;
                }

                _ = self.mailbox.wait() => {
                    self.apply_pending();
                }

                _ = clock.tick() => {
                    let view = self.view();
                    trace!(
                        "clock={} last_update={} visible={}",
                        view.clock_display(),
                        view.last_success_display(),
                        view.visible
                    );
                }
            }
        }
    }
}

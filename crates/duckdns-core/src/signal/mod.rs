//! Cross-context visibility signalling
//!
//! A single-slot mailbox: any thread or task may request a visibility
//! toggle through a [`VisibilityTrigger`]; only the control loop, which
//! owns the [`VisibilityMailbox`], consumes the request. Repeated requests
//! between two drains coalesce into one pending flag.
//!
//! The producer side never blocks and never touches UI state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Slot {
    pending: AtomicBool,
    wake: Notify,
}

/// Create a connected trigger/mailbox pair
pub fn visibility_signal() -> (VisibilityTrigger, VisibilityMailbox) {
    let slot = Arc::new(Slot::default());
    (
        VisibilityTrigger {
            slot: Arc::clone(&slot),
        },
        VisibilityMailbox { slot },
    )
}

/// Producer side: cheap to clone, callable from any context
#[derive(Debug, Clone)]
pub struct VisibilityTrigger {
    slot: Arc<Slot>,
}

impl VisibilityTrigger {
    /// Request a toggle
    pub fn signal_toggle(&self) {
        self.slot.pending.store(true, Ordering::Release);
        // notify_one keeps a single permit, matching the single slot
        self.slot.wake.notify_one();
    }
}

/// Consumer side, owned by the control loop
///
/// Deliberately not `Clone`: there is exactly one consumer.
#[derive(Debug)]
pub struct VisibilityMailbox {
    slot: Arc<Slot>,
}

impl VisibilityMailbox {
    /// Take the pending request, if any
    ///
    /// Returns `true` at most once per batch of `signal_toggle` calls.
    pub fn drain_pending(&mut self) -> bool {
        self.slot.pending.swap(false, Ordering::AcqRel)
    }

    /// Wait until a toggle may be pending
    ///
    /// Wakeups can be spurious; follow with [`drain_pending`](Self::drain_pending).
    pub async fn wait(&mut self) {
        if self.slot.pending.load(Ordering::Acquire) {
            return;
        }
        self.slot.wake.notified().await;
    }

    /// Create another trigger feeding this mailbox
    pub fn trigger(&self) -> VisibilityTrigger {
        VisibilityTrigger {
            slot: Arc::clone(&self.slot),
        }
    }
}

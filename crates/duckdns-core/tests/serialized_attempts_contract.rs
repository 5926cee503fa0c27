//! Contract Test: Serialized Attempts
//!
//! Constraints verified:
//! - At most one update request is in flight at any time
//! - A trigger arriving mid-attempt is dropped, not queued
//! - A cancelled attempt frees the slot and records nothing
//!
//! If this test fails, overlapping timer and manual attempts can race on
//! the recorded state.

mod common;

use common::*;
use duckdns_core::scheduler::{TriggerResult, UpdateOutcome, UpdateScheduler};
use duckdns_core::status::StatusLog;
use std::sync::Arc;
use std::time::Duration;

fn gated_scheduler() -> (Arc<GatedUpdater>, Arc<StatusLog>, Arc<UpdateScheduler>) {
    let updater = Arc::new(GatedUpdater::new());
    let store = Arc::new(CountingStore::new(valid_credentials()));
    let log = Arc::new(StatusLog::new(10));
    let scheduler = Arc::new(UpdateScheduler::new(updater.clone(), store, log.clone()));
    (updater, log, scheduler)
}

#[tokio::test]
async fn trigger_during_attempt_is_dropped() {
    let (updater, log, scheduler) = gated_scheduler();

    let first = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.trigger_now().await }
    });
    assert!(eventually(|| updater.update_call_count() == 1).await);
    assert!(scheduler.is_running());

    assert_eq!(scheduler.trigger_now().await, TriggerResult::Dropped);

    updater.release(1);
    assert_eq!(
        first.await.unwrap(),
        TriggerResult::Completed(UpdateOutcome::Success)
    );

    assert_eq!(updater.update_call_count(), 1, "Dropped trigger sent nothing");
    assert_eq!(log.len(), 1, "Dropped trigger recorded nothing");
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn burst_of_triggers_yields_one_request() {
    let (updater, _log, scheduler) = gated_scheduler();

    let first = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.trigger_now().await }
    });
    assert!(eventually(|| updater.update_call_count() == 1).await);

    let burst: Vec<_> = (0..9)
        .map(|_| {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.trigger_now().await })
        })
        .collect();

    for task in burst {
        assert_eq!(task.await.unwrap(), TriggerResult::Dropped);
    }

    updater.release(1);
    first.await.unwrap();
    assert_eq!(updater.update_call_count(), 1);
}

#[tokio::test]
async fn manual_trigger_during_startup_attempt_is_dropped() {
    let (updater, log, scheduler) = gated_scheduler();

    let handle = scheduler.start(Duration::from_secs(3600));
    assert!(eventually(|| updater.update_call_count() == 1).await);

    assert_eq!(scheduler.trigger_now().await, TriggerResult::Dropped);

    updater.release(1);
    assert!(eventually(|| log.len() == 1).await);
    assert!(eventually(|| !scheduler.is_running()).await);

    // Slot is free again once the startup attempt finished
    updater.release(1);
    assert_eq!(
        scheduler.trigger_now().await,
        TriggerResult::Completed(UpdateOutcome::Success)
    );
    assert_eq!(updater.update_call_count(), 2);

    handle.stop();
}

#[tokio::test]
async fn cancelled_attempt_frees_slot() {
    let (updater, log, scheduler) = gated_scheduler();

    let attempt = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.trigger_now().await }
    });
    assert!(eventually(|| updater.update_call_count() == 1).await);

    attempt.abort();
    assert!(attempt.await.unwrap_err().is_cancelled());

    assert!(!scheduler.is_running());
    assert!(log.is_empty(), "Abandoned attempt records no outcome");
    assert!(scheduler.current_state().last_outcome.is_none());
}

#[tokio::test]
async fn stopping_scheduler_abandons_outstanding_request() {
    let (updater, log, scheduler) = gated_scheduler();

    let handle = scheduler.start(Duration::from_secs(3600));
    assert!(eventually(|| updater.update_call_count() == 1).await);

    handle.stop();
    assert!(eventually(|| !scheduler.is_running()).await);

    // Releasing the gate afterwards changes nothing
    updater.release(1);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(log.is_empty());
    assert!(scheduler.current_state().last_success_time.is_none());
}

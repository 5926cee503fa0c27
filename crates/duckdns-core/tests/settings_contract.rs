//! Contract Test: Settings
//!
//! Constraints verified:
//! - Entered credentials are trimmed before they are stored
//! - Empty fields are rejected without writing anything
//! - A saved edit is picked up by the next attempt
//!
//! If this test fails, stray whitespace or empty fields can end up in the
//! update URL.

mod common;

use common::*;
use duckdns_core::config::Credentials;
use duckdns_core::scheduler::UpdateScheduler;
use duckdns_core::status::StatusLog;
use duckdns_core::store::FileConfigStore;
use duckdns_core::traits::{ConfigStore, save_credentials};
use duckdns_core::Error;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn saved_credentials_are_trimmed() {
    let store = CountingStore::new(Credentials::default());
    let log = StatusLog::new(10);

    let saved = save_credentials(&store, &log, "  myhome \n", "\ttoken  ")
        .await
        .unwrap();

    assert_eq!(saved, Credentials::new("myhome", "token"));
    assert_eq!(store.load().await.unwrap().domain, "myhome");
    assert_eq!(store.load().await.unwrap().token, "token");

    let entry = log.last().unwrap();
    assert!(entry.success);
    assert_eq!(entry.message, "settings saved");
}

#[tokio::test]
async fn empty_fields_are_rejected_without_writing() {
    let store = CountingStore::new(valid_credentials());
    let log = StatusLog::new(10);

    for (domain, token) in [("", "token"), ("myhome", "   "), (" ", "\n")] {
        let result = save_credentials(&store, &log, domain, token).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    assert_eq!(store.save_call_count(), 0);
    assert!(log.is_empty());
    assert_eq!(store.load().await.unwrap(), valid_credentials());
}

#[tokio::test]
async fn file_settings_feed_next_attempt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let store = Arc::new(FileConfigStore::open(&path).await.unwrap());
    let log = Arc::new(StatusLog::new(10));
    let updater = Arc::new(MockUpdater::ok());
    let scheduler = UpdateScheduler::new(updater.clone(), store.clone(), log.clone());

    scheduler.trigger_now().await;
    assert_eq!(updater.update_call_count(), 0, "Fresh file has no credentials");

    save_credentials(store.as_ref(), log.as_ref(), "myhome", "token")
        .await
        .unwrap();
    scheduler.trigger_now().await;
    assert_eq!(updater.seen_domains(), vec!["myhome"]);

    let on_disk: Credentials =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, Credentials::new("myhome", "token"));
}

//! Contract Test: Single Instance
//!
//! Constraints verified:
//! - A second claim on a held key reports `AlreadyClaimed` within the timeout
//! - A stale socket left by a dead holder is replaced
//! - A channel that can be neither reached nor bound is a fatal error
//! - Releasing the lock lets a later claim succeed
//! - Simultaneous claims on one key yield exactly one holder and no errors
//!
//! If this test fails, two updaters can run side by side, or a crash can
//! lock the user out until reboot.

#![cfg(unix)]

use duckdns_core::Error;
use duckdns_core::instance::{InstanceClaim, SingleInstanceGuard};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

const KEY: &str = "DuckDNSUpdaterUniqueKey1234";

fn guard_in(dir: &std::path::Path) -> SingleInstanceGuard {
    SingleInstanceGuard::new()
        .with_runtime_dir(dir)
        .with_connect_timeout(Duration::from_millis(500))
}

#[tokio::test]
async fn first_claim_succeeds() {
    let dir = tempdir().unwrap();
    let guard = guard_in(dir.path());

    match guard.try_claim(KEY).await.unwrap() {
        InstanceClaim::Claimed(lock) => {
            assert!(lock.address().ends_with("DuckDNSUpdaterUniqueKey1234.sock"));
            assert!(dir.path().join(format!("{}.sock", KEY)).exists());
        }
        InstanceClaim::AlreadyClaimed => panic!("Nobody else holds the key"),
    }
}

#[tokio::test]
async fn second_claim_reports_already_claimed() {
    let dir = tempdir().unwrap();
    let guard = guard_in(dir.path());

    let first = guard.try_claim(KEY).await.unwrap();
    assert!(!first.is_already_claimed());

    let started = Instant::now();
    let second = guard.try_claim(KEY).await.unwrap();
    assert!(second.is_already_claimed());
    assert!(
        started.elapsed() < Duration::from_millis(500) + Duration::from_millis(250),
        "Claim must finish within the connect timeout"
    );

    // The first holder keeps answering
    assert!(guard.try_claim(KEY).await.unwrap().is_already_claimed());
    drop(first);
}

#[tokio::test]
async fn different_keys_do_not_conflict() {
    let dir = tempdir().unwrap();
    let guard = guard_in(dir.path());

    let _a = guard.try_claim("KeyA").await.unwrap();
    let b = guard.try_claim("KeyB").await.unwrap();
    assert!(!b.is_already_claimed());
}

#[tokio::test]
async fn stale_socket_is_replaced() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(format!("{}.sock", KEY));

    // A holder that died without cleaning up
    drop(std::os::unix::net::UnixListener::bind(&path).unwrap());
    assert!(path.exists());

    let guard = guard_in(dir.path());
    let claim = guard.try_claim(KEY).await.unwrap();
    assert!(!claim.is_already_claimed(), "Stale binding must be cleared");

    assert!(guard.try_claim(KEY).await.unwrap().is_already_claimed());
}

#[tokio::test]
async fn released_lock_can_be_reclaimed() {
    let dir = tempdir().unwrap();
    let guard = guard_in(dir.path());

    let lock = match guard.try_claim(KEY).await.unwrap() {
        InstanceClaim::Claimed(lock) => lock,
        InstanceClaim::AlreadyClaimed => panic!("Nobody else holds the key"),
    };
    lock.release().await;

    let again = guard.try_claim(KEY).await.unwrap();
    assert!(!again.is_already_claimed());
}

#[tokio::test]
async fn unusable_runtime_dir_is_fatal() {
    let dir = tempdir().unwrap();
    let guard = guard_in(&dir.path().join("does-not-exist"));

    let result = guard.try_claim(KEY).await;
    match result {
        Err(e) => {
            assert!(matches!(e, Error::Environment(_)));
            assert!(e.is_fatal());
        }
        Ok(_) => panic!("Binding in a missing directory must fail"),
    }
}

#[test]
fn concurrent_claims_yield_exactly_one_holder() {
    const CONTENDERS: usize = 6;
    const ROUNDS: usize = 50;

    for round in 0..ROUNDS {
        let dir = tempdir().unwrap();
        let start = Arc::new(Barrier::new(CONTENDERS));
        let done = Arc::new(Barrier::new(CONTENDERS));

        let contenders: Vec<_> = (0..CONTENDERS)
            .map(|_| {
                let dir = dir.path().to_path_buf();
                let start = Arc::clone(&start);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let rt = tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .unwrap();
                    let guard = guard_in(&dir);

                    start.wait();
                    let claim = rt.block_on(guard.try_claim(KEY));
                    let outcome = match &claim {
                        Ok(claim) => Ok(!claim.is_already_claimed()),
                        Err(e) => Err(e.to_string()),
                    };

                    // Hold every claim until all contenders have decided
                    done.wait();
                    drop(claim);
                    outcome
                })
            })
            .collect();

        let outcomes: Vec<_> = contenders
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let errors: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
        assert!(errors.is_empty(), "Round {}: claim failed: {:?}", round, errors);

        let holders = outcomes.iter().filter(|o| matches!(o, Ok(true))).count();
        assert_eq!(holders, 1, "Round {}: expected a single holder", round);
    }
}

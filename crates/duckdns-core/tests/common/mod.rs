//! Test doubles and common utilities for contract tests
//!
//! Minimal doubles that count calls so the tests can assert exactly which
//! side effects happened.

#![allow(dead_code)]

use duckdns_core::config::Credentials;
use duckdns_core::error::Result;
use duckdns_core::store::MemoryConfigStore;
use duckdns_core::traits::{ConfigStore, DnsUpdater, UpdateResponse};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

/// An updater returning a fixed response and counting calls
pub struct MockUpdater {
    response: UpdateResponse,
    update_call_count: Arc<AtomicUsize>,
    seen_domains: Arc<std::sync::Mutex<Vec<String>>>,
}

impl MockUpdater {
    pub fn new(response: UpdateResponse) -> Self {
        Self {
            response,
            update_call_count: Arc::new(AtomicUsize::new(0)),
            seen_domains: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn ok() -> Self {
        Self::new(UpdateResponse::Success("OK".to_string()))
    }

    pub fn ko() -> Self {
        Self::new(UpdateResponse::RemoteError("KO".to_string()))
    }

    pub fn unreachable() -> Self {
        Self::new(UpdateResponse::TransportError(
            "error sending request: connection refused".to_string(),
        ))
    }

    /// Get the number of times update() was called
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Domains passed to update(), in call order
    pub fn seen_domains(&self) -> Vec<String> {
        self.seen_domains.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsUpdater for MockUpdater {
    async fn update(&self, domain: &str, _token: &str) -> UpdateResponse {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.seen_domains.lock().unwrap().push(domain.to_string());
        self.response.clone()
    }

    fn updater_name(&self) -> &'static str {
        "mock"
    }
}

/// An updater that parks every call until the test releases it
pub struct GatedUpdater {
    gate: Arc<Semaphore>,
    update_call_count: Arc<AtomicUsize>,
}

impl GatedUpdater {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Let `n` parked calls complete
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Get the number of times update() was entered
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsUpdater for GatedUpdater {
    async fn update(&self, _domain: &str, _token: &str) -> UpdateResponse {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate never closes");
        permit.forget();
        UpdateResponse::Success("OK".to_string())
    }

    fn updater_name(&self) -> &'static str {
        "gated"
    }
}

/// A config store that counts reads and writes
pub struct CountingStore {
    inner: MemoryConfigStore,
    load_call_count: Arc<AtomicUsize>,
    save_call_count: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            inner: MemoryConfigStore::with_credentials(credentials),
            load_call_count: Arc::new(AtomicUsize::new(0)),
            save_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times load() was called
    pub fn load_call_count(&self) -> usize {
        self.load_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times save() was called
    pub fn save_call_count(&self) -> usize {
        self.save_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ConfigStore for CountingStore {
    async fn load(&self) -> Result<Credentials> {
        self.load_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.load().await
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        self.save_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.save(credentials).await
    }

    fn store_name(&self) -> &'static str {
        "counting"
    }
}

/// Valid credentials for tests
pub fn valid_credentials() -> Credentials {
    Credentials::new("myhome", "a7c4d0ad-114e-40ef-ba1d-d217904a50f2")
}

/// Poll `condition` until it holds or a second passes
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    condition()
}

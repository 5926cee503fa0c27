// # Memory Config Store
//
// In-memory implementation of ConfigStore. Nothing survives a restart.
// Useful for tests and for credentials supplied entirely through the
// environment.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::Credentials;
use crate::traits::config_store::ConfigStore;

/// In-memory config store
///
/// Clones share the same underlying record.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<RwLock<Credentials>>,
}

impl MemoryConfigStore {
    /// Create a store holding empty credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with credentials
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: Arc::new(RwLock::new(credentials)),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<Credentials, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), Error> {
        *self.inner.write().await = credentials.clone();
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

// # Config Store Trait
//
// Defines the get/set contract for the credentials record.
//
// ## Purpose
//
// The store is the single owner of the credentials. The scheduler holds a
// shared reference and asks for a fresh copy on every attempt, so an edit
// saved through the store takes effect on the next tick without a restart.
//
// ## Implementations
//
// - File-based: JSON file (`FileConfigStore`)
// - In-memory: `MemoryConfigStore`

use async_trait::async_trait;

use crate::config::Credentials;

/// Trait for credentials store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates (owned by `DnsUpdater`)
/// - ❌ Decide when to update (owned by `UpdateScheduler`)
/// - ❌ Log the token
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Get the current credentials
    ///
    /// A store with no record yet yields empty credentials.
    async fn load(&self) -> Result<Credentials, crate::Error>;

    /// Replace the stored credentials
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Successfully persisted
    /// - `Err(Error::ConfigStore)`: The write failed
    async fn save(&self, credentials: &Credentials) -> Result<(), crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// Validate and persist credentials entered by the user
///
/// Both fields are trimmed. Empty fields are rejected before anything is
/// written. A successful save is recorded to the status sink.
pub async fn save_credentials(
    store: &dyn ConfigStore,
    sink: &dyn crate::traits::StatusSink,
    domain: &str,
    token: &str,
) -> Result<Credentials, crate::Error> {
    let credentials = Credentials::new(domain, token);
    credentials.validate()?;

    store.save(&credentials).await?;
    sink.record("settings saved", true);

    tracing::info!(
        "Saved credentials for domain {} to {} store",
        credentials.domain,
        store.store_name()
    );
    Ok(credentials)
}

// # File Config Store
//
// File-based implementation of ConfigStore.
//
// ## Behaviour
//
// - Missing file: created with an empty record on open
// - Atomic writes: write-then-rename
// - Backup: the previous good file is kept as `.backup`
// - Corruption: falls back to the backup, then to an empty record
//
// ## File Format
//
// ```json
// {
//   "domain": "myhome",
//   "token": "a7c4d0ad-..."
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::Credentials;
use crate::traits::config_store::ConfigStore;

/// JSON-file config store
///
/// The record is cached in memory; `load` never touches the disk after
/// the store has been opened. Every `save` is written through immediately.
///
/// # Example
///
/// ```rust,no_run
/// use duckdns_core::config::Credentials;
/// use duckdns_core::store::FileConfigStore;
/// use duckdns_core::traits::ConfigStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileConfigStore::open("settings.json").await?;
///     store.save(&Credentials::new("myhome", "token")).await?;
///     assert_eq!(store.load().await?.domain, "myhome");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    cached: Arc<RwLock<Credentials>>,
}

impl FileConfigStore {
    /// Open (or create) the credentials file
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Load the existing file, recovering from the backup if corrupted
    /// 3. Write an empty record if no file exists yet
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config_store(format!(
                    "Failed to create settings directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let existed = path.exists();
        let credentials = Self::load_with_recovery(&path).await?;

        let store = Self {
            path,
            cached: Arc::new(RwLock::new(credentials)),
        };

        if !existed {
            tracing::info!("Creating empty settings file {}", store.path.display());
            store.write_file(&Credentials::default()).await?;
        }

        Ok(store)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file, replacing the cached record
    ///
    /// Picks up edits made to the file by hand while the process runs.
    pub async fn reload(&self) -> Result<Credentials, Error> {
        let credentials = Self::load_with_recovery(&self.path).await?;
        *self.cached.write().await = credentials.clone();
        Ok(credentials)
    }

    /// Load the file, falling back to the backup on a parse failure
    async fn load_with_recovery(path: &Path) -> Result<Credentials, Error> {
        match Self::load_file(path).await {
            Ok(credentials) => Ok(credentials),
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Settings file {} appears corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty settings.");
                    return Ok(Credentials::default());
                }

                match Self::load_file(&backup_path).await {
                    Ok(credentials) => {
                        tracing::info!("Recovered settings from backup");
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore settings file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(credentials)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unusable: {}. Starting with empty settings.",
                            backup_err
                        );
                        Ok(Credentials::default())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load_file(path: &Path) -> Result<Credentials, Error> {
        if !path.exists() {
            tracing::debug!("Settings file does not exist: {}", path.display());
            return Ok(Credentials::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::config_store(format!(
                "Failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;

        let credentials: Credentials = serde_json::from_str(&content)?;
        Ok(Credentials::new(credentials.domain, credentials.token))
    }

    /// Write the record atomically
    async fn write_file(&self, credentials: &Credentials) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(credentials)
            .map_err(|e| Error::config_store(format!("Failed to serialize settings: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::config_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::config_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::config_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create settings backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::config_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Settings written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> Result<Credentials, Error> {
        Ok(self.cached.read().await.clone())
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), Error> {
        // Disk first: a failed write must not leave the cache ahead of the file
        self.write_file(credentials).await?;
        *self.cached.write().await = credentials.clone();
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "file"
    }
}

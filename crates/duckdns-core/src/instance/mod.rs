// # Single-Instance Guard
//
// Decides once, at startup, whether another copy of the updater is already
// running on this machine.
//
// ## Protocol
//
// 1. Connect, as a client, to the rendezvous channel named by the key,
//    waiting at most `connect_timeout`
// 2. Connected → a live holder exists → `AlreadyClaimed`
// 3. Otherwise bind the channel ourselves, clearing a stale binding left by
//    a crashed holder first → `Claimed`. Concurrent claimers are arbitrated
//    by an exclusive lock; a loser reports `AlreadyClaimed`
// 4. Neither works → fatal `Error::Environment`
//
// No payload is exchanged: establishing the connection is the signal.
//
// ## Platform Primitive
//
// - Unix: domain socket at `<runtime_dir>/<key>.sock`. A socket file
//   outlives its process, so a refused connection means the file is stale
//   and may be replaced.
// - Windows: named pipe `\\.\pipe\<key>`. The pipe disappears with its
//   last handle, so there is never a stale binding.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Default bound on the connect attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Outcome of [`SingleInstanceGuard::try_claim`]
#[derive(Debug)]
pub enum InstanceClaim {
    /// This process now holds the channel; keep the lock alive
    Claimed(InstanceLock),
    /// Another live process holds the channel
    AlreadyClaimed,
}

impl InstanceClaim {
    /// Whether another instance is running
    pub fn is_already_claimed(&self) -> bool {
        matches!(self, Self::AlreadyClaimed)
    }
}

/// Ownership of the rendezvous channel
///
/// Holding this keeps the channel bound and answering callers. It is meant
/// to live for the whole process; there is no unclaim message.
#[derive(Debug)]
pub struct InstanceLock {
    /// Human-readable channel address (socket path or pipe name)
    address: String,

    /// Task accepting (and immediately closing) caller connections
    acceptor: Option<JoinHandle<()>>,

    /// Exclusive claim file (unix); closing it releases the claim
    claim_file: Option<File>,
}

impl InstanceLock {
    pub(crate) fn new(
        address: String,
        acceptor: JoinHandle<()>,
        claim_file: Option<File>,
    ) -> Self {
        Self {
            address,
            acceptor: Some(acceptor),
            claim_file,
        }
    }

    /// Address of the bound channel
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Stop answering callers and wait until the channel is closed
    pub async fn release(mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            acceptor.abort();
            let _ = acceptor.await;
        }
        // The socket is closed before the claim is given up
        drop(self.claim_file.take());
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Some(acceptor) = &self.acceptor {
            acceptor.abort();
        }
    }
}

/// Single-instance guard
///
/// # Example
///
/// ```rust,no_run
/// use duckdns_core::instance::{InstanceClaim, SingleInstanceGuard};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let guard = SingleInstanceGuard::new();
///     match guard.try_claim("MyAppUniqueKey").await? {
///         InstanceClaim::Claimed(_lock) => { /* run */ }
///         InstanceClaim::AlreadyClaimed => std::process::exit(0),
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SingleInstanceGuard {
    /// Directory holding rendezvous sockets (unused on Windows)
    runtime_dir: PathBuf,

    /// Upper bound on the connect attempt
    connect_timeout: Duration,
}

impl SingleInstanceGuard {
    /// Create a guard using the default runtime directory
    ///
    /// `$XDG_RUNTIME_DIR` when set, otherwise the system temp directory.
    pub fn new() -> Self {
        let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Self {
            runtime_dir,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Use a specific directory for rendezvous sockets
    pub fn with_runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = dir.into();
        self
    }

    /// Set the bound on the connect attempt
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Directory holding rendezvous sockets
    pub fn runtime_dir(&self) -> &std::path::Path {
        &self.runtime_dir
    }

    /// Look for a live holder of `key` and claim the channel if there is none
    ///
    /// # Returns
    ///
    /// - `Ok(InstanceClaim::Claimed(lock))`: this process is the holder
    /// - `Ok(InstanceClaim::AlreadyClaimed)`: another live process is; exit
    ///   without side effects
    /// - `Err(Error::Environment)`: the channel can be neither reached nor
    ///   bound (fatal, do not retry)
    pub async fn try_claim(&self, key: &str) -> Result<InstanceClaim> {
        #[cfg(unix)]
        {
            unix::try_claim(&self.runtime_dir, key, self.connect_timeout).await
        }

        #[cfg(windows)]
        {
            windows::try_claim(key, self.connect_timeout).await
        }
    }
}

impl Default for SingleInstanceGuard {
    fn default() -> Self {
        Self::new()
    }
}

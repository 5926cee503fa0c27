//! Unix domain socket rendezvous
//!
//! Claiming is arbitrated by an exclusive `flock` on `<key>.lock`, held for
//! as long as the [`InstanceLock`] lives. The kernel drops it when the
//! holder dies, so only the process owning the lock may clear and rebind
//! the socket file.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use super::{InstanceClaim, InstanceLock};
use crate::error::{Error, Result};

pub(super) async fn try_claim(
    runtime_dir: &Path,
    key: &str,
    connect_timeout: Duration,
) -> Result<InstanceClaim> {
    let path = runtime_dir.join(format!("{}.sock", key));

    if holder_answers(&path, connect_timeout).await {
        info!("Another instance holds {}", path.display());
        return Ok(InstanceClaim::AlreadyClaimed);
    }

    let lock_path = runtime_dir.join(format!("{}.lock", key));
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| {
            Error::environment(format!(
                "Cannot open instance lock {}: {}",
                lock_path.display(),
                e
            ))
        })?;

    let locked = try_lock_exclusive(&lock_file).map_err(|e| {
        Error::environment(format!(
            "Cannot lock instance lock {}: {}",
            lock_path.display(),
            e
        ))
    })?;
    if !locked {
        // A live process is holding, or finishing its claim
        info!("Another instance holds {}", lock_path.display());
        return Ok(InstanceClaim::AlreadyClaimed);
    }

    // Holding the lock: whatever sits at the path belongs to a dead process
    match std::fs::remove_file(&path) {
        Ok(()) => info!("Removed stale rendezvous socket {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(Error::environment(format!(
                "Cannot clear stale rendezvous socket {}: {}",
                path.display(),
                e
            )));
        }
    }

    let listener = match UnixListener::bind(&path) {
        Ok(listener) => listener,
        Err(e)
            if e.kind() == ErrorKind::AddrInUse
                && holder_answers(&path, connect_timeout).await =>
        {
            info!("Another instance bound {} first", path.display());
            return Ok(InstanceClaim::AlreadyClaimed);
        }
        Err(e) => {
            return Err(Error::environment(format!(
                "Cannot bind rendezvous socket {}: {}",
                path.display(),
                e
            )));
        }
    };

    info!("Claimed rendezvous socket {}", path.display());
    let acceptor = tokio::spawn(accept_callers(listener));

    Ok(InstanceClaim::Claimed(InstanceLock::new(
        path.display().to_string(),
        acceptor,
        Some(lock_file),
    )))
}

/// Whether a live holder answers at `path` within `connect_timeout`
async fn holder_answers(path: &Path, connect_timeout: Duration) -> bool {
    match tokio::time::timeout(connect_timeout, UnixStream::connect(path)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            debug!("No live holder at {}: {}", path.display(), e);
            false
        }
        Err(_) => {
            debug!(
                "Connecting to {} timed out after {:?}",
                path.display(),
                connect_timeout
            );
            false
        }
    }
}

/// Take an exclusive, non-blocking `flock`
///
/// Returns `Ok(false)` when another open description holds it.
fn try_lock_exclusive(file: &File) -> std::io::Result<bool> {
    // SAFETY: the descriptor is owned by `file` and stays open for the call
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }

    let err = std::io::Error::last_os_error();
    if err.kind() == ErrorKind::WouldBlock {
        Ok(false)
    } else {
        Err(err)
    }
}

/// Accept and immediately close caller connections
async fn accept_callers(listener: UnixListener) {
    loop {
        match listener.accept().await {
            Ok((_caller, _)) => info!("Another instance tried to start; it will exit"),
            Err(e) => {
                warn!("Rendezvous accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

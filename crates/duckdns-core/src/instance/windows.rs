//! Named pipe rendezvous

use std::time::Duration;
use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeServer, ServerOptions};
use tracing::{debug, info, warn};

use super::{InstanceClaim, InstanceLock};
use crate::error::{Error, Result};

/// All server instances of the pipe are busy: the holder is alive
const ERROR_PIPE_BUSY: i32 = 231;

/// Returned by an exclusive first-instance create when the pipe exists
const ERROR_ACCESS_DENIED: i32 = 5;

pub(super) async fn try_claim(key: &str, connect_timeout: Duration) -> Result<InstanceClaim> {
    let name = format!(r"\\.\pipe\{}", key);

    let reached = tokio::time::timeout(connect_timeout, async {
        loop {
            match ClientOptions::new().open(&name) {
                Ok(_client) => return Ok(()),
                Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY) => {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                Err(e) => return Err(e),
            }
        }
    })
    .await;

    match reached {
        Ok(Ok(())) => {
            info!("Another instance holds {}", name);
            return Ok(InstanceClaim::AlreadyClaimed);
        }
        Ok(Err(e)) => debug!("No live holder at {}: {}", name, e),
        Err(_) => {
            // Busy for the whole wait still means somebody owns the pipe
            info!("Pipe {} stayed busy for {:?}; treating as held", name, connect_timeout);
            return Ok(InstanceClaim::AlreadyClaimed);
        }
    }

    let server = match ServerOptions::new().first_pipe_instance(true).create(&name) {
        Ok(server) => server,
        Err(e) if e.raw_os_error() == Some(ERROR_ACCESS_DENIED) => {
            info!("Another instance created {} first", name);
            return Ok(InstanceClaim::AlreadyClaimed);
        }
        Err(e) => {
            return Err(Error::environment(format!(
                "Cannot create pipe {}: {}",
                name, e
            )));
        }
    };

    info!("Claimed rendezvous pipe {}", name);
    let acceptor = tokio::spawn(accept_callers(server, name.clone()));

    // `first_pipe_instance` already makes creation exclusive
    Ok(InstanceClaim::Claimed(InstanceLock::new(name, acceptor, None)))
}

/// Accept caller connections, keeping one listening instance available
async fn accept_callers(mut server: NamedPipeServer, name: String) {
    loop {
        if let Err(e) = server.connect().await {
            warn!("Rendezvous accept failed: {}", e);
            tokio::time::sleep(Duration::from_millis(100)).await;
            continue;
        }

        info!("Another instance tried to start; it will exit");

        match ServerOptions::new().create(&name) {
            Ok(next) => server = next,
            Err(e) => {
                warn!("Cannot create next pipe instance {}: {}", name, e);
                let _ = server.disconnect();
            }
        }
    }
}

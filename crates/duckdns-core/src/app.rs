//! Startup ordering
//!
//! [`launch`] claims the single-instance channel before anything else. A
//! second instance returns [`Launch::AlreadyRunning`] having opened no
//! config and issued no request.

use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::controller::Controller;
use crate::error::Result;
use crate::instance::{InstanceClaim, InstanceLock, SingleInstanceGuard};
use crate::scheduler::{SchedulerHandle, UpdateScheduler};
use crate::signal::{VisibilityTrigger, visibility_signal};
use crate::traits::{ConfigStore, DnsUpdater, StatusSink};

/// Result of [`launch`]
pub enum Launch {
    /// Another instance holds the channel; exit without side effects
    AlreadyRunning,
    /// This process is the instance
    Started(Box<Running>),
}

/// Everything a started instance keeps alive
pub struct Running {
    /// Claim on the rendezvous channel (hold for the process lifetime)
    pub lock: InstanceLock,
    /// Shared scheduler
    pub scheduler: Arc<UpdateScheduler>,
    /// Periodic task; dropping it stops the cadence
    pub handle: SchedulerHandle,
    /// Control loop
    pub controller: Controller,
    /// Producer side of the visibility mailbox
    pub trigger: VisibilityTrigger,
    /// Credentials store
    pub store: Arc<dyn ConfigStore>,
}

/// Claim the instance, then build and start the update engine
///
/// # Parameters
///
/// - `guard`: Single-instance guard
/// - `config`: Validated before anything else happens
/// - `open_store`: Opens the credentials store; only called once the
///   channel is claimed
/// - `updater`: DNS updater used by the scheduler
/// - `sink`: Status sink shared by scheduler and controller
///
/// # Returns
///
/// - `Ok(Launch::AlreadyRunning)`: another instance is live
/// - `Ok(Launch::Started(_))`: the first attempt has been scheduled
/// - `Err(Error::Environment)`: the channel could not be claimed (fatal)
pub async fn launch<F, Fut>(
    guard: &SingleInstanceGuard,
    config: &AppConfig,
    open_store: F,
    updater: Arc<dyn DnsUpdater>,
    sink: Arc<dyn StatusSink>,
) -> Result<Launch>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Arc<dyn ConfigStore>>>,
{
    config.validate()?;

    let lock = match guard.try_claim(&config.instance_key).await? {
        InstanceClaim::Claimed(lock) => lock,
        InstanceClaim::AlreadyClaimed => {
            warn!("Already running: another instance holds '{}'", config.instance_key);
            return Ok(Launch::AlreadyRunning);
        }
    };

    let store = open_store().await?;
    info!("Using {} config store", store.store_name());

    let scheduler = Arc::new(UpdateScheduler::new(
        updater,
        Arc::clone(&store),
        Arc::clone(&sink),
    ));
    let handle = scheduler.start(config.scheduler.interval());

    let (trigger, mailbox) = visibility_signal();
    let controller = Controller::new(Arc::clone(&scheduler), sink, mailbox);

    Ok(Launch::Started(Box::new(Running {
        lock,
        scheduler,
        handle,
        controller,
        trigger,
        store,
    })))
}

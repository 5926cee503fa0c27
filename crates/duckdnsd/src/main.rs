// # duckdnsd - DuckDNS Updater Daemon
//
// Thin integration layer: all update logic lives in duckdns-core.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Claiming the single instance (a second copy exits with code 0)
// 4. Seeding credentials, starting the scheduler and the control loop
// 5. Mapping OS signals onto visibility toggles, manual updates and shutdown
//
// ## Configuration
//
// - `DUCKDNS_SETTINGS_PATH`: Credentials file (default `settings.json`)
// - `DUCKDNS_DOMAIN` / `DUCKDNS_TOKEN`: Saved to the credentials file at startup
// - `DUCKDNS_INSTANCE_KEY`: Single-instance key (default `DuckDNSUpdaterUniqueKey1234`)
// - `DUCKDNS_RUNTIME_DIR`: Directory for the rendezvous socket (unix)
// - `DUCKDNS_INTERVAL_SECS`: Seconds between updates (default 3600)
// - `DUCKDNS_TIMEOUT_SECS`: Per-request timeout (default 10)
// - `DUCKDNS_ENDPOINT`: Update endpoint (default `https://www.duckdns.org/update`)
// - `DUCKDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Signals (unix)
//
// - `SIGUSR1`: Toggle visibility
// - `SIGUSR2`: Update now (dropped if an attempt is running)
// - `SIGINT` / `SIGTERM`: Exit immediately
//
// ## Example
//
// ```bash
// export DUCKDNS_DOMAIN=myhome
// export DUCKDNS_TOKEN=a7c4d0ad-114e-40ef-ba1d-d217904a50f2
// duckdnsd
// ```

use anyhow::{Context, Result};
use duckdns_client::DuckDnsClient;
use duckdns_core::traits::save_credentials;
use duckdns_core::{
    AppConfig, ConfigStore, FileConfigStore, Launch, Running, SingleInstanceGuard, StatusLog,
    launch,
};
use std::env;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use duckdns_core::{TriggerResult, UpdateScheduler, VisibilityTrigger};
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown, or another instance is already running
/// - 1: Configuration error or unusable environment
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DuckDnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DuckDnsExitCode> for ExitCode {
    fn from(code: DuckDnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration
struct Config {
    settings_path: Option<PathBuf>,
    instance_key: Option<String>,
    runtime_dir: Option<PathBuf>,
    interval_secs: Option<u64>,
    timeout_secs: Option<u64>,
    endpoint: Option<String>,
    domain: Option<String>,
    token: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Self {
            settings_path: var("DUCKDNS_SETTINGS_PATH").map(PathBuf::from),
            instance_key: var("DUCKDNS_INSTANCE_KEY"),
            runtime_dir: var("DUCKDNS_RUNTIME_DIR").map(PathBuf::from),
            interval_secs: parse_var("DUCKDNS_INTERVAL_SECS", var("DUCKDNS_INTERVAL_SECS"))?,
            timeout_secs: parse_var("DUCKDNS_TIMEOUT_SECS", var("DUCKDNS_TIMEOUT_SECS"))?,
            endpoint: var("DUCKDNS_ENDPOINT"),
            domain: var("DUCKDNS_DOMAIN"),
            token: var("DUCKDNS_TOKEN"),
            log_level: var("DUCKDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Overlay the environment onto the default application config
    fn app_config(&self) -> AppConfig {
        let mut config = AppConfig::new();

        if let Some(path) = &self.settings_path {
            config.settings_path = path.clone();
        }
        if let Some(key) = &self.instance_key {
            config.instance_key = key.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(interval) = self.interval_secs {
            config.scheduler.interval_secs = interval;
        }
        if let Some(timeout) = self.timeout_secs {
            config.scheduler.request_timeout_secs = timeout;
        }
        config.runtime_dir = self.runtime_dir.clone();

        config
    }

    /// Credentials to save before the first attempt, if both are given
    fn seed_credentials(&self) -> Option<(String, String)> {
        match (&self.domain, &self.token) {
            (Some(domain), Some(token)) => Some((domain.clone(), token.clone())),
            _ => None,
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.app_config().validate()?;

        if self.domain.is_some() != self.token.is_some() {
            anyhow::bail!(
                "DUCKDNS_DOMAIN and DUCKDNS_TOKEN must be set together. \
                Set both, or neither to keep the saved settings."
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DUCKDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn parse_var<T>(name: &str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("{} must be a number. Got: {}", name, raw))
        })
        .transpose()
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DuckDnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DuckDnsExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DuckDnsExitCode::ConfigError.into();
    }

    info!("Starting duckdnsd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DuckDnsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => DuckDnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                exit_code_for(&e)
            }
        }
    });

    // Outstanding requests are abandoned, not awaited
    rt.shutdown_background();

    code.into()
}

/// Environment and config failures are startup errors; the rest are runtime errors
fn exit_code_for(error: &anyhow::Error) -> DuckDnsExitCode {
    match error.downcast_ref::<duckdns_core::Error>() {
        Some(duckdns_core::Error::Config(_)) => DuckDnsExitCode::ConfigError,
        Some(e) if e.is_fatal() => DuckDnsExitCode::ConfigError,
        _ => DuckDnsExitCode::RuntimeError,
    }
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: Config) -> Result<()> {
    let app_config = config.app_config();

    let mut guard =
        SingleInstanceGuard::new().with_connect_timeout(app_config.scheduler.guard_timeout());
    if let Some(dir) = &app_config.runtime_dir {
        guard = guard.with_runtime_dir(dir);
    }

    let sink = Arc::new(StatusLog::new(app_config.status_log_capacity));
    let updater = Arc::new(DuckDnsClient::from_config(&app_config)?);

    // Only runs once the instance is claimed
    let open_store = {
        let settings_path = app_config.settings_path.clone();
        let seed = config.seed_credentials();
        let sink = Arc::clone(&sink);
        move || async move {
            let store = FileConfigStore::open(&settings_path).await?;
            info!("Using settings file {}", store.path().display());

            if let Some((domain, token)) = seed {
                save_credentials(&store, sink.as_ref(), &domain, &token).await?;
            }
            Ok::<_, duckdns_core::Error>(Arc::new(store) as Arc<dyn ConfigStore>)
        }
    };

    let running = match launch(&guard, &app_config, open_store, updater, sink.clone()).await? {
        Launch::AlreadyRunning => {
            eprintln!("DuckDNS updater is already running");
            return Ok(());
        }
        Launch::Started(running) => running,
    };

    let Running {
        lock,
        scheduler,
        handle,
        mut controller,
        trigger,
        ..
    } = *running;

    info!("Holding instance channel {}", lock.address());

    #[cfg(unix)]
    let control = spawn_control_signals(trigger, scheduler)?;
    #[cfg(not(unix))]
    drop((trigger, scheduler));

    let shutdown = shutdown_signal()?;
    controller
        .run(async move {
            let signal = shutdown.await;
            info!("Received shutdown signal: {}", signal);
        })
        .await;

    info!(
        "Shutting down (last successful update: {})",
        controller.view().last_success_display()
    );

    #[cfg(unix)]
    control.abort();
    handle.stop();
    lock.release().await;

    Ok(())
}

/// Map SIGUSR1 onto a visibility toggle and SIGUSR2 onto a manual update
#[cfg(unix)]
fn spawn_control_signals(
    trigger: VisibilityTrigger,
    scheduler: Arc<UpdateScheduler>,
) -> Result<tokio::task::JoinHandle<()>> {
    let mut sigusr1 = signal(SignalKind::user_defined1())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGUSR1 handler: {}", e))?;
    let mut sigusr2 = signal(SignalKind::user_defined2())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGUSR2 handler: {}", e))?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = sigusr1.recv() => trigger.signal_toggle(),
                Some(()) = sigusr2.recv() => {
                    // Off the signal loop so a slow request never delays a toggle
                    let scheduler = Arc::clone(&scheduler);
                    tokio::spawn(async move {
                        if scheduler.trigger_now().await == TriggerResult::Dropped {
                            info!("Manual update ignored: an update is already running");
                        }
                    });
                }
                else => break,
            }
        }
    }))
}

/// Resolve on SIGTERM or SIGINT
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Resolve on CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "CTRL-C"
    })
}

// # ddnsd - dy.fi DDNS Daemon
//
// This is a thin integration layer; all scheduling and update logic lives in
// ddns-core. The daemon is responsible for:
// 1. Reading paths and log level from environment variables
// 2. Loading (or creating) the settings file
// 3. Initializing logging (console, plus a log file when enabled)
// 4. Wiring the HTTP transport, IP source, provider and state store
// 5. Running the engine until SIGTERM/SIGINT
//
// ## Environment
//
// - `DDNS_CONFIG_PATH`: settings file (default `settings.json`)
// - `DDNS_STATE_PATH`: last update file (default `lastupdate.txt`)
// - `DDNS_LOG_DIR`: directory for `ddns.log` (default `.`)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)
//
// ## Example
//
// ```bash
// export DDNS_CONFIG_PATH=/etc/ddns/settings.json
// export DDNS_STATE_PATH=/var/lib/ddns/lastupdate.txt
// export DDNS_LOG_DIR=/var/log/ddns
//
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::{DdnsConfig, DdnsEngine, EngineEvent, FileStateStore, HttpTransport};
use ddns_ip_http::{HttpIpSource, ReqwestTransport};
use ddns_provider_dyfi::DyfiProvider;
use std::env;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Name of the log file inside `DDNS_LOG_DIR`
const LOG_FILE_NAME: &str = "ddns.log";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon settings read from the environment
#[derive(Debug)]
struct DaemonEnv {
    config_path: PathBuf,
    state_path: PathBuf,
    log_dir: PathBuf,
    log_level: LevelFilter,
}

impl DaemonEnv {
    /// Load settings from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = |key: &str, default: &str| {
            PathBuf::from(
                lookup(key)
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| default.to_string()),
            )
        };

        Ok(Self {
            config_path: path("DDNS_CONFIG_PATH", "settings.json"),
            state_path: path("DDNS_STATE_PATH", "lastupdate.txt"),
            log_dir: path("DDNS_LOG_DIR", "."),
            log_level: parse_log_level(&lookup("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()))?,
        })
    }
}

fn parse_log_level(level: &str) -> Result<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" => Ok(LevelFilter::WARN),
        "error" => Ok(LevelFilter::ERROR),
        _ => anyhow::bail!(
            "DDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Install the console layer and, if enabled, the log file layer
///
/// The returned guard flushes the file writer on drop and must live until
/// the daemon exits.
fn init_logging(daemon_env: &DaemonEnv, use_log_file: bool) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = if use_log_file {
        let appender = tracing_appender::rolling::never(&daemon_env.log_dir, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(daemon_env.log_level)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(guard)
}

fn main() -> ExitCode {
    let daemon_env = match DaemonEnv::from_env() {
        Ok(daemon_env) => daemon_env,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let (config, config_created) = match DdnsConfig::load_or_create(&daemon_env.config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let _log_guard = match init_logging(&daemon_env, config.use_log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    info!("Starting ddnsd daemon");
    if config_created {
        info!(
            "Created default configuration at {}",
            daemon_env.config_path.display()
        );
    }
    info!(
        "Settings: username: {}, hostnames: {:?}, update interval: {} days, update now: {}",
        config.username, config.hostnames, config.update_interval_days, config.update_now
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(daemon_env, config).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::ConfigError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Wire the components and run the engine until a shutdown signal
async fn run_daemon(daemon_env: DaemonEnv, config: DdnsConfig) -> Result<()> {
    let transport: Arc<dyn HttpTransport> = Arc::new(
        ReqwestTransport::new(config.engine.http_timeout()).context("Failed to create HTTP transport")?,
    );

    let ip_source = HttpIpSource::new(
        config.ip_lookup_endpoints.clone(),
        config.ip_version,
        Arc::clone(&transport),
    );
    let provider = DyfiProvider::new(config.update_url.clone(), Arc::clone(&transport));

    let state_store = FileStateStore::new(&daemon_env.state_path)
        .await
        .with_context(|| format!("Failed to open state file {}", daemon_env.state_path.display()))?;

    info!("IP lookup endpoints: {:?}", config.ip_lookup_endpoints);
    info!("State file: {}", daemon_env.state_path.display());

    let (engine, events) = DdnsEngine::new(
        Box::new(ip_source),
        Box::new(provider),
        Box::new(state_store),
        config,
    )?;
    let mut engine = engine.with_transport(transport);

    tokio::spawn(log_events(events));

    let shutdown = shutdown_signal()?;

    info!("Starting DDNS engine");
    engine.run_until(shutdown).await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Drain engine events into the debug log
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Engine event: {:?}", event);
    }
}

/// Future completing on the first SIGTERM or SIGINT
///
/// Handlers are installed before returning so a setup failure is reported
/// at startup rather than ignored.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", name);
    })
}

/// Future completing on Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: SIGINT"),
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    })
}

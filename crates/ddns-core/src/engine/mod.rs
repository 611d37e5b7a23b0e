//! Core DDNS engine
//!
//! The DdnsEngine is the update scheduler. It is responsible for:
//! - Seeding the schedule from the StateStore at startup
//! - Resolving the public IP via IpSource on every cycle
//! - Deciding whether the cycle must update the provider
//! - Updating every configured host via DnsProvider
//! - Persisting the update time after a successful update
//! - Containing errors: a failed cycle leads to a backoff, never to an exit
//!
//! ## State Machine
//!
//! ```text
//!                 ┌──────────── sleep(check_interval) ────────────┐
//!                 ▼                                               │
//!            ┌─────────┐  trigger   ┌──────────┐  ≥1 host ok       │
//! startup ──▶│ Waiting │──────────▶│ Updating │──────────────────┤
//!            └─────────┘            └──────────┘                  │
//!                 │ resolve error        │ every host failed       │
//!                 ▼                      ▼                         │
//!            ┌──────────────────────────────┐                      │
//!            │ ErrorBackoff                 │── sleep(backoff) ────┘
//!            │ (rebuild transport)          │
//!            └──────────────────────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Resolve the current IP
//! 2. Trigger if `update_now`, the IP changed, or the schedule elapsed
//! 3. If triggered, update every host in sequence; one host failing never
//!    prevents the others
//! 4. If at least one host succeeded: clear `update_now`, remember the IP,
//!    schedule `now + interval` and persist `now`
//! 5. Sleep and repeat

pub mod schedule;

pub use schedule::{TriggerReason, decide_trigger, format_remaining, next_scheduled_update};

use crate::clock::{Clock, SystemClock};
use crate::config::{Credentials, DdnsConfig, EngineConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, HttpTransport, IpSource, StateStore, UpdateOutcome};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Logical scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Between checks, or resolving the IP
    Waiting,
    /// Pushing the address to the provider
    Updating,
    /// A cycle failed; sleeping before the next one
    ErrorBackoff,
}

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        hostnames: usize,
    },

    /// Public IP resolved
    IpResolved {
        ip: IpAddr,
    },

    /// The trigger condition held for this cycle
    UpdateTriggered {
        reason: TriggerReason,
    },

    /// The provider answered for a host
    HostUpdated {
        hostname: String,
        success: bool,
        response: String,
    },

    /// The update request for a host failed
    HostFailed {
        hostname: String,
        error: String,
    },

    /// No update needed this cycle
    UpdateSkipped {
        next_update: DateTime<Utc>,
    },

    /// A cycle failed and the engine is backing off
    BackoffEntered {
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Per-host result of an update round
#[derive(Debug)]
pub struct HostReport {
    /// Host name as configured
    pub hostname: String,
    /// Provider answer or request error
    pub result: Result<UpdateOutcome>,
}

impl HostReport {
    /// Whether the provider accepted the update
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(outcome) if outcome.success)
    }
}

/// Results of updating every configured host once
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub hosts: Vec<HostReport>,
}

impl UpdateReport {
    pub fn any_succeeded(&self) -> bool {
        self.hosts.iter().any(HostReport::succeeded)
    }

    pub fn all_succeeded(&self) -> bool {
        !self.hosts.is_empty() && self.hosts.iter().all(HostReport::succeeded)
    }

    /// Hosts whose update was rejected or failed
    pub fn failed_hosts(&self) -> Vec<&str> {
        self.hosts
            .iter()
            .filter(|h| !h.succeeded())
            .map(|h| h.hostname.as_str())
            .collect()
    }

    /// One line per failed host, for error messages
    pub fn failure_summary(&self) -> String {
        self.hosts
            .iter()
            .filter(|h| !h.succeeded())
            .map(|h| match &h.result {
                Ok(outcome) => format!("{}: {}", h.hostname, outcome.raw_response),
                Err(e) => format!("{}: {}", h.hostname, e),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// What a single cycle did
#[derive(Debug)]
pub enum CycleOutcome {
    /// Trigger condition did not hold
    Skipped {
        ip: IpAddr,
        next_update: DateTime<Utc>,
    },
    /// Hosts were updated (at least one successfully)
    Updated {
        ip: IpAddr,
        reason: TriggerReason,
        report: UpdateReport,
    },
    /// The cycle failed; the loop backs off
    Failed(Error),
}

impl CycleOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CycleOutcome::Failed(_))
    }
}

/// Core DDNS engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Start with [`DdnsEngine::run()`] (or [`DdnsEngine::run_until()`])
/// 3. [`DdnsEngine::startup()`] runs once; its failure is fatal
/// 4. Cycles repeat until the shutdown future completes
///
/// ## Threading
///
/// The engine runs on a single task. Network calls and sleeps are the only
/// suspension points; nothing runs concurrently.
pub struct DdnsEngine {
    /// IP source for resolving the public address
    ip_source: Box<dyn IpSource>,

    /// DNS provider for updating hosts
    provider: Box<dyn DnsProvider>,

    /// Persisted last update time
    state_store: Box<dyn StateStore>,

    /// Shared HTTP transport, rebuilt after a failed cycle
    transport: Option<Arc<dyn HttpTransport>>,

    /// Wall clock for the schedule
    clock: Arc<dyn Clock>,

    /// Hosts to update, as configured
    hostnames: Vec<String>,

    credentials: Credentials,

    /// Time between forced updates
    update_interval: chrono::Duration,

    settings: EngineConfig,

    /// Cleared after the first successful update
    update_now: bool,

    last_known_ip: Option<IpAddr>,

    /// Set by `startup()`
    next_update: Option<DateTime<Utc>>,

    state: SchedulerState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Parameters
    ///
    /// - `ip_source`: IP source implementation
    /// - `provider`: DNS provider implementation
    /// - `state_store`: State store implementation
    /// - `config`: DDNS configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        state_store: Box<dyn StateStore>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            ip_source,
            provider,
            state_store,
            transport: None,
            clock: Arc::new(SystemClock),
            credentials: config.credentials(),
            update_interval: config.update_interval(),
            hostnames: config.hostnames,
            settings: config.engine,
            update_now: config.update_now,
            last_known_ip: None,
            next_update: None,
            state: SchedulerState::Waiting,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Attach the HTTP transport to rebuild after failed cycles
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn update_now(&self) -> bool {
        self.update_now
    }

    pub fn last_known_ip(&self) -> Option<IpAddr> {
        self.last_known_ip
    }

    pub fn next_update(&self) -> Option<DateTime<Utc>> {
        self.next_update
    }

    /// Run the engine until SIGINT (Ctrl-C)
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal startup error
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run the engine until `shutdown` completes
    ///
    /// Startup runs first and its errors are returned. After that no error
    /// ends the loop; the shutdown future is observed while sleeping between
    /// cycles.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.emit_event(EngineEvent::Started {
            hostnames: self.hostnames.len(),
        });

        self.startup().await?;

        tokio::pin!(shutdown);

        loop {
            let (pause, backoff) = match self.run_cycle().await {
                CycleOutcome::Failed(e) => {
                    error!("{}", e);
                    warn!("Restarting loop in {:?}", self.settings.error_backoff());
                    self.emit_event(EngineEvent::BackoffEntered {
                        error: e.to_string(),
                    });
                    (self.settings.error_backoff(), true)
                }
                _ => (self.settings.check_interval(), false),
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }

            if backoff {
                self.rebuild_transport();
                self.state = SchedulerState::Waiting;
            }
        }

        // Flush state before exiting
        self.state_store.flush().await?;
        info!("State flushed, engine stopped");

        Ok(())
    }

    /// Test-only helper to run the engine with a controlled shutdown signal
    ///
    /// Production code should use `run()` or `run_until()` with an OS signal
    /// future. A dropped sender also stops the engine.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        match shutdown_rx {
            Some(rx) => {
                self.run_until(async move {
                    let _ = rx.await;
                })
                .await
            }
            None => self.run().await,
        }
    }

    /// One-time startup sequence
    ///
    /// Loads (or initializes) the persisted update time, computes the first
    /// scheduled update and seeds the last known IP with a bounded retry.
    /// A missing state file is a bootstrap: the current time is written and
    /// no update is forced (unless `update_now` is set).
    pub async fn startup(&mut self) -> Result<()> {
        let now = self.clock.now();

        let last_update = match self.state_store.last_update().await? {
            Some(last) => {
                info!("Last update time: {}", last);
                last
            }
            None => {
                info!("No previous update recorded, starting schedule at {}", now);
                self.state_store.record_update(now).await?;
                now
            }
        };

        let next = next_scheduled_update(last_update, self.update_interval);
        self.next_update = Some(next);
        info!("Next update time: {}", next);

        let ip = self.resolve_with_retry().await?;
        info!("Current IP address: {}", ip);
        self.last_known_ip = Some(ip);
        self.emit_event(EngineEvent::IpResolved { ip });

        Ok(())
    }

    /// Resolve the IP with a bounded number of attempts
    ///
    /// Each attempt is preceded by `startup_retry_delay` since the network
    /// may not be up yet when the agent starts at boot.
    async fn resolve_with_retry(&self) -> Result<IpAddr> {
        let attempts = self.settings.startup_resolve_attempts;
        let delay = self.settings.startup_retry_delay();
        let mut last_error = None;

        for attempt in 1..=attempts {
            tokio::time::sleep(delay).await;

            match self.ip_source.resolve().await {
                Ok(ip) => return Ok(ip),
                Err(e) => {
                    warn!(
                        "{} Trying again... ({} tries left)",
                        e,
                        attempts - attempt
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(Error::StartupResolutionExhausted {
            attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }

    /// Run a single check
    ///
    /// Never panics or returns early with `?`: every failure is reported as
    /// [`CycleOutcome::Failed`] and leaves the engine in
    /// [`SchedulerState::ErrorBackoff`].
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.state = SchedulerState::Waiting;

        let ip = match self.ip_source.resolve().await {
            Ok(ip) => ip,
            Err(e) => return self.fail(e),
        };
        debug!("Resolved IP {} via {}", ip, self.ip_source.source_name());
        self.emit_event(EngineEvent::IpResolved { ip });

        let now = self.clock.now();
        let next_update = self.next_update.unwrap_or(now);

        let Some(reason) =
            decide_trigger(self.update_now, now, next_update, self.last_known_ip, ip)
        else {
            info!("Next update in: {}...", format_remaining(now, next_update));
            self.emit_event(EngineEvent::UpdateSkipped { next_update });
            return CycleOutcome::Skipped { ip, next_update };
        };

        info!("Update triggered: {}", reason);
        self.emit_event(EngineEvent::UpdateTriggered {
            reason: reason.clone(),
        });

        self.state = SchedulerState::Updating;
        let report = self.dispatch_all(ip).await;

        if !report.any_succeeded() {
            return self.fail(Error::UpdateFailed(report.failure_summary()));
        }
        if !report.all_succeeded() {
            warn!("Some hosts were not updated: {}", report.failure_summary());
        }

        self.update_now = false;
        self.last_known_ip = Some(ip);
        let next = next_scheduled_update(now, self.update_interval);
        self.next_update = Some(next);
        info!("Next update time: {}", next);
        info!("Next update in: {}...", format_remaining(now, next));

        if let Err(e) = self.state_store.record_update(now).await {
            return self.fail(e);
        }

        self.state = SchedulerState::Waiting;
        CycleOutcome::Updated { ip, reason, report }
    }

    /// Update every configured host once, in order
    ///
    /// Each host is attempted regardless of what happened to the previous
    /// ones.
    pub async fn dispatch_all(&self, ip: IpAddr) -> UpdateReport {
        let mut report = UpdateReport {
            hosts: Vec::with_capacity(self.hostnames.len()),
        };

        for hostname in &self.hostnames {
            info!("Updating host {} -> {}", hostname, ip);

            let result = self
                .provider
                .update_host(hostname, ip, &self.credentials)
                .await;

            match &result {
                Ok(outcome) => {
                    if outcome.success {
                        info!("{}: {}", outcome.hostname, outcome.raw_response);
                    } else {
                        error!(
                            "{} rejected update of {}: {}",
                            self.provider.provider_name(),
                            outcome.hostname,
                            outcome.raw_response
                        );
                    }
                    self.emit_event(EngineEvent::HostUpdated {
                        hostname: outcome.hostname.clone(),
                        success: outcome.success,
                        response: outcome.raw_response.clone(),
                    });
                }
                Err(e) => {
                    error!("Failed to update {}: {}", hostname, e);
                    self.emit_event(EngineEvent::HostFailed {
                        hostname: hostname.clone(),
                        error: e.to_string(),
                    });
                }
            }

            report.hosts.push(HostReport {
                hostname: hostname.clone(),
                result,
            });
        }

        report
    }

    fn fail(&mut self, error: Error) -> CycleOutcome {
        self.state = SchedulerState::ErrorBackoff;
        CycleOutcome::Failed(error)
    }

    fn rebuild_transport(&self) {
        if let Some(transport) = &self.transport {
            match transport.rebuild() {
                Ok(()) => debug!("HTTP transport rebuilt"),
                Err(e) => error!("Failed to rebuild HTTP transport: {}", e),
            }
        }
    }

    /// Emit an engine event
    ///
    /// Events are dropped (with a warning) when the channel is full, and
    /// silently when nobody listens.
    fn emit_event(&self, event: EngineEvent) {
        if let Err(TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

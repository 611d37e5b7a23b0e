//! Test doubles and common utilities for engine contract tests
//!
//! Every double is `Clone` and shares its state through `Arc`, so a test can
//! hand one copy to the engine and keep another to inspect afterwards.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ddns_core::config::EngineConfig;
use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, HttpResponse, HttpTransport, IpSource, UpdateOutcome};
use ddns_core::{Clock, Credentials, DdnsConfig};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn ip(last: u8) -> IpAddr {
    IpAddr::from([192, 0, 2, last])
}

/// Fixed starting point for wall-clock tests
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// IP source answering from a script
///
/// Results are consumed in order; once the script runs out the last result
/// is repeated forever.
#[derive(Clone, Default)]
pub struct ScriptedIpSource {
    script: Arc<Mutex<VecDeque<std::result::Result<IpAddr, String>>>>,
    last: Arc<Mutex<Option<std::result::Result<IpAddr, String>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    /// Source that always answers `ip`
    pub fn fixed(ip: IpAddr) -> Self {
        Self::scripted(vec![Ok(ip)])
    }

    pub fn scripted(script: Vec<std::result::Result<IpAddr, &str>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map_err(str::to_string))
                    .collect(),
            )),
            ..Self::default()
        }
    }

    /// Queue more results
    pub fn push(&self, result: std::result::Result<IpAddr, &str>) {
        self.script
            .lock()
            .unwrap()
            .push_back(result.map_err(str::to_string));
    }

    /// Number of `resolve()` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IpSource for ScriptedIpSource {
    async fn resolve(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        let result = match next {
            Some(result) => {
                *self.last.lock().unwrap() = Some(result.clone());
                result
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err("script is empty".to_string())),
        };

        result.map_err(Error::resolution)
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// How a host update should fail
#[derive(Debug, Clone, Copy)]
pub enum HostFailure {
    /// The request never got an answer
    Transport,
    /// The provider answered `nohost`
    Rejected,
    /// The provider answered with nothing
    Empty,
}

/// Provider recording every update
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    calls: Arc<AtomicUsize>,
    updates: Arc<Mutex<Vec<(String, IpAddr)>>>,
    failures: Arc<Mutex<HashMap<String, HostFailure>>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make updates of `hostname` fail
    pub fn fail_host(&self, hostname: &str, failure: HostFailure) {
        self.failures
            .lock()
            .unwrap()
            .insert(hostname.to_string(), failure);
    }

    /// Let `hostname` succeed again
    pub fn heal_host(&self, hostname: &str) {
        self.failures.lock().unwrap().remove(hostname);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(hostname, ip)` for every call, in order
    pub fn updates(&self) -> Vec<(String, IpAddr)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn update_host(&self, hostname: &str, ip: IpAddr, _credentials: &Credentials) -> Result<UpdateOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.updates
            .lock()
            .unwrap()
            .push((hostname.to_string(), ip));

        let failure = self.failures.lock().unwrap().get(hostname).copied();
        match failure {
            None => Ok(UpdateOutcome::new(hostname, true, format!("good {}", ip))),
            Some(HostFailure::Rejected) => Ok(UpdateOutcome::new(hostname, false, "nohost")),
            Some(HostFailure::Transport) => Err(Error::transport("connection reset by peer")),
            Some(HostFailure::Empty) => Err(Error::empty_response(hostname)),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Wall clock moved by hand
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Transport that only counts rebuilds
#[derive(Clone, Default)]
pub struct CountingTransport {
    rebuilds: Arc<AtomicUsize>,
}

impl CountingTransport {
    pub fn rebuilds(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for CountingTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        Err(Error::transport(format!("no network in tests ({})", url)))
    }

    async fn post(&self, url: &str, _body: String, _credentials: &Credentials) -> Result<HttpResponse> {
        Err(Error::transport(format!("no network in tests ({})", url)))
    }

    fn rebuild(&self) -> Result<()> {
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Create a minimal valid configuration for `hostnames`
///
/// One-hour check interval and backoff, a six-day update interval and no
/// forced first update.
pub fn minimal_config(hostnames: &[&str]) -> DdnsConfig {
    DdnsConfig {
        username: "me@example.com".to_string(),
        password: "secret".to_string(),
        hostnames: hostnames.iter().map(|h| h.to_string()).collect(),
        update_interval_days: 6,
        update_now: false,
        use_log_file: false,
        engine: EngineConfig {
            check_interval_secs: 3600,
            error_backoff_secs: 3600,
            startup_resolve_attempts: 5,
            startup_retry_delay_secs: 1,
            http_timeout_secs: 30,
            event_channel_capacity: 100,
        },
        ..DdnsConfig::default()
    }
}

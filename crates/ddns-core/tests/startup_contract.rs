//! Contract Test: Startup
//!
//! Before the main loop the engine resolves the IP with a bounded retry:
//! - Each attempt is preceded by the startup delay
//! - Success on any attempt seeds the last known IP
//! - Exhausting every attempt is the only fatal error

mod common;

use common::*;
use ddns_core::{DdnsEngine, EngineEvent, Error, MemoryStateStore, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn engine_for(source: &ScriptedIpSource, provider: &MockDnsProvider, store: &MemoryStateStore) -> DdnsEngine {
    let (engine, _events) = DdnsEngine::new(
        Box::new(source.clone()),
        Box::new(provider.clone()),
        Box::new(store.clone()),
        minimal_config(&["home"]),
    )
    .expect("engine construction succeeds");

    engine.with_clock(Arc::new(ManualClock::new(t0())))
}

#[tokio::test(start_paused = true)]
async fn startup_succeeds_on_third_attempt() {
    let source = ScriptedIpSource::scripted(vec![Err("dns not ready"), Err("dns not ready"), Ok(ip(9))]);
    let provider = MockDnsProvider::new();
    let store = MemoryStateStore::with_last_update(t0());
    let mut engine = engine_for(&source, &provider, &store);

    let started = Instant::now();
    engine.startup().await.expect("third attempt succeeds");

    assert_eq!(source.calls(), 3);
    assert_eq!(engine.last_known_ip(), Some(ip(9)));
    assert_eq!(started.elapsed(), Duration::from_secs(3), "one delay before each attempt");
}

#[tokio::test(start_paused = true)]
async fn startup_exhaustion_is_fatal() {
    let source = ScriptedIpSource::scripted(vec![Err("network unreachable")]);
    let provider = MockDnsProvider::new();
    let store = MemoryStateStore::new();
    let mut engine = engine_for(&source, &provider, &store);

    match engine.startup().await {
        Err(Error::StartupResolutionExhausted { attempts, last_error }) => {
            assert_eq!(attempts, 5);
            assert!(last_error.contains("network unreachable"));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }

    assert_eq!(source.calls(), 5);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn startup_failure_ends_run_without_entering_loop() {
    let source = ScriptedIpSource::scripted(vec![Err("no route to host")]);
    let provider = MockDnsProvider::new();
    let store = MemoryStateStore::new();

    let mut config = minimal_config(&["home"]);
    config.update_now = true;
    let (engine, mut events) = DdnsEngine::new(
        Box::new(source.clone()),
        Box::new(provider.clone()),
        Box::new(store.clone()),
        config,
    )
    .expect("engine construction succeeds");
    let mut engine = engine.with_clock(Arc::new(ManualClock::new(t0())));

    let result = engine.run_until(std::future::pending::<()>()).await;

    assert!(matches!(result, Err(Error::StartupResolutionExhausted { .. })));
    assert_eq!(source.calls(), 5, "no cycle ran after startup failed");
    assert_eq!(provider.calls(), 0);
    assert_eq!(events.try_recv().ok(), Some(EngineEvent::Started { hostnames: 1 }));
}

#[tokio::test(start_paused = true)]
async fn startup_bootstrap_persists_before_resolving() {
    let source = ScriptedIpSource::scripted(vec![Err("offline")]);
    let provider = MockDnsProvider::new();
    let store = MemoryStateStore::new();
    let mut engine = engine_for(&source, &provider, &store);

    assert!(engine.startup().await.is_err());
    assert_eq!(store.last_update().await.unwrap(), Some(t0()));
}

#[tokio::test]
async fn startup_rejects_invalid_configuration() {
    let mut config = minimal_config(&["home"]);
    config.hostnames.clear();

    let result = DdnsEngine::new(
        Box::new(ScriptedIpSource::fixed(ip(1))),
        Box::new(MockDnsProvider::new()),
        Box::new(MemoryStateStore::new()),
        config,
    );

    assert!(matches!(result, Err(Error::Config(_))));
}

//! Contract Test: Update Scheduling
//!
//! Verifies when the engine pushes the address to the provider:
//! - A missing state file is a bootstrap: `now` is recorded, nothing is sent
//! - The next update is always `last update + interval`
//! - `update_now` forces exactly one update and is then cleared
//! - An IP change triggers an update regardless of the schedule
//! - With nothing changed, no provider call is made

mod common;

use chrono::Duration;
use common::*;
use ddns_core::{
    CycleOutcome, DdnsEngine, EngineEvent, MemoryStateStore, SchedulerState, StateStore,
    TriggerReason,
};
use std::sync::Arc;

struct Harness {
    engine: DdnsEngine,
    events: tokio::sync::mpsc::Receiver<EngineEvent>,
    source: ScriptedIpSource,
    provider: MockDnsProvider,
    store: MemoryStateStore,
    clock: ManualClock,
}

fn harness(source: ScriptedIpSource, store: MemoryStateStore, update_now: bool) -> Harness {
    let provider = MockDnsProvider::new();
    let clock = ManualClock::new(t0());

    let mut config = minimal_config(&["home", "cabin.dy.fi"]);
    config.update_now = update_now;

    let (engine, events) = DdnsEngine::new(
        Box::new(source.clone()),
        Box::new(provider.clone()),
        Box::new(store.clone()),
        config,
    )
    .expect("engine construction succeeds");

    Harness {
        engine: engine.with_clock(Arc::new(clock.clone())),
        events,
        source,
        provider,
        store,
        clock,
    }
}

fn drain(events: &mut tokio::sync::mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn schedule_bootstrap_records_now_without_updating() {
    let mut h = harness(ScriptedIpSource::fixed(ip(1)), MemoryStateStore::new(), false);

    h.engine.startup().await.expect("startup succeeds");

    assert_eq!(h.store.last_update().await.unwrap(), Some(t0()));
    assert_eq!(h.engine.next_update(), Some(t0() + Duration::days(6)));
    assert_eq!(h.engine.last_known_ip(), Some(ip(1)));
    assert_eq!(h.provider.calls(), 0, "bootstrap must not contact the provider");
}

#[tokio::test(start_paused = true)]
async fn schedule_next_update_is_last_plus_interval() {
    let last = t0() - Duration::days(2);
    let mut h = harness(
        ScriptedIpSource::fixed(ip(1)),
        MemoryStateStore::with_last_update(last),
        false,
    );

    h.engine.startup().await.expect("startup succeeds");

    assert_eq!(h.engine.next_update(), Some(last + Duration::days(6)));
    assert_eq!(h.store.last_update().await.unwrap(), Some(last));
}

#[tokio::test(start_paused = true)]
async fn schedule_no_change_means_no_provider_call() {
    let mut h = harness(
        ScriptedIpSource::fixed(ip(1)),
        MemoryStateStore::with_last_update(t0()),
        false,
    );
    h.engine.startup().await.expect("startup succeeds");

    for _ in 0..3 {
        h.clock.advance(Duration::hours(1));
        let outcome = h.engine.run_cycle().await;
        assert!(matches!(outcome, CycleOutcome::Skipped { ip: skipped, .. } if skipped == ip(1)));
    }

    assert_eq!(h.provider.calls(), 0);
    assert_eq!(h.source.calls(), 4, "one startup resolution plus one per cycle");
    assert_eq!(h.store.last_update().await.unwrap(), Some(t0()));
    assert_eq!(h.engine.state(), SchedulerState::Waiting);
}

#[tokio::test(start_paused = true)]
async fn schedule_update_now_fires_once_and_clears() {
    let mut h = harness(
        ScriptedIpSource::fixed(ip(1)),
        MemoryStateStore::with_last_update(t0()),
        true,
    );
    h.engine.startup().await.expect("startup succeeds");
    assert!(h.engine.update_now());

    h.clock.advance(Duration::minutes(5));
    let now = t0() + Duration::minutes(5);

    match h.engine.run_cycle().await {
        CycleOutcome::Updated { reason, report, .. } => {
            assert_eq!(reason, TriggerReason::UpdateNow);
            assert!(report.all_succeeded());
        }
        other => panic!("expected an update, got {:?}", other),
    }

    assert!(!h.engine.update_now());
    assert_eq!(h.provider.calls(), 2, "one call per configured host");
    assert_eq!(h.store.last_update().await.unwrap(), Some(now));
    assert_eq!(h.engine.next_update(), Some(now + Duration::days(6)));

    h.clock.advance(Duration::hours(1));
    assert!(matches!(h.engine.run_cycle().await, CycleOutcome::Skipped { .. }));
    assert_eq!(h.provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn schedule_ip_change_triggers_update() {
    let source = ScriptedIpSource::scripted(vec![Ok(ip(1)), Ok(ip(1)), Ok(ip(2))]);
    let mut h = harness(source, MemoryStateStore::with_last_update(t0()), false);
    h.engine.startup().await.expect("startup succeeds");

    h.clock.advance(Duration::hours(1));
    assert!(matches!(h.engine.run_cycle().await, CycleOutcome::Skipped { .. }));

    h.clock.advance(Duration::hours(1));
    let now = t0() + Duration::hours(2);
    drain(&mut h.events);

    match h.engine.run_cycle().await {
        CycleOutcome::Updated { ip: updated, reason, .. } => {
            assert_eq!(updated, ip(2));
            assert_eq!(
                reason,
                TriggerReason::IpChanged {
                    previous: Some(ip(1)),
                    current: ip(2),
                }
            );
        }
        other => panic!("expected an update, got {:?}", other),
    }

    assert_eq!(
        h.provider.updates(),
        vec![("home".to_string(), ip(2)), ("cabin.dy.fi".to_string(), ip(2))]
    );
    assert_eq!(h.engine.last_known_ip(), Some(ip(2)));
    assert_eq!(h.store.last_update().await.unwrap(), Some(now));
    assert_eq!(h.engine.next_update(), Some(now + Duration::days(6)));

    let events = drain(&mut h.events);
    assert!(events.contains(&EngineEvent::IpResolved { ip: ip(2) }));
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::HostUpdated { hostname, success: true, .. } if hostname == "home"
    )));

    // The new address is now the known one
    h.clock.advance(Duration::hours(1));
    assert!(matches!(h.engine.run_cycle().await, CycleOutcome::Skipped { .. }));
}

#[tokio::test(start_paused = true)]
async fn schedule_elapsed_interval_forces_update() {
    let mut h = harness(
        ScriptedIpSource::fixed(ip(1)),
        MemoryStateStore::with_last_update(t0()),
        false,
    );
    h.engine.startup().await.expect("startup succeeds");

    // Exactly at the scheduled time: not yet
    h.clock.advance(Duration::days(6));
    assert!(matches!(h.engine.run_cycle().await, CycleOutcome::Skipped { .. }));

    h.clock.advance(Duration::minutes(1));
    let now = t0() + Duration::days(6) + Duration::minutes(1);

    match h.engine.run_cycle().await {
        CycleOutcome::Updated { reason, .. } => assert_eq!(reason, TriggerReason::ScheduleElapsed),
        other => panic!("expected an update, got {:?}", other),
    }

    assert_eq!(h.store.last_update().await.unwrap(), Some(now));
    assert_eq!(h.engine.next_update(), Some(now + Duration::days(6)));
}

#[tokio::test(start_paused = true)]
async fn schedule_skip_reports_next_update() {
    let mut h = harness(
        ScriptedIpSource::fixed(ip(1)),
        MemoryStateStore::with_last_update(t0()),
        false,
    );
    h.engine.startup().await.expect("startup succeeds");
    drain(&mut h.events);

    h.engine.run_cycle().await;

    assert_eq!(
        drain(&mut h.events),
        vec![
            EngineEvent::IpResolved { ip: ip(1) },
            EngineEvent::UpdateSkipped {
                next_update: t0() + Duration::days(6),
            },
        ]
    );
}

// # ddns-core
//
// Core library for the dy.fi dynamic DNS agent.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping host records
// pointed at the current public address:
// - **IpSource**: Trait for resolving the current public IP
// - **DnsProvider**: Trait for updating one host via the provider API
// - **StateStore**: Trait for the persisted last update time
// - **HttpTransport**: Trait for the shared, rebuildable HTTP client
// - **DdnsEngine**: Scheduler that decides when to update and contains errors
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Scheduling lives here, HTTP lives in the
//    source and provider crates
// 2. **Explicit Configuration**: Settings are passed into the engine at
//    construction, nothing is global
// 3. **Results, not panics**: Every cycle ends in a `CycleOutcome`; only
//    startup errors stop the agent
// 4. **Library-First**: The daemon is a thin wrapper around `DdnsEngine`

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod state;
pub mod clock;

// Re-export core types for convenience
pub use traits::{DnsProvider, HttpResponse, HttpTransport, IpSource, StateStore, UpdateOutcome};
pub use engine::{CycleOutcome, DdnsEngine, EngineEvent, SchedulerState, TriggerReason};
pub use config::{Credentials, DdnsConfig, EngineConfig, IpVersion};
pub use error::{Error, Result};
pub use state::{FileStateStore, MemoryStateStore};
pub use clock::{Clock, SystemClock};

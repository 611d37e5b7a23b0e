// # State Store Trait
//
// Defines the interface for the persisted update timestamp.
//
// ## Purpose
//
// The scheduler forces an update every `update_interval_days`. The time of
// the last update is persisted so the schedule survives restarts:
// `next_update = last_update + interval`.
//
// ## Implementations
//
// - File-based: `FileStateStore` (one human-readable timestamp)
// - In-memory: `MemoryStateStore` (tests, ephemeral deployments)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for state store implementations
///
/// # Rules
///
/// - Absence of state is reported as `Ok(None)`, never as an error, so the
///   engine can tell "first run" apart from "overdue"
/// - `record_update` overwrites the previous value and is durable when it
///   returns
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Timestamp of the last update
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ts))`: A previous update was recorded
    /// - `Ok(None)`: No state yet (first run)
    /// - `Err(Error)`: Storage error
    async fn last_update(&self) -> Result<Option<DateTime<Utc>>, crate::Error>;

    /// Record the time of an update
    async fn record_update(&self, at: DateTime<Utc>) -> Result<(), crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error> {
        Ok(())
    }
}

// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Crash Behavior
//
// - State is lost on restart
// - The first run after a restart is a bootstrap: the schedule starts over
//   from the restart time
//
// ## When to Use
//
// - Testing environments
// - Container deployments where the schedule does not need to survive restarts

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::StateStore;

/// In-memory state store implementation
///
/// Clones share the same underlying value, so a test can keep a handle and
/// observe what the engine recorded.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a last update time
    pub fn with_last_update(at: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(at))),
        }
    }

    /// Forget the recorded time
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn last_update(&self) -> Result<Option<DateTime<Utc>>, Error> {
        Ok(*self.inner.read().await)
    }

    async fn record_update(&self, at: DateTime<Utc>) -> Result<(), Error> {
        *self.inner.write().await = Some(at);
        Ok(())
    }
}

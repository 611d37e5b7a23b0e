//! Wall-clock source for the scheduler
//!
//! The schedule is expressed in wall-clock time (`last_update + N days`), so
//! the engine asks a [`Clock`] for "now" instead of calling `Utc::now()`
//! directly. Sleeps still go through `tokio::time`.

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

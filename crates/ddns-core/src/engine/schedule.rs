//! Pure scheduling decisions
//!
//! Everything here is a function of its inputs so the trigger rules can be
//! tested without running the loop.

use chrono::{DateTime, Utc};
use std::fmt;
use std::net::IpAddr;

/// Why a cycle issued provider updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerReason {
    /// The `update_now` flag was set
    UpdateNow,
    /// The resolved address differs from the last known one
    IpChanged {
        previous: Option<IpAddr>,
        current: IpAddr,
    },
    /// `now` is past the scheduled update time
    ScheduleElapsed,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerReason::UpdateNow => write!(f, "immediate update requested"),
            TriggerReason::IpChanged {
                previous: Some(previous),
                current,
            } => write!(f, "IP changed {} -> {}", previous, current),
            TriggerReason::IpChanged {
                previous: None,
                current,
            } => write!(f, "IP resolved as {}", current),
            TriggerReason::ScheduleElapsed => write!(f, "scheduled update time reached"),
        }
    }
}

/// `last + interval`
pub fn next_scheduled_update(last: DateTime<Utc>, interval: chrono::Duration) -> DateTime<Utc> {
    last + interval
}

/// Evaluate the trigger condition
///
/// `update_now || now > next_update || ip != last_known_ip`. The returned
/// reason names the first condition that holds, checked in the order
/// `update_now`, address change, elapsed schedule.
pub fn decide_trigger(
    update_now: bool,
    now: DateTime<Utc>,
    next_update: DateTime<Utc>,
    last_known_ip: Option<IpAddr>,
    current_ip: IpAddr,
) -> Option<TriggerReason> {
    if update_now {
        return Some(TriggerReason::UpdateNow);
    }

    if last_known_ip != Some(current_ip) {
        return Some(TriggerReason::IpChanged {
            previous: last_known_ip,
            current: current_ip,
        });
    }

    if now > next_update {
        return Some(TriggerReason::ScheduleElapsed);
    }

    None
}

/// "N days, N hours, N minutes" until `next`, clamped at zero
pub fn format_remaining(now: DateTime<Utc>, next: DateTime<Utc>) -> String {
    let remaining = (next - now).max(chrono::Duration::zero());
    format!(
        "{} days, {} hours, {} minutes",
        remaining.num_days(),
        remaining.num_hours() % 24,
        remaining.num_minutes() % 60
    )
}

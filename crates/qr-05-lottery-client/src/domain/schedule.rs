//! # Round Schedule
//!
//! Round times travel as local wall-clock text `yyyyMMdd HH:mm:ss`. The
//! commitment is due a fixed lead before the deadline; with too little
//! time left it is sent at once.

use std::time::Duration;

use chrono::NaiveDateTime;

pub const ROUND_TIME_FORMAT: &str = "%Y%m%d %H:%M:%S";

pub fn parse_round_time(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), ROUND_TIME_FORMAT).ok()
}

/// Delay until the commitment should go out, given the seconds left
/// before the deadline. Never negative.
pub fn deadline_delay(seconds_remaining: i64, lead: Duration, threshold: Duration) -> Duration {
    if seconds_remaining < threshold.as_secs() as i64 {
        return Duration::ZERO;
    }
    let remaining_ms = seconds_remaining.saturating_mul(1000);
    let lead_ms = lead.as_millis() as i64;
    Duration::from_millis(remaining_ms.saturating_sub(lead_ms).max(0) as u64)
}

/// Whole seconds from `now` to `deadline`, negative once it has passed.
pub fn seconds_until(now: NaiveDateTime, deadline: NaiveDateTime) -> i64 {
    (deadline - now).num_seconds()
}

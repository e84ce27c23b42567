//! Time and timestamp helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// UTC timestamp used for chamber modification times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Return the current time, or one microsecond past `previous` when the clock
/// has not moved beyond it.
///
/// Modification times must strictly advance on every save even when two saves
/// land within the clock's resolution.
#[must_use]
pub fn now_after(previous: Timestamp) -> Timestamp {
    let current = now();
    if current > previous {
        current
    } else {
        previous + TimeDelta::microseconds(1)
    }
}

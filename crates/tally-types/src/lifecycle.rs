//! Expiration arithmetic for tracked resources.
//!
//! Nothing here touches the store or the clock: callers pass `now` in, so
//! every response computed in one request agrees on the same instant.

use chrono::{DateTime, TimeDelta, Utc};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Whole days until `expire_at`, rounded up. Negative once expired.
pub fn remaining_days(expire_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (expire_at - now).num_milliseconds();
    let days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        days
    } else {
        days + 1
    }
}

/// Instant a day-based renewal counts from: the current expiration while it
/// has not passed yet, otherwise `now`.
pub fn renewal_base(expire_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if expire_at < now { now } else { expire_at }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renewal {
    /// Replace the expiration outright.
    Absolute(DateTime<Utc>),
    /// Shift the expiration by a number of days from the renewal base.
    ExtendDays(i64),
}

impl Renewal {
    /// An absolute date wins when both are supplied. `None` if neither is.
    pub fn from_parts(days: Option<i64>, expire_at: Option<DateTime<Utc>>) -> Option<Self> {
        match (expire_at, days) {
            (Some(at), _) => Some(Renewal::Absolute(at)),
            (None, Some(days)) => Some(Renewal::ExtendDays(days)),
            (None, None) => None,
        }
    }

    /// New expiration, or `None` if the day count overflows the calendar.
    pub fn apply(self, expire_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Renewal::Absolute(at) => Some(at),
            Renewal::ExtendDays(days) => {
                let delta = TimeDelta::try_days(days)?;
                renewal_base(expire_at, now).checked_add_signed(delta)
            }
        }
    }
}

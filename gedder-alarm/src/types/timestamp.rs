//! Absolute instants in epoch milliseconds.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, UtcOffset};

/// An absolute instant, stored as milliseconds since the Unix epoch.
///
/// This is the unit the scheduling capability talks in. Differences between
/// two timestamps are signed [`time::Duration`]s, so "how long until" can be
/// negative once an instant has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * 1000)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Whole seconds since the epoch, rounded toward negative infinity.
    pub const fn as_secs(self) -> i64 {
        self.0.div_euclid(1000)
    }

    pub fn from_datetime(datetime: OffsetDateTime) -> Self {
        Self((datetime.unix_timestamp_nanos() / 1_000_000) as i64)
    }

    pub fn to_datetime(self, offset: UtcOffset) -> OffsetDateTime {
        let utc = OffsetDateTime::from_unix_timestamp_nanos(self.0 as i128 * 1_000_000)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        utc.to_offset(offset)
    }

    pub fn now_utc() -> Self {
        Self::from_datetime(OffsetDateTime::now_utc())
    }

    /// Time remaining from `now` until this instant, clamped at zero.
    pub fn saturating_until(self, now: Timestamp) -> std::time::Duration {
        std::time::Duration::from_millis(self.0.saturating_sub(now.0).max(0) as u64)
    }
}

/// `duration` in whole milliseconds, clamped to the `i64` range.
fn clamped_millis(duration: Duration) -> i64 {
    i64::try_from(duration.whole_milliseconds()).unwrap_or(if duration.is_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

// Instant arithmetic saturates at the ends of the range instead of
// overflowing.
impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(clamped_millis(rhs)))
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_sub(clamped_millis(rhs)))
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Timestamp) -> Duration {
        Duration::milliseconds(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

//! Calendar triples and the edit-time day adjustment.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::error::ComponentRange;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

use super::Timestamp;

/// A wall-clock moment as the user picked it: day of the year plus a time
/// of day, minute resolution.
///
/// Days past the end of the year roll into the following year when
/// resolved, so "tomorrow" on December 31st is still `ordinal + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClockTime {
    pub day_of_year: u16,
    pub hour: u8,
    pub minute: u8,
}

impl ClockTime {
    pub const fn new(day_of_year: u16, hour: u8, minute: u8) -> Self {
        Self {
            day_of_year,
            hour,
            minute,
        }
    }

    pub fn from_datetime(datetime: OffsetDateTime) -> Self {
        Self {
            day_of_year: datetime.ordinal(),
            hour: datetime.hour(),
            minute: datetime.minute(),
        }
    }

    /// Resolve to an absolute instant in `year` at the given UTC offset.
    pub fn resolve(self, year: i32, offset: UtcOffset) -> Result<Timestamp, ComponentRange> {
        let first_of_year = Date::from_ordinal_date(year, 1)?;
        let days = i64::from(self.day_of_year.max(1)) - 1;
        let date = first_of_year.saturating_add(Duration::days(days));
        let local = date.with_hms(self.hour, self.minute, 0)?;
        Ok(Timestamp::from_datetime(local.assume_offset(offset)))
    }

    pub fn hour_minute(self) -> (u8, u8) {
        (self.hour, self.minute)
    }

    pub fn with_day(self, day_of_year: u16) -> Self {
        Self {
            day_of_year,
            ..self
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "day {} {:02}:{:02}",
            self.day_of_year, self.hour, self.minute
        )
    }
}

/// Pick the days an alarm and its arrival land on, given their times of day.
///
/// The alarm goes on today if its time is still ahead of `now`, otherwise
/// tomorrow. The arrival shares the alarm's day unless its time of day is
/// earlier than the alarm's, in which case it is the next day. Returns
/// `(alarm_day, arrival_day)` as days of the year of `now`.
pub fn schedule_days(alarm: (u8, u8), arrival: (u8, u8), now: OffsetDateTime) -> (u16, u16) {
    let today = now.ordinal();
    let alarm_day = if alarm <= (now.hour(), now.minute()) {
        today + 1
    } else {
        today
    };

    let arrival_day = if arrival < alarm {
        alarm_day + 1
    } else {
        alarm_day
    };

    (alarm_day, arrival_day)
}

#[cfg(test)]
mod tests {
    use time::macros::{datetime, offset};

    use super::*;

    #[test]
    fn resolves_in_given_offset() {
        let ts = ClockTime::new(60, 6, 30).resolve(2026, offset!(-7)).unwrap();
        // 2026 is not a leap year, so day 60 is March 1st.
        assert_eq!(
            ts.to_datetime(UtcOffset::UTC),
            datetime!(2026-03-01 13:30 UTC)
        );
    }

    #[test]
    fn day_past_year_end_rolls_over() {
        let ts = ClockTime::new(366, 7, 0).resolve(2026, UtcOffset::UTC).unwrap();
        assert_eq!(
            ts.to_datetime(UtcOffset::UTC),
            datetime!(2027-01-01 07:00 UTC)
        );
    }

    #[test]
    fn rejects_out_of_range_hour() {
        assert!(ClockTime::new(10, 24, 0).resolve(2026, UtcOffset::UTC).is_err());
    }

    #[test]
    fn alarm_later_today_stays_today() {
        let now = datetime!(2026-05-10 05:00 UTC);
        let (alarm, arrival) = schedule_days((6, 0), (7, 0), now);
        assert_eq!(alarm, now.ordinal());
        assert_eq!(arrival, now.ordinal());
    }

    #[test]
    fn alarm_already_passed_moves_to_tomorrow() {
        let now = datetime!(2026-05-10 06:00 UTC);
        let (alarm, arrival) = schedule_days((6, 0), (7, 0), now);
        assert_eq!(alarm, now.ordinal() + 1);
        assert_eq!(arrival, now.ordinal() + 1);
    }

    #[test]
    fn arrival_before_alarm_clock_time_is_next_day() {
        let now = datetime!(2026-05-10 20:00 UTC);
        let (alarm, arrival) = schedule_days((23, 30), (0, 15), now);
        assert_eq!(alarm, now.ordinal());
        assert_eq!(arrival, now.ordinal() + 1);
    }

    #[test]
    fn arrival_minutes_earlier_in_same_hour_is_next_day() {
        let now = datetime!(2026-05-10 01:00 UTC);
        let (alarm, arrival) = schedule_days((6, 45), (6, 30), now);
        assert_eq!(arrival, alarm + 1);
    }
}

//! The persisted alarm record.
//!
//! One record holds everything about an alarm: the plain wake-up time, the
//! route and arrival target the smart mode polls against, and the two armed
//! flags. The store owns the durable copy; everyone else reads the latest
//! version, mutates it, and writes it back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::alarm_manager::{CallbackKind, Slot};
use crate::error::{Error, Result};
use crate::types::{ClockTime, DaysOfWeek, PrepTime, Timestamp, schedule_days};

const DEFAULT_ALARM_HOUR: u8 = 6;
const DEFAULT_ALARM_MINUTE: u8 = 0;
const DEFAULT_ARRIVAL_HOUR: u8 = 7;
const DEFAULT_ARRIVAL_MINUTE: u8 = 0;

/// Draw a request code at random, kept within the positive `i32` range.
pub fn random_request_code() -> u32 {
    rand::random::<u32>() & 0x7fff_ffff
}

/// Stable, globally unique record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(Uuid);

impl AlarmId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for AlarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AlarmId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Transit,
    Walking,
    Bicycling,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransitMode {
    Bus,
    #[default]
    Subway,
    Train,
    Tram,
    Rail,
}

/// A place as the provider knows it (`id`) and as the user reads it
/// (`address`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub address: String,
}

impl Place {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub id: AlarmId,

    /// Small integer naming this record's callback slots. Unique among
    /// records with anything armed.
    pub request_code: u32,

    pub origin: Place,
    pub destination: Place,
    pub travel_mode: TravelMode,
    pub transit_mode: TransitMode,
    pub repeat_days: DaysOfWeek,

    /// When to ring if nothing adjusts it. Also the hard ceiling for the
    /// smart loop.
    pub alarm: ClockTime,
    pub alarm_at: Timestamp,

    /// When the user has to be at the destination.
    pub arrival: ClockTime,
    pub arrival_at: Timestamp,

    pub prep_time: PrepTime,

    pub alarm_armed: bool,
    pub smart_armed: bool,
}

impl AlarmRecord {
    /// A fresh one-shot record: alarm tomorrow at 06:00, arrival 07:00, no
    /// prep time, driving, nothing armed.
    pub fn with_defaults(now: OffsetDateTime) -> Result<Self> {
        let tomorrow = now.ordinal() + 1;
        let mut record = Self {
            id: AlarmId::new(),
            request_code: random_request_code(),
            origin: Place::default(),
            destination: Place::default(),
            travel_mode: TravelMode::default(),
            transit_mode: TransitMode::default(),
            repeat_days: DaysOfWeek::empty(),
            alarm: ClockTime::new(tomorrow, DEFAULT_ALARM_HOUR, DEFAULT_ALARM_MINUTE),
            alarm_at: Timestamp::EPOCH,
            arrival: ClockTime::new(tomorrow, DEFAULT_ARRIVAL_HOUR, DEFAULT_ARRIVAL_MINUTE),
            arrival_at: Timestamp::EPOCH,
            prep_time: PrepTime::ZERO,
            alarm_armed: false,
            smart_armed: false,
        };
        record.set_times(record.alarm, record.arrival, now.year(), now.offset())?;
        Ok(record)
    }

    /// Set both triples and recompute their instants in `year`.
    pub fn set_times(
        &mut self,
        alarm: ClockTime,
        arrival: ClockTime,
        year: i32,
        offset: UtcOffset,
    ) -> Result<()> {
        let alarm_at = alarm.resolve(year, offset)?;
        let arrival_at = arrival.resolve(year, offset)?;
        if arrival_at < alarm_at {
            return Err(Error::InvalidParameters(format!(
                "arrival ({arrival}) is before alarm ({alarm})"
            )));
        }

        self.alarm = alarm;
        self.alarm_at = alarm_at;
        self.arrival = arrival;
        self.arrival_at = arrival_at;
        Ok(())
    }

    /// Re-pick the alarm and arrival days from their times of day relative
    /// to `now`. Run whenever an alarm is armed or edited.
    ///
    /// A repeating alarm lands on the first selected weekday at or after
    /// the day that picks.
    pub fn adjust_days(&mut self, now: OffsetDateTime) -> Result<()> {
        let (alarm_day, arrival_day) =
            schedule_days(self.alarm.hour_minute(), self.arrival.hour_minute(), now);
        self.set_times(
            self.alarm.with_day(alarm_day),
            self.arrival.with_day(arrival_day),
            now.year(),
            now.offset(),
        )?;

        let weekday = self.alarm_at.to_datetime(now.offset()).weekday();
        if self.repeat_days.is_repeating() && !self.repeat_days.includes(weekday) {
            self.next_repeat_after(now.offset());
        }
        Ok(())
    }

    /// Move a repeating alarm to its next selected weekday.
    ///
    /// Returns `false` (and changes nothing) for a one-shot record.
    pub fn next_repeat_after(&mut self, offset: UtcOffset) -> bool {
        let alarm_local = self.alarm_at.to_datetime(offset);
        let Some(days) = self.repeat_days.days_until_next(alarm_local.weekday()) else {
            return false;
        };

        let shift = Duration::days(i64::from(days));
        let next_alarm = alarm_local + shift;
        let next_arrival = self.arrival_at.to_datetime(offset) + shift;

        self.alarm = ClockTime::from_datetime(next_alarm);
        self.alarm_at = Timestamp::from_datetime(next_alarm);
        self.arrival = ClockTime::from_datetime(next_arrival);
        self.arrival_at = Timestamp::from_datetime(next_arrival);
        true
    }

    /// Smart mode needs somewhere to leave from and somewhere to go.
    pub fn is_smart_eligible(&self) -> bool {
        !self.origin.address.is_empty() && !self.destination.address.is_empty()
    }

    pub fn alarm_slot(&self) -> Slot {
        Slot::new(self.request_code, CallbackKind::Alarm)
    }

    pub fn poll_slot(&self) -> Slot {
        Slot::new(self.request_code, CallbackKind::Poll)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn defaults_are_tomorrow_six_and_seven() {
        let now = datetime!(2026-04-20 22:15 UTC);
        let record = AlarmRecord::with_defaults(now).unwrap();

        assert_eq!(record.alarm, ClockTime::new(now.ordinal() + 1, 6, 0));
        assert_eq!(record.arrival, ClockTime::new(now.ordinal() + 1, 7, 0));
        assert_eq!(
            record.alarm_at.to_datetime(UtcOffset::UTC),
            datetime!(2026-04-21 06:00 UTC)
        );
        assert_eq!(record.arrival_at - record.alarm_at, Duration::hours(1));
        assert_eq!(record.travel_mode, TravelMode::Driving);
        assert!(!record.repeat_days.is_repeating());
        assert!(!record.alarm_armed);
        assert!(!record.smart_armed);
        assert!(record.request_code <= 0x7fff_ffff);
    }

    #[test]
    fn eligibility_needs_both_addresses() {
        let mut record = AlarmRecord::with_defaults(datetime!(2026-04-20 12:00 UTC)).unwrap();
        assert!(!record.is_smart_eligible());

        record.origin = Place::new("place-a", "1 Home St");
        assert!(!record.is_smart_eligible());

        record.destination = Place::new("place-b", "2 Work Ave");
        assert!(record.is_smart_eligible());
    }

    #[test]
    fn arrival_before_alarm_is_rejected() {
        let mut record = AlarmRecord::with_defaults(datetime!(2026-04-20 12:00 UTC)).unwrap();
        let result = record.set_times(
            ClockTime::new(111, 8, 0),
            ClockTime::new(111, 7, 0),
            2026,
            UtcOffset::UTC,
        );
        assert!(matches!(result, Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn adjust_days_moves_arrival_past_midnight() {
        let now = datetime!(2026-04-20 21:00 UTC);
        let mut record = AlarmRecord::with_defaults(now).unwrap();
        record.alarm = ClockTime::new(1, 23, 0);
        record.arrival = ClockTime::new(1, 0, 30);

        record.adjust_days(now).unwrap();

        assert_eq!(record.alarm.day_of_year, now.ordinal());
        assert_eq!(record.arrival.day_of_year, now.ordinal() + 1);
        assert_eq!(record.arrival_at - record.alarm_at, Duration::minutes(90));
    }

    #[test]
    fn adjust_days_skips_to_selected_weekday() {
        // Wednesday evening; Thursday is not a repeat day.
        let now = datetime!(2026-06-10 21:30 UTC);
        let mut record = AlarmRecord::with_defaults(now).unwrap();
        record.repeat_days = DaysOfWeek::MONDAY | DaysOfWeek::FRIDAY;

        record.adjust_days(now).unwrap();

        assert_eq!(
            record.alarm_at.to_datetime(UtcOffset::UTC),
            datetime!(2026-06-12 06:00 UTC)
        );
        assert_eq!(
            record.arrival_at.to_datetime(UtcOffset::UTC),
            datetime!(2026-06-12 07:00 UTC)
        );
        assert_eq!(record.alarm.day_of_year, 163);
    }

    #[test]
    fn adjust_days_keeps_selected_tomorrow() {
        let now = datetime!(2026-06-10 21:30 UTC);
        let mut record = AlarmRecord::with_defaults(now).unwrap();
        record.repeat_days = DaysOfWeek::THURSDAY;

        record.adjust_days(now).unwrap();

        assert_eq!(
            record.alarm_at.to_datetime(UtcOffset::UTC),
            datetime!(2026-06-11 06:00 UTC)
        );
    }

    #[test]
    fn one_shot_does_not_advance() {
        let mut record = AlarmRecord::with_defaults(datetime!(2026-04-20 12:00 UTC)).unwrap();
        let before = record.clone();
        assert!(!record.next_repeat_after(UtcOffset::UTC));
        assert_eq!(record, before);
    }

    #[test]
    fn repeating_alarm_advances_to_next_weekday() {
        // 2026-04-24 is a Friday; the next weekday is Monday the 27th.
        let now = datetime!(2026-04-23 12:00 UTC);
        let mut record = AlarmRecord::with_defaults(now).unwrap();
        record.repeat_days = DaysOfWeek::MONDAY | DaysOfWeek::FRIDAY;

        assert!(record.next_repeat_after(UtcOffset::UTC));
        assert_eq!(
            record.alarm_at.to_datetime(UtcOffset::UTC),
            datetime!(2026-04-27 06:00 UTC)
        );
        assert_eq!(
            record.arrival_at.to_datetime(UtcOffset::UTC),
            datetime!(2026-04-27 07:00 UTC)
        );
        assert_eq!(record.alarm.day_of_year, 117);
    }

    #[test]
    fn slots_share_request_code() {
        let record = AlarmRecord::with_defaults(datetime!(2026-04-20 12:00 UTC)).unwrap();
        assert_eq!(record.alarm_slot().request_code, record.request_code);
        assert_eq!(record.poll_slot().request_code, record.request_code);
        assert_ne!(record.alarm_slot(), record.poll_slot());
    }
}

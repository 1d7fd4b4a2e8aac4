//! Weekday repeat set.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use time::Weekday;

/// The days an alarm repeats on. Bit 0 is Monday, bit 6 is Sunday.
///
/// An empty set means the alarm is one-shot. The serialized form is the raw
/// 7-bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DaysOfWeek(u8);

bitflags! {
    impl DaysOfWeek: u8 {
        const MONDAY = 1 << 0;
        const TUESDAY = 1 << 1;
        const WEDNESDAY = 1 << 2;
        const THURSDAY = 1 << 3;
        const FRIDAY = 1 << 4;
        const SATURDAY = 1 << 5;
        const SUNDAY = 1 << 6;
    }
}

const ORDER: [(DaysOfWeek, &str, &str); 7] = [
    (DaysOfWeek::MONDAY, "Mon", "Monday"),
    (DaysOfWeek::TUESDAY, "Tue", "Tuesday"),
    (DaysOfWeek::WEDNESDAY, "Wed", "Wednesday"),
    (DaysOfWeek::THURSDAY, "Thu", "Thursday"),
    (DaysOfWeek::FRIDAY, "Fri", "Friday"),
    (DaysOfWeek::SATURDAY, "Sat", "Saturday"),
    (DaysOfWeek::SUNDAY, "Sun", "Sunday"),
];

impl DaysOfWeek {
    /// Build from a stored mask, dropping any bit above Sunday.
    pub fn from_coded(mask: u8) -> Self {
        Self::from_bits_truncate(mask)
    }

    pub fn coded(self) -> u8 {
        self.bits()
    }

    pub fn is_repeating(self) -> bool {
        !self.is_empty()
    }

    pub fn from_weekday(day: Weekday) -> Self {
        match day {
            Weekday::Monday => Self::MONDAY,
            Weekday::Tuesday => Self::TUESDAY,
            Weekday::Wednesday => Self::WEDNESDAY,
            Weekday::Thursday => Self::THURSDAY,
            Weekday::Friday => Self::FRIDAY,
            Weekday::Saturday => Self::SATURDAY,
            Weekday::Sunday => Self::SUNDAY,
        }
    }

    pub fn includes(self, day: Weekday) -> bool {
        self.contains(Self::from_weekday(day))
    }

    /// Number of days after `from` until the next selected weekday, in
    /// `1..=7`. `None` for a one-shot set.
    pub fn days_until_next(self, from: Weekday) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let mut day = from;
        for offset in 1..=7 {
            day = day.next();
            if self.includes(day) {
                return Some(offset);
            }
        }
        None
    }

    /// Human-readable form. `show_never` controls whether an empty set
    /// renders as "Never" or as an empty string.
    pub fn describe(self, show_never: bool) -> String {
        if self.is_empty() {
            return if show_never { "Never".into() } else { String::new() };
        }
        if self.is_all() {
            return "every day".into();
        }

        let long_form = self.bits().count_ones() == 1;
        ORDER
            .iter()
            .filter(|(flag, _, _)| self.contains(*flag))
            .map(|(_, short, long)| if long_form { *long } else { *short })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for DaysOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(true))
    }
}

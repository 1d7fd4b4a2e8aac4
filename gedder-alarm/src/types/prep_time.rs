use std::fmt;

use serde::{Deserialize, Serialize};
use time::Duration;

use crate::error::{Error, Result};

/// Time the user needs between waking up and walking out the door.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrepTime {
    hours: u8,
    minutes: u8,
}

impl PrepTime {
    pub const ZERO: Self = Self {
        hours: 0,
        minutes: 0,
    };

    pub fn new(hours: u8, minutes: u8) -> Result<Self> {
        if hours > 23 || minutes > 59 {
            return Err(Error::InvalidParameters(format!(
                "prep time {hours}h{minutes}m out of range"
            )));
        }
        Ok(Self { hours, minutes })
    }

    pub fn hours(self) -> u8 {
        self.hours
    }

    pub fn minutes(self) -> u8 {
        self.minutes
    }

    pub fn as_duration(self) -> Duration {
        Duration::hours(i64::from(self.hours)) + Duration::minutes(i64::from(self.minutes))
    }
}

impl fmt::Display for PrepTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h{:02}m", self.hours, self.minutes)
    }
}

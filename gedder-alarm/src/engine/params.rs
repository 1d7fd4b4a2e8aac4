use serde::{Deserialize, Serialize};

use crate::alarm_manager::{CallbackKind, Slot};
use crate::error::{Error, Result};
use crate::record::{AlarmId, AlarmRecord, TransitMode, TravelMode};
use crate::travel::{RouteQuery, TravelSample};
use crate::types::{PrepTime, Timestamp};

/// Everything one poll cycle needs, carried in the callback payload.
///
/// A cycle's output is the next cycle's complete input: the re-armed
/// callback gets a copy of these parameters with `last_sample` refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollCycleParameters {
    pub alarm_id: AlarmId,
    pub request_code: u32,

    /// Provider place references.
    pub origin: String,
    pub destination: String,

    pub travel_mode: TravelMode,
    pub transit_mode: TransitMode,

    pub arrival_at: Timestamp,
    pub prep_time: PrepTime,

    /// The plain alarm instant. Doubles as the loop's hard deadline.
    pub alarm_at: Timestamp,

    /// Most recent successful answer, used when the provider fails.
    pub last_sample: Option<TravelSample>,
}

impl PollCycleParameters {
    pub fn from_record(record: &AlarmRecord) -> Self {
        Self {
            alarm_id: record.id,
            request_code: record.request_code,
            origin: record.origin.id.clone(),
            destination: record.destination.id.clone(),
            travel_mode: record.travel_mode,
            transit_mode: record.transit_mode,
            arrival_at: record.arrival_at,
            prep_time: record.prep_time,
            alarm_at: record.alarm_at,
            last_sample: None,
        }
    }

    /// Reject parameters no cycle can run on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(Error::InvalidParameters(format!(
                "alarm {}: {reason}",
                self.alarm_id
            )))
        };

        if self.alarm_id.is_nil() {
            return invalid("missing alarm id");
        }
        if self.origin.is_empty() || self.destination.is_empty() {
            return invalid("missing origin or destination");
        }
        if self.arrival_at <= Timestamp::EPOCH || self.alarm_at <= Timestamp::EPOCH {
            return invalid("missing arrival or alarm time");
        }
        if self.arrival_at < self.alarm_at {
            return invalid("arrival is before the alarm");
        }
        Ok(())
    }

    pub fn route_query(&self) -> RouteQuery {
        RouteQuery {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            arrive_by: self.arrival_at,
            depart_at: None,
            travel_mode: self.travel_mode,
            transit_mode: self.transit_mode,
        }
    }

    pub fn with_sample(mut self, sample: TravelSample) -> Self {
        self.last_sample = Some(sample);
        self
    }

    pub fn poll_slot(&self) -> Slot {
        Slot::new(self.request_code, CallbackKind::Poll)
    }

    pub fn alarm_slot(&self) -> Slot {
        Slot::new(self.request_code, CallbackKind::Alarm)
    }
}

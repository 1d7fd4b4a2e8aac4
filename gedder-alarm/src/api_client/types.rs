//! API data transfer objects.
//!
//! These types define the API contract shared between the server and
//! clients. Instants are epoch milliseconds; times of day are "HH:MM".

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct PlaceState {
    /// Provider place reference.
    pub id: String,
    pub address: String,
}

/// One alarm as stored.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct AlarmState {
    pub id: String,
    pub origin: PlaceState,
    pub destination: PlaceState,
    pub travel_mode: String,
    pub transit_mode: String,
    /// Weekday mask, Monday = bit 0.
    pub repeat_days: u8,
    /// Readable form of `repeat_days`.
    pub repeats: String,
    pub alarm_time: String,
    pub alarm_at: i64,
    pub arrival_time: String,
    pub arrival_at: i64,
    pub prep_minutes: u16,
    pub alarm_armed: bool,
    pub smart_armed: bool,
}

/// Fields to set on create or change on patch. Absent fields are left
/// alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct AlarmPatchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<PlaceState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PlaceState>,
    /// driving | transit | walking | bicycling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_mode: Option<String>,
    /// bus | subway | train | tram | rail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transit_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_days: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_minutes: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_armed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smart_armed: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct SnoozeResponse {
    /// When the alarm rings again.
    pub until: i64,
}

/// One armed callback.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct ScheduledCallback {
    pub request_code: u32,
    /// alarm | poll
    pub kind: String,
    pub at: i64,
}

//! Directions response parsing.
//!
//! Only the first leg of the first route is read: the query never asks for
//! alternatives or waypoints.

use serde::Deserialize;

use super::{ProviderError, TravelSample};

/// Longest trip estimate taken at face value. Anything beyond is a broken
/// answer, not a route.
pub const MAX_TRAVEL_SECS: i64 = 7 * 24 * 60 * 60;

/// Top-level `status` of a directions response.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectionsStatus {
    Ok,
    NotFound,
    ZeroResults,
    MaxWaypointsExceeded,
    MaxRouteLengthExceeded,
    InvalidRequest,
    OverQueryLimit,
    RequestDenied,
    UnknownError,
}

impl DirectionsStatus {
    /// Anything the service sends that isn't a known code is an unknown
    /// error.
    pub fn from_code(code: &str) -> Self {
        code.parse().unwrap_or(Self::UnknownError)
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    duration: Option<Value>,
    duration_in_traffic: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Value {
    value: i64,
}

/// Turn a response body into a sample, or the reason there isn't one.
pub fn parse_response(body: &str) -> Result<TravelSample, ProviderError> {
    let response: Response =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let status = response
        .status
        .as_deref()
        .map(DirectionsStatus::from_code)
        .ok_or_else(|| ProviderError::Malformed("missing status".into()))?;
    let message = response.error_message.unwrap_or_default();
    if !message.is_empty() || status != DirectionsStatus::Ok {
        return Err(ProviderError::Api { status, message });
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("no routes".into()))?;
    let leg = route
        .legs
        .first()
        .ok_or_else(|| ProviderError::Malformed("route has no legs".into()))?;
    let duration = leg
        .duration
        .as_ref()
        .ok_or_else(|| ProviderError::Malformed("leg has no duration".into()))?;

    let duration_secs = checked_secs("duration", duration)?;
    let duration_in_traffic_secs = leg
        .duration_in_traffic
        .as_ref()
        .map(|v| checked_secs("duration_in_traffic", v))
        .transpose()?;

    Ok(TravelSample {
        duration_secs,
        duration_in_traffic_secs,
        warnings: route.warnings,
    })
}

fn checked_secs(field: &str, value: &Value) -> Result<i64, ProviderError> {
    if (0..=MAX_TRAVEL_SECS).contains(&value.value) {
        Ok(value.value)
    } else {
        Err(ProviderError::Malformed(format!(
            "{field} of {}s out of range",
            value.value
        )))
    }
}

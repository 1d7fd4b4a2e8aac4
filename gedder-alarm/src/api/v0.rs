//! API v0 endpoints.
//!
//! Version 0 signals an unstable API -- breaking changes are expected
//! until the alarm reaches 1.0.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::server::SharedState;
use crate::api_client::types::{
    AlarmPatchRequest, AlarmState, PlaceState, ScheduledCallback, SnoozeResponse,
};
use crate::error::Error;
use crate::record::{AlarmId, AlarmRecord, Place, TransitMode, TravelMode};
use crate::service::AlarmEdit;
use crate::store::StoreError;
use crate::tracing::prelude::*;
use crate::types::{ClockTime, DaysOfWeek, PrepTime};

type ApiError = (StatusCode, String);

/// Build the v0 API routes with OpenAPI metadata.
pub fn routes() -> OpenApiRouter<SharedState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .routes(routes!(list_alarms, create_alarm))
        .routes(routes!(get_alarm, patch_alarm, delete_alarm))
        .routes(routes!(snooze_alarm))
        .routes(routes!(get_schedule))
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = OK, description = "Server is running", body = String),
    ),
)]
async fn health() -> &'static str {
    "OK"
}

/// Return every stored alarm.
#[utoipa::path(
    get,
    path = "/alarms",
    tag = "alarms",
    responses(
        (status = OK, description = "All alarms", body = Vec<AlarmState>),
        (status = INTERNAL_SERVER_ERROR, description = "Store error"),
    ),
)]
async fn list_alarms(State(state): State<SharedState>) -> Result<Json<Vec<AlarmState>>, ApiError> {
    let records = state.service.list_alarms().await.map_err(api_error)?;
    Ok(Json(records.iter().map(alarm_state).collect()))
}

/// Create an alarm from the defaults plus the given fields.
#[utoipa::path(
    post,
    path = "/alarms",
    tag = "alarms",
    request_body = AlarmPatchRequest,
    responses(
        (status = CREATED, description = "Created alarm", body = AlarmState),
        (status = BAD_REQUEST, description = "Malformed field"),
        (status = UNPROCESSABLE_ENTITY, description = "Smart mode without a route"),
    ),
)]
async fn create_alarm(
    State(state): State<SharedState>,
    Json(req): Json<AlarmPatchRequest>,
) -> Result<(StatusCode, Json<AlarmState>), ApiError> {
    let edit = alarm_edit(&req)?;
    let record = state.service.create_alarm(edit).await.map_err(api_error)?;
    let record = apply_flags(&state, record, &req).await?;
    Ok((StatusCode::CREATED, Json(alarm_state(&record))))
}

/// Return a single alarm, or 404 if not found.
#[utoipa::path(
    get,
    path = "/alarms/{id}",
    tag = "alarms",
    params(
        ("id" = String, Path, description = "Alarm id"),
    ),
    responses(
        (status = OK, description = "Alarm details", body = AlarmState),
        (status = BAD_REQUEST, description = "Malformed id"),
        (status = NOT_FOUND, description = "Alarm not found"),
    ),
)]
async fn get_alarm(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<AlarmState>, ApiError> {
    let id = parse_id(&id)?;
    let record = state.service.get_alarm(id).await.map_err(api_error)?;
    Ok(Json(alarm_state(&record)))
}

/// Apply partial updates to an alarm, then its armed flags.
#[utoipa::path(
    patch,
    path = "/alarms/{id}",
    tag = "alarms",
    params(
        ("id" = String, Path, description = "Alarm id"),
    ),
    request_body = AlarmPatchRequest,
    responses(
        (status = OK, description = "Updated alarm", body = AlarmState),
        (status = BAD_REQUEST, description = "Malformed field"),
        (status = NOT_FOUND, description = "Alarm not found"),
        (status = UNPROCESSABLE_ENTITY, description = "Smart mode without a route"),
    ),
)]
async fn patch_alarm(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<AlarmPatchRequest>,
) -> Result<Json<AlarmState>, ApiError> {
    let id = parse_id(&id)?;
    let edit = alarm_edit(&req)?;

    let record = if edit == AlarmEdit::default() {
        state.service.get_alarm(id).await
    } else {
        state.service.edit_alarm(id, edit).await
    }
    .map_err(api_error)?;

    let record = apply_flags(&state, record, &req).await?;
    Ok(Json(alarm_state(&record)))
}

/// Delete an alarm and cancel anything it has armed.
#[utoipa::path(
    delete,
    path = "/alarms/{id}",
    tag = "alarms",
    params(
        ("id" = String, Path, description = "Alarm id"),
    ),
    responses(
        (status = NO_CONTENT, description = "Alarm deleted"),
        (status = NOT_FOUND, description = "Alarm not found"),
    ),
)]
async fn delete_alarm(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.service.delete_alarm(id).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ring the alarm again in ten minutes.
#[utoipa::path(
    post,
    path = "/alarms/{id}/snooze",
    tag = "alarms",
    params(
        ("id" = String, Path, description = "Alarm id"),
    ),
    responses(
        (status = OK, description = "Snoozed", body = SnoozeResponse),
        (status = NOT_FOUND, description = "Alarm not found"),
    ),
)]
async fn snooze_alarm(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SnoozeResponse>, ApiError> {
    let id = parse_id(&id)?;
    let until = state.service.snooze(id).await.map_err(api_error)?;
    Ok(Json(SnoozeResponse {
        until: until.as_millis(),
    }))
}

/// Return every armed callback, soonest slot first.
#[utoipa::path(
    get,
    path = "/schedule",
    tag = "schedule",
    responses(
        (status = OK, description = "Armed callbacks", body = Vec<ScheduledCallback>),
    ),
)]
async fn get_schedule(State(state): State<SharedState>) -> Json<Vec<ScheduledCallback>> {
    Json(
        state
            .service
            .schedule()
            .into_iter()
            .map(|pending| ScheduledCallback {
                request_code: pending.slot.request_code,
                kind: pending.slot.kind.to_string(),
                at: pending.at.as_millis(),
            })
            .collect(),
    )
}

async fn apply_flags(
    state: &SharedState,
    mut record: AlarmRecord,
    req: &AlarmPatchRequest,
) -> Result<AlarmRecord, ApiError> {
    if let Some(armed) = req.alarm_armed {
        record = state
            .service
            .set_alarm_armed(record.id, armed)
            .await
            .map_err(api_error)?;
    }
    if let Some(armed) = req.smart_armed {
        record = state
            .service
            .set_smart_armed(record.id, armed)
            .await
            .map_err(api_error)?;
    }
    Ok(record)
}

fn api_error(err: Error) -> ApiError {
    let status = match &err {
        Error::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        Error::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
        Error::InvalidParameters(_) | Error::TimeRange(_) => StatusCode::BAD_REQUEST,
        Error::NotEligible(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => {
            error!(error = %err, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, message.into())
}

fn parse_id(id: &str) -> Result<AlarmId, ApiError> {
    AlarmId::from_str(id).map_err(|e| bad_request(format!("invalid alarm id {id:?}: {e}")))
}

/// Parse "HH:MM".
fn parse_time_of_day(value: &str) -> Result<(u8, u8), ApiError> {
    let invalid = || bad_request(format!("invalid time of day {value:?}, expected HH:MM"));
    let (hour, minute) = value.split_once(':').ok_or_else(invalid)?;
    let hour: u8 = hour.parse().map_err(|_| invalid())?;
    let minute: u8 = minute.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

fn alarm_edit(req: &AlarmPatchRequest) -> Result<AlarmEdit, ApiError> {
    let travel_mode = req
        .travel_mode
        .as_deref()
        .map(|mode| {
            TravelMode::from_str(mode).map_err(|_| bad_request(format!("unknown travel mode {mode:?}")))
        })
        .transpose()?;
    let transit_mode = req
        .transit_mode
        .as_deref()
        .map(|mode| {
            TransitMode::from_str(mode)
                .map_err(|_| bad_request(format!("unknown transit mode {mode:?}")))
        })
        .transpose()?;
    let prep_time = req
        .prep_minutes
        .map(|minutes| {
            let hours = u8::try_from(minutes / 60)
                .map_err(|_| bad_request(format!("prep time {minutes} minutes out of range")))?;
            // Remainder is always below 60.
            PrepTime::new(hours, (minutes % 60) as u8).map_err(|e| bad_request(e.to_string()))
        })
        .transpose()?;

    Ok(AlarmEdit {
        origin: req.origin.as_ref().map(place),
        destination: req.destination.as_ref().map(place),
        travel_mode,
        transit_mode,
        repeat_days: req.repeat_days.map(DaysOfWeek::from_coded),
        alarm_time: req.alarm_time.as_deref().map(parse_time_of_day).transpose()?,
        arrival_time: req.arrival_time.as_deref().map(parse_time_of_day).transpose()?,
        prep_time,
    })
}

fn place(state: &PlaceState) -> Place {
    Place::new(&state.id, &state.address)
}

fn place_state(place: &Place) -> PlaceState {
    PlaceState {
        id: place.id.clone(),
        address: place.address.clone(),
    }
}

fn time_of_day(time: ClockTime) -> String {
    format!("{:02}:{:02}", time.hour, time.minute)
}

fn alarm_state(record: &AlarmRecord) -> AlarmState {
    AlarmState {
        id: record.id.to_string(),
        origin: place_state(&record.origin),
        destination: place_state(&record.destination),
        travel_mode: record.travel_mode.to_string(),
        transit_mode: record.transit_mode.to_string(),
        repeat_days: record.repeat_days.coded(),
        repeats: record.repeat_days.to_string(),
        alarm_time: time_of_day(record.alarm),
        alarm_at: record.alarm_at.as_millis(),
        arrival_time: time_of_day(record.arrival),
        arrival_at: record.arrival_at.as_millis(),
        prep_minutes: u16::from(record.prep_time.hours()) * 60
            + u16::from(record.prep_time.minutes()),
        alarm_armed: record.alarm_armed,
        smart_armed: record.smart_armed,
    }
}

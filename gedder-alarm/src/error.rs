//! Crate-level error type.
//!
//! Module seams carry their own error enums ([`StoreError`],
//! [`SchedulingError`], [`ProviderError`](crate::travel::ProviderError)).
//! This type is what the engine, recovery, and service layers return.
//! Provider failures never show up here: the engine turns them into a
//! conservative re-arm instead.

use thiserror::Error;

use crate::alarm_manager::SchedulingError;
use crate::record::AlarmId;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    /// A poll or trigger invocation arrived with unusable parameters.
    /// Always a caller bug.
    #[error("Invalid invocation parameters: {0}")]
    InvalidParameters(String),

    /// Smart mode was requested on a record without both addresses.
    #[error("Alarm {0} is not eligible for smart mode (origin and destination required)")]
    NotEligible(AlarmId),

    #[error("Time out of range: {0}")]
    TimeRange(#[from] time::error::ComponentRange),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Alarm Scheduling Capability.
//!
//! Arms one-shot callbacks at absolute instants, addressed by [`Slot`].
//! Re-arming a slot replaces whatever was pending there; cancelling a slot
//! stops future firings but cannot reach into an invocation that is already
//! running.
//!
//! Each record owns two slots that share its request code: one for the
//! plain alarm and one for the polling loop. Keeping them apart means the
//! loop re-arming itself never displaces the fallback alarm underneath it.

mod timer;

pub use timer::{FiredCallback, TimerAlarmManager};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::PollCycleParameters;
use crate::trigger::TriggerRequest;
use crate::types::Timestamp;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CallbackKind {
    Alarm,
    Poll,
}

/// The handle one pending callback is armed and cancelled by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    pub request_code: u32,
    pub kind: CallbackKind,
}

impl Slot {
    pub const fn new(request_code: u32, kind: CallbackKind) -> Self {
        Self { request_code, kind }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.request_code, self.kind)
    }
}

/// What a fired callback asks for.
///
/// Each variant carries the complete input of the invocation it starts;
/// nothing else survives between cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "callback", rename_all = "snake_case")]
pub enum Callback {
    Poll(PollCycleParameters),
    Trigger(TriggerRequest),
}

/// A serialized [`Callback`], as handed to the scheduling capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(String);

impl Payload {
    pub fn encode(callback: &Callback) -> Result<Self, SchedulingError> {
        serde_json::to_string(callback)
            .map(Self)
            .map_err(|e| SchedulingError::Payload(e.to_string()))
    }

    pub fn decode(&self) -> Result<Callback, SchedulingError> {
        serde_json::from_str(&self.0).map_err(|e| SchedulingError::Payload(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One armed, not yet fired callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCallback {
    pub slot: Slot,
    pub at: Timestamp,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Scheduling capability is closed")]
    Closed,

    #[error("Scheduling request rejected: {0}")]
    Rejected(String),

    #[error("Callback payload unusable: {0}")]
    Payload(String),
}

#[async_trait]
pub trait AlarmManager: Send + Sync {
    /// Arm `slot` to fire at `at`. Replaces any pending schedule for the
    /// slot; arming again with the same instant and payload is a no-op.
    async fn arm(&self, slot: Slot, at: Timestamp, payload: Payload)
    -> Result<(), SchedulingError>;

    /// Cancel whatever is pending on `slot`. Cancelling an idle slot is not
    /// an error.
    async fn cancel(&self, slot: Slot) -> Result<(), SchedulingError>;

    /// Snapshot of everything currently armed, ordered by slot.
    fn pending(&self) -> Vec<PendingCallback>;

    async fn arm_callback(
        &self,
        slot: Slot,
        at: Timestamp,
        callback: &Callback,
    ) -> Result<(), SchedulingError> {
        let payload = Payload::encode(callback)?;
        self.arm(slot, at, payload).await
    }
}

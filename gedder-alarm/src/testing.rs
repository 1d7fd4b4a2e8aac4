//! Test doubles shared by the unit tests.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use time::{Duration, UtcOffset};

use crate::alarm_manager::{
    AlarmManager, Callback, Payload, PendingCallback, SchedulingError, Slot,
};
use crate::clock::Clock;
use crate::travel::{ProviderError, RouteQuery, TravelSample, TravelTimeProvider};
use crate::types::Timestamp;

/// A clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<Timestamp>,
    offset: UtcOffset,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
            offset: UtcOffset::UTC,
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }

    fn local_offset(&self) -> UtcOffset {
        self.offset
    }
}

/// Provider that replays queued answers in order and records every query.
///
/// Once the script runs out every query fails with a transport error.
#[derive(Default)]
pub struct ScriptedProvider {
    answers: Mutex<VecDeque<Result<TravelSample, ProviderError>>>,
    queries: Mutex<Vec<RouteQuery>>,
    delay: Option<std::time::Duration>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every answer arrives after `delay` of tokio time.
    pub fn with_delay(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, answer: Result<TravelSample, ProviderError>) {
        self.answers.lock().push_back(answer);
    }

    pub fn push_minutes(&self, minutes: i64) {
        self.push(Ok(TravelSample::new(minutes * 60)));
    }

    pub fn queries(&self) -> Vec<RouteQuery> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl TravelTimeProvider for ScriptedProvider {
    async fn estimate(&self, query: &RouteQuery) -> Result<TravelSample, ProviderError> {
        self.queries.lock().push(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answers
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Transport("script exhausted".into())))
    }
}

#[derive(Default)]
struct Recorded {
    pending: BTreeMap<Slot, (Timestamp, Payload)>,
    arm_calls: usize,
    cancels: Vec<Slot>,
    fail_arms: bool,
}

/// Scheduling capability that keeps armed callbacks in a map instead of
/// running timers.
#[derive(Default)]
pub struct RecordingAlarmManager {
    state: Mutex<Recorded>,
}

impl RecordingAlarmManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `arm` fail.
    pub fn fail_arms(&self) {
        self.state.lock().fail_arms = true;
    }

    pub fn armed(&self, slot: Slot) -> Option<(Timestamp, Callback)> {
        self.state
            .lock()
            .pending
            .get(&slot)
            .map(|(at, payload)| (*at, payload.decode().unwrap()))
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn arm_calls(&self) -> usize {
        self.state.lock().arm_calls
    }

    pub fn cancels(&self) -> Vec<Slot> {
        self.state.lock().cancels.clone()
    }
}

#[async_trait]
impl AlarmManager for RecordingAlarmManager {
    async fn arm(&self, slot: Slot, at: Timestamp, payload: Payload) -> Result<(), SchedulingError> {
        let mut state = self.state.lock();
        if state.fail_arms {
            return Err(SchedulingError::Rejected("scripted failure".into()));
        }
        state.arm_calls += 1;
        state.pending.insert(slot, (at, payload));
        Ok(())
    }

    async fn cancel(&self, slot: Slot) -> Result<(), SchedulingError> {
        let mut state = self.state.lock();
        state.cancels.push(slot);
        state.pending.remove(&slot);
        Ok(())
    }

    fn pending(&self) -> Vec<PendingCallback> {
        self.state
            .lock()
            .pending
            .iter()
            .map(|(slot, (at, _))| PendingCallback {
                slot: *slot,
                at: *at,
            })
            .collect()
    }
}

//! Tokio-backed scheduling capability.
//!
//! Every armed slot is a spawned task sleeping until its instant. When it
//! wakes it checks that it is still the current schedule for its slot (a
//! re-arm bumps the generation) and then hands a [`FiredCallback`] to the
//! dispatcher over an mpsc channel.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{AlarmManager, Payload, PendingCallback, SchedulingError, Slot};
use crate::clock::Clock;
use crate::tracing::prelude::*;
use crate::types::Timestamp;

const FIRED_CHANNEL_CAPACITY: usize = 64;

/// A callback whose instant has arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredCallback {
    pub slot: Slot,
    pub at: Timestamp,
    pub payload: Payload,
}

struct Pending {
    at: Timestamp,
    payload: Payload,
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct State {
    pending: HashMap<Slot, Pending>,
    next_generation: u64,
}

pub struct TimerAlarmManager {
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<State>>,
    fired_tx: mpsc::Sender<FiredCallback>,
}

impl TimerAlarmManager {
    /// Create the manager and the receiver fired callbacks are delivered on.
    pub fn new(clock: Arc<dyn Clock>) -> (Self, mpsc::Receiver<FiredCallback>) {
        let (fired_tx, fired_rx) = mpsc::channel(FIRED_CHANNEL_CAPACITY);
        let manager = Self {
            clock,
            state: Arc::new(Mutex::new(State::default())),
            fired_tx,
        };
        (manager, fired_rx)
    }

    fn spawn_timer(
        &self,
        slot: Slot,
        at: Timestamp,
        payload: Payload,
        generation: u64,
        token: CancellationToken,
    ) {
        let delay = at.saturating_until(self.clock.now());
        let state = Arc::clone(&self.state);
        let fired_tx = self.fired_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!(slot = %slot, "Timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let current = {
                        let mut state = state.lock();
                        match state.pending.get(&slot) {
                            Some(p) if p.generation == generation => state.pending.remove(&slot),
                            _ => None,
                        }
                    };
                    if current.is_none() {
                        return;
                    }

                    debug!(slot = %slot, at = %at, "Callback fired");
                    if fired_tx.send(FiredCallback { slot, at, payload }).await.is_err() {
                        warn!(slot = %slot, "Dispatcher gone, fired callback dropped");
                    }
                }
            }
        });
    }
}

#[async_trait]
impl AlarmManager for TimerAlarmManager {
    async fn arm(&self, slot: Slot, at: Timestamp, payload: Payload) -> Result<(), SchedulingError> {
        if self.fired_tx.is_closed() {
            return Err(SchedulingError::Closed);
        }

        // Registered before the timer task exists, so a zero delay can't
        // wake up to an empty slot.
        let (generation, token) = {
            let mut state = self.state.lock();
            if let Some(existing) = state.pending.get(&slot) {
                if existing.at == at && existing.payload == payload {
                    trace!(slot = %slot, at = %at, "Identical re-arm ignored");
                    return Ok(());
                }
            }
            if let Some(previous) = state.pending.remove(&slot) {
                previous.cancel.cancel();
            }
            state.next_generation += 1;
            let generation = state.next_generation;
            let token = CancellationToken::new();
            state.pending.insert(
                slot,
                Pending {
                    at,
                    payload: payload.clone(),
                    generation,
                    cancel: token.clone(),
                },
            );
            (generation, token)
        };

        self.spawn_timer(slot, at, payload, generation, token);

        debug!(slot = %slot, at = %at, "Callback armed");
        Ok(())
    }

    async fn cancel(&self, slot: Slot) -> Result<(), SchedulingError> {
        if let Some(previous) = self.state.lock().pending.remove(&slot) {
            previous.cancel.cancel();
            debug!(slot = %slot, "Callback cancelled");
        }
        Ok(())
    }

    fn pending(&self) -> Vec<PendingCallback> {
        let mut pending: Vec<_> = self
            .state
            .lock()
            .pending
            .iter()
            .map(|(slot, p)| PendingCallback {
                slot: *slot,
                at: p.at,
            })
            .collect();
        pending.sort_by_key(|p| p.slot);
        pending
    }
}

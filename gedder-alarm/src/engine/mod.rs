//! Polling Decision Engine.
//!
//! Each invocation is one discrete step: ask the provider how long the trip
//! takes, work out when the user has to be woken, and either arm the next
//! poll or escalate to the plain alarm. The loop exists only as the chain of
//! callbacks each step arms for the next; nothing is held in memory between
//! steps.
//!
//! ```text
//! Idle -> Armed -> Polling -> Armed (re-armed)
//!                          -> Escalated (alarm fires now)
//! ```

mod config;
mod frequency;
mod params;

pub use config::{DurationBasis, EngineConfig};
pub use frequency::select_delay;
pub use params::PollCycleParameters;

use std::sync::Arc;

use time::Duration;

use crate::alarm_manager::{AlarmManager, Callback};
use crate::clock::Clock;
use crate::error::Result;
use crate::record::AlarmRecord;
use crate::store::{AlarmStore, StoreError};
use crate::tracing::prelude::*;
use crate::travel::{ProviderError, TravelSample, TravelTimeProvider};
use crate::trigger::{TriggerRequest, TriggerSource};
use crate::types::{PrepTime, Timestamp};

/// The latest instant the user can be woken and still arrive on time.
pub fn optimal_wake_up(
    arrival: Timestamp,
    duration: Duration,
    padding: Duration,
    prep: PrepTime,
) -> Timestamp {
    arrival - duration.saturating_add(padding) - prep.as_duration()
}

/// What one step worked out. Lives only for the duration of the step.
#[derive(Debug, Clone, PartialEq)]
pub struct PollCycleState {
    pub now: Timestamp,

    /// This step's provider answer. `None` when the query failed.
    pub sample: Option<TravelSample>,

    /// Travel estimate the deadline was computed from, if any.
    pub duration: Option<Duration>,
    pub optimal_wake_up: Option<Timestamp>,
    pub time_until_alarm: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Poll again at `at` with `params`.
    Rearm {
        at: Timestamp,
        params: PollCycleParameters,
    },

    /// Fire the plain alarm now.
    Escalate { request: TriggerRequest },
}

/// What a completed step actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Rearmed { at: Timestamp },
    Escalated { at: Timestamp },

    /// The record was deleted or smart mode was turned off while the step
    /// ran; nothing was armed.
    Abandoned,
}

pub struct PollingEngine {
    provider: Arc<dyn TravelTimeProvider>,
    store: Arc<dyn AlarmStore>,
    alarms: Arc<dyn AlarmManager>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl PollingEngine {
    pub fn new(
        provider: Arc<dyn TravelTimeProvider>,
        store: Arc<dyn AlarmStore>,
        alarms: Arc<dyn AlarmManager>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            store,
            alarms,
            clock,
            config,
        }
    }

    /// Start the loop for `record` by arming its poll slot at the current
    /// instant.
    pub async fn start(&self, record: &AlarmRecord) -> Result<()> {
        let params = PollCycleParameters::from_record(record);
        params.validate()?;
        let now = self.clock.now();
        self.alarms
            .arm_callback(params.poll_slot(), now, &Callback::Poll(params))
            .await?;
        info!(alarm_id = %record.id, slot = %record.poll_slot(), "Smart polling started");
        Ok(())
    }

    /// The pure decision step.
    ///
    /// A provider failure never escalates: the loop polls again after the
    /// delay the table gives for the previous sample's worst case, or after
    /// the configured failure delay when there is no previous sample. The
    /// plain alarm still rings at its own instant either way.
    pub fn decide(
        &self,
        params: &PollCycleParameters,
        answer: std::result::Result<TravelSample, ProviderError>,
        now: Timestamp,
    ) -> (PollCycleState, Decision) {
        match answer {
            Ok(sample) => {
                let duration = self.config.duration_basis.pick(&sample);
                let optimal = optimal_wake_up(
                    params.arrival_at,
                    duration,
                    self.config.padding,
                    params.prep_time,
                );
                let time_until_alarm = optimal - now;
                let state = PollCycleState {
                    now,
                    sample: Some(sample.clone()),
                    duration: Some(duration),
                    optimal_wake_up: Some(optimal),
                    time_until_alarm: Some(time_until_alarm),
                };

                // Either condition alone is enough to wake the user.
                let decision = if now > optimal || now > params.alarm_at {
                    Decision::Escalate {
                        request: TriggerRequest {
                            alarm_id: params.alarm_id,
                            request_code: params.request_code,
                            source: TriggerSource::Escalation,
                            sample: Some(sample),
                        },
                    }
                } else {
                    Decision::Rearm {
                        at: now + select_delay(time_until_alarm),
                        params: params.clone().with_sample(sample),
                    }
                };
                (state, decision)
            }
            Err(error) => {
                warn!(alarm_id = %params.alarm_id, error = %error, "Travel-time query failed");

                let (delay, duration, optimal, time_until_alarm) = match &params.last_sample {
                    Some(previous) => {
                        let duration = previous.worst_case();
                        let optimal = optimal_wake_up(
                            params.arrival_at,
                            duration,
                            self.config.padding,
                            params.prep_time,
                        );
                        let time_until_alarm = optimal - now;
                        (
                            select_delay(time_until_alarm),
                            Some(duration),
                            Some(optimal),
                            Some(time_until_alarm),
                        )
                    }
                    None => (self.config.failure_delay, None, None, None),
                };

                let state = PollCycleState {
                    now,
                    sample: None,
                    duration,
                    optimal_wake_up: optimal,
                    time_until_alarm,
                };
                let decision = Decision::Rearm {
                    at: now + delay,
                    params: params.clone(),
                };
                (state, decision)
            }
        }
    }

    /// When the user would leave going by the last estimate, never earlier
    /// than `now`. Without an estimate yet, `now`.
    fn expected_departure(&self, params: &PollCycleParameters, now: Timestamp) -> Timestamp {
        params.last_sample.as_ref().map_or(now, |sample| {
            let leave = params.arrival_at - sample.worst_case().saturating_add(self.config.padding);
            leave.max(now)
        })
    }

    /// Run one full step for a fired poll callback.
    ///
    /// Arms exactly one callback unless the record stopped being
    /// smart-armed in the meantime. Store and scheduling failures are
    /// returned to the caller as they are; a retry is recovery's job.
    pub async fn run_cycle(&self, params: PollCycleParameters) -> Result<CycleOutcome> {
        params.validate()?;

        let mut query = params.route_query();
        if self.config.duration_basis.needs_traffic() {
            query.depart_at = Some(self.expected_departure(&params, self.clock.now()));
        }
        let answer = tokio::time::timeout(self.config.provider_timeout, self.provider.estimate(&query))
            .await
            .unwrap_or(Err(ProviderError::Timeout));

        let now = self.clock.now();
        let (state, decision) = self.decide(&params, answer, now);

        // The query may have outlived a cancel. Only act on a live loop.
        let record = match self.store.get(params.alarm_id).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                info!(alarm_id = %params.alarm_id, "Alarm deleted mid-cycle, polling stopped");
                return Ok(CycleOutcome::Abandoned);
            }
            Err(e) => {
                error!(alarm_id = %params.alarm_id, error = %e, "Store read failed during poll");
                return Err(e.into());
            }
        };
        if !record.smart_armed {
            info!(alarm_id = %params.alarm_id, "Smart mode off, polling stopped");
            return Ok(CycleOutcome::Abandoned);
        }

        match decision {
            Decision::Rearm { at, params } => {
                let slot = params.poll_slot();
                self.alarms
                    .arm_callback(slot, at, &Callback::Poll(params))
                    .await
                    .inspect_err(|e| error!(slot = %slot, error = %e, "Re-arm failed"))?;
                info!(
                    alarm_id = %record.id,
                    slot = %slot,
                    next_poll = %at.to_datetime(self.clock.local_offset()),
                    optimal_wake_up = ?state.optimal_wake_up.map(|t| t.to_datetime(self.clock.local_offset())),
                    "Poll re-armed"
                );
                Ok(CycleOutcome::Rearmed { at })
            }
            Decision::Escalate { request } => {
                let slot = params.alarm_slot();
                self.alarms
                    .arm_callback(slot, now, &Callback::Trigger(request))
                    .await
                    .inspect_err(|e| error!(slot = %slot, error = %e, "Escalation failed"))?;
                info!(
                    alarm_id = %record.id,
                    slot = %slot,
                    duration_secs = ?state.duration.map(|d| d.whole_seconds()),
                    "Escalating, waking user now"
                );
                Ok(CycleOutcome::Escalated { at: now })
            }
        }
    }
}

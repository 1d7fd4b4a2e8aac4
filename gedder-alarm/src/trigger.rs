//! The plain alarm-trigger path.
//!
//! Whatever rang the alarm (its own slot, an escalation from the polling
//! loop, or a snooze running out), firing ends smart mode for the record,
//! moves or clears the plain alarm, and tells whoever is listening to wake
//! the user.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::Duration;
use tokio::sync::mpsc;

use crate::alarm_manager::{AlarmManager, Callback};
use crate::clock::Clock;
use crate::engine::EngineConfig;
use crate::error::Result;
use crate::record::{AlarmId, AlarmRecord};
use crate::store::AlarmStore;
use crate::tracing::prelude::*;
use crate::travel::TravelSample;
use crate::types::Timestamp;

pub const SNOOZE: Duration = Duration::minutes(10);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TriggerSource {
    /// The plain alarm reached its instant.
    Alarm,
    /// The polling loop decided the user has to get up now.
    Escalation,
    Snooze,
}

/// Payload of a fired alarm-slot callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub alarm_id: AlarmId,
    pub request_code: u32,
    pub source: TriggerSource,

    /// Last travel estimate, shown to the user.
    pub sample: Option<TravelSample>,
}

impl TriggerRequest {
    pub fn plain(record: &AlarmRecord) -> Self {
        Self {
            alarm_id: record.id,
            request_code: record.request_code,
            source: TriggerSource::Alarm,
            sample: None,
        }
    }
}

/// "Wake up now", for whatever rings or shows a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeEvent {
    pub alarm_id: AlarmId,
    pub source: TriggerSource,
    pub fired_at: Timestamp,
    pub sample: Option<TravelSample>,

    /// Latest departure that still makes the arrival, when there is an
    /// estimate to base it on.
    pub leave_by: Option<Timestamp>,
}

pub struct AlarmTrigger {
    store: Arc<dyn AlarmStore>,
    alarms: Arc<dyn AlarmManager>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    wake_tx: mpsc::Sender<WakeEvent>,
}

impl AlarmTrigger {
    pub fn new(
        store: Arc<dyn AlarmStore>,
        alarms: Arc<dyn AlarmManager>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
        wake_tx: mpsc::Sender<WakeEvent>,
    ) -> Self {
        Self {
            store,
            alarms,
            clock,
            config,
            wake_tx,
        }
    }

    /// Ring `request`'s alarm. `None` when the alarm was disarmed after the
    /// callback had already fired.
    pub async fn fire(&self, request: TriggerRequest) -> Result<Option<WakeEvent>> {
        let now = self.clock.now();
        let mut record = self.store.get(request.alarm_id).await?;
        let arrival_at = record.arrival_at;

        // A snooze rings even though firing already disarmed a one-shot.
        if request.source != TriggerSource::Snooze && !record.alarm_armed {
            info!(alarm_id = %record.id, source = %request.source, "Alarm was disarmed, not ringing");
            return Ok(None);
        }

        if record.smart_armed {
            record.smart_armed = false;
            self.alarms.cancel(record.poll_slot()).await?;
        }

        match request.source {
            TriggerSource::Snooze => {
                // The snooze borrowed the alarm slot; give it back to a
                // pending repeat.
                if record.alarm_armed && record.alarm_at > now {
                    self.arm_plain(&record).await?;
                }
            }
            TriggerSource::Alarm | TriggerSource::Escalation => {
                if record.repeat_days.is_repeating() {
                    // An escalation fires ahead of the alarm instant, so
                    // always move at least one occurrence.
                    let offset = self.clock.local_offset();
                    record.next_repeat_after(offset);
                    while record.alarm_at <= now && record.next_repeat_after(offset) {}
                    self.arm_plain(&record).await?;
                    record.alarm_armed = true;
                } else {
                    record.alarm_armed = false;
                }
            }
        }

        self.store.update(&record).await?;

        let leave_by = request
            .sample
            .as_ref()
            .map(|s| arrival_at - (self.config.duration_basis.pick(s) + self.config.padding));
        let event = WakeEvent {
            alarm_id: record.id,
            source: request.source,
            fired_at: now,
            sample: request.sample,
            leave_by,
        };
        info!(
            alarm_id = %record.id,
            source = %event.source,
            next_alarm = ?record.alarm_armed.then(|| record.alarm_at.to_datetime(self.clock.local_offset())),
            "Alarm fired"
        );

        if self.wake_tx.send(event.clone()).await.is_err() {
            warn!(alarm_id = %record.id, "No wake listener, event dropped");
        }
        Ok(Some(event))
    }

    /// Ring again in ten minutes.
    pub async fn snooze(&self, id: AlarmId) -> Result<Timestamp> {
        let record = self.store.get(id).await?;
        let at = self.clock.now() + SNOOZE;
        let request = TriggerRequest {
            source: TriggerSource::Snooze,
            ..TriggerRequest::plain(&record)
        };
        self.alarms
            .arm_callback(record.alarm_slot(), at, &Callback::Trigger(request))
            .await?;
        info!(alarm_id = %id, until = %at.to_datetime(self.clock.local_offset()), "Snoozed");
        Ok(at)
    }

    async fn arm_plain(&self, record: &AlarmRecord) -> Result<()> {
        arm_plain_alarm(self.alarms.as_ref(), record).await
    }
}

/// Arm `record`'s alarm slot to ring at its alarm instant.
pub(crate) async fn arm_plain_alarm(alarms: &dyn AlarmManager, record: &AlarmRecord) -> Result<()> {
    let callback = Callback::Trigger(TriggerRequest::plain(record));
    alarms
        .arm_callback(record.alarm_slot(), record.alarm_at, &callback)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::UtcOffset;
    use time::macros::datetime;

    use super::*;
    use crate::error::Error;
    use crate::record::Place;
    use crate::store::{MemoryStore, StoreError};
    use crate::testing::{FixedClock, RecordingAlarmManager};
    use crate::types::DaysOfWeek;

    struct Harness {
        trigger: AlarmTrigger,
        store: Arc<MemoryStore>,
        alarms: Arc<RecordingAlarmManager>,
        clock: Arc<FixedClock>,
        wake_rx: mpsc::Receiver<WakeEvent>,
        record: AlarmRecord,
    }

    // Thursday evening; the default record rings Friday 06:00.
    fn harness(repeat_days: DaysOfWeek) -> Harness {
        let mut record = AlarmRecord::with_defaults(datetime!(2026-04-23 20:00 UTC)).unwrap();
        record.origin = Place::new("a", "1 Home St");
        record.destination = Place::new("b", "2 Work Ave");
        record.repeat_days = repeat_days;
        record.alarm_armed = true;
        record.smart_armed = true;

        let store = Arc::new(MemoryStore::with_records([record.clone()]));
        let alarms = Arc::new(RecordingAlarmManager::new());
        let clock = Arc::new(FixedClock::new(record.alarm_at));
        let (wake_tx, wake_rx) = mpsc::channel(4);
        let trigger = AlarmTrigger::new(
            store.clone(),
            alarms.clone(),
            clock.clone(),
            EngineConfig::default(),
            wake_tx,
        );
        Harness {
            trigger,
            store,
            alarms,
            clock,
            wake_rx,
            record,
        }
    }

    #[tokio::test]
    async fn one_shot_fire_disarms_everything() {
        let mut h = harness(DaysOfWeek::empty());
        let request = TriggerRequest {
            source: TriggerSource::Escalation,
            sample: Some(TravelSample::new(20 * 60)),
            ..TriggerRequest::plain(&h.record)
        };

        let event = h.trigger.fire(request).await.unwrap().unwrap();

        let stored = h.store.get(h.record.id).await.unwrap();
        assert!(!stored.alarm_armed);
        assert!(!stored.smart_armed);
        assert_eq!(h.alarms.cancels(), vec![h.record.poll_slot()]);
        assert_eq!(h.alarms.pending_count(), 0);

        // Arrival 07:00, 20 minutes of travel plus 15 of padding.
        assert_eq!(
            event.leave_by.unwrap().to_datetime(UtcOffset::UTC),
            datetime!(2026-04-24 06:25 UTC)
        );
        assert_eq!(h.wake_rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn repeating_fire_moves_to_next_day() {
        let h = harness(DaysOfWeek::MONDAY | DaysOfWeek::FRIDAY);

        let event = h
            .trigger
            .fire(TriggerRequest::plain(&h.record))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.leave_by, None);

        let stored = h.store.get(h.record.id).await.unwrap();
        assert!(stored.alarm_armed);
        assert!(!stored.smart_armed);
        assert_eq!(
            stored.alarm_at.to_datetime(UtcOffset::UTC),
            datetime!(2026-04-27 06:00 UTC)
        );
        let (at, _) = h.alarms.armed(h.record.alarm_slot()).unwrap();
        assert_eq!(at, stored.alarm_at);
    }

    #[tokio::test]
    async fn late_repeating_fire_skips_past_occurrences() {
        let h = harness(DaysOfWeek::all());
        h.clock.advance(Duration::days(3));

        h.trigger.fire(TriggerRequest::plain(&h.record)).await.unwrap();

        let stored = h.store.get(h.record.id).await.unwrap();
        assert_eq!(
            stored.alarm_at.to_datetime(UtcOffset::UTC),
            datetime!(2026-04-28 06:00 UTC)
        );
    }

    #[tokio::test]
    async fn snooze_rings_again_in_ten_minutes() {
        let h = harness(DaysOfWeek::empty());
        let at = h.trigger.snooze(h.record.id).await.unwrap();

        assert_eq!(at, h.record.alarm_at + Duration::minutes(10));
        let (armed_at, callback) = h.alarms.armed(h.record.alarm_slot()).unwrap();
        assert_eq!(armed_at, at);
        assert!(matches!(
            callback,
            Callback::Trigger(TriggerRequest {
                source: TriggerSource::Snooze,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn snooze_ending_restores_next_repeat() {
        let h = harness(DaysOfWeek::MONDAY | DaysOfWeek::FRIDAY);
        h.trigger.fire(TriggerRequest::plain(&h.record)).await.unwrap();
        h.trigger.snooze(h.record.id).await.unwrap();
        h.clock.advance(SNOOZE);

        let request = TriggerRequest {
            source: TriggerSource::Snooze,
            ..TriggerRequest::plain(&h.record)
        };
        h.trigger.fire(request).await.unwrap();

        let stored = h.store.get(h.record.id).await.unwrap();
        let (at, _) = h.alarms.armed(h.record.alarm_slot()).unwrap();
        assert_eq!(at, stored.alarm_at);
        assert_eq!(
            at.to_datetime(UtcOffset::UTC),
            datetime!(2026-04-27 06:00 UTC)
        );
    }

    #[tokio::test]
    async fn disarmed_alarm_does_not_come_back() {
        let mut h = harness(DaysOfWeek::MONDAY | DaysOfWeek::FRIDAY);
        let mut disarmed = h.record.clone();
        disarmed.alarm_armed = false;
        disarmed.smart_armed = false;
        h.store.update(&disarmed).await.unwrap();

        let fired = h.trigger.fire(TriggerRequest::plain(&h.record)).await.unwrap();

        assert_eq!(fired, None);
        assert_eq!(h.store.get(h.record.id).await.unwrap(), disarmed);
        assert_eq!(h.alarms.arm_calls(), 0);
        assert!(h.wake_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn snooze_still_rings_after_one_shot_fired() {
        let mut h = harness(DaysOfWeek::empty());
        h.trigger.fire(TriggerRequest::plain(&h.record)).await.unwrap();
        h.wake_rx.recv().await.unwrap();
        h.trigger.snooze(h.record.id).await.unwrap();

        let request = TriggerRequest {
            source: TriggerSource::Snooze,
            ..TriggerRequest::plain(&h.record)
        };
        let event = h.trigger.fire(request).await.unwrap().unwrap();

        assert_eq!(event.source, TriggerSource::Snooze);
        assert!(!h.store.get(h.record.id).await.unwrap().alarm_armed);
    }

    #[tokio::test]
    async fn missing_record_is_an_error() {
        let h = harness(DaysOfWeek::empty());
        h.store.delete(h.record.id).await.unwrap();

        assert!(matches!(
            h.trigger.fire(TriggerRequest::plain(&h.record)).await,
            Err(Error::Store(StoreError::NotFound(_)))
        ));
    }
}

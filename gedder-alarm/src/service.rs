//! Alarm orchestration.
//!
//! The user-facing operations on alarms. This layer owns the rules that
//! span records and slots: smart mode needs both addresses and an armed
//! alarm, turning the alarm off turns smart mode off, and at most one record
//! is smart-armed at a time.

use std::collections::HashSet;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::alarm_manager::{AlarmManager, PendingCallback};
use crate::clock::Clock;
use crate::engine::PollingEngine;
use crate::error::{Error, Result};
use crate::record::{AlarmId, AlarmRecord, Place, TransitMode, TravelMode, random_request_code};
use crate::store::AlarmStore;
use crate::tracing::prelude::*;
use crate::trigger::{AlarmTrigger, arm_plain_alarm};
use crate::types::{DaysOfWeek, PrepTime, Timestamp};

/// Fields to change on an alarm. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmEdit {
    pub origin: Option<Place>,
    pub destination: Option<Place>,
    pub travel_mode: Option<TravelMode>,
    pub transit_mode: Option<TransitMode>,
    pub repeat_days: Option<DaysOfWeek>,
    /// Time of day as (hour, minute).
    pub alarm_time: Option<(u8, u8)>,
    pub arrival_time: Option<(u8, u8)>,
    pub prep_time: Option<PrepTime>,
}

impl AlarmEdit {
    fn changes_schedule(&self) -> bool {
        self.alarm_time.is_some() || self.arrival_time.is_some() || self.repeat_days.is_some()
    }

    fn apply(self, record: &mut AlarmRecord) {
        if let Some(origin) = self.origin {
            record.origin = origin;
        }
        if let Some(destination) = self.destination {
            record.destination = destination;
        }
        if let Some(mode) = self.travel_mode {
            record.travel_mode = mode;
        }
        if let Some(mode) = self.transit_mode {
            record.transit_mode = mode;
        }
        if let Some(days) = self.repeat_days {
            record.repeat_days = days;
        }
        if let Some((hour, minute)) = self.alarm_time {
            record.alarm.hour = hour;
            record.alarm.minute = minute;
        }
        if let Some((hour, minute)) = self.arrival_time {
            record.arrival.hour = hour;
            record.arrival.minute = minute;
        }
        if let Some(prep) = self.prep_time {
            record.prep_time = prep;
        }
    }
}

pub struct AlarmService {
    store: Arc<dyn AlarmStore>,
    alarms: Arc<dyn AlarmManager>,
    engine: Arc<PollingEngine>,
    trigger: Arc<AlarmTrigger>,
    clock: Arc<dyn Clock>,
}

impl AlarmService {
    pub fn new(
        store: Arc<dyn AlarmStore>,
        alarms: Arc<dyn AlarmManager>,
        engine: Arc<PollingEngine>,
        trigger: Arc<AlarmTrigger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            alarms,
            engine,
            trigger,
            clock,
        }
    }

    fn local_now(&self) -> OffsetDateTime {
        self.clock.now().to_datetime(self.clock.local_offset())
    }

    pub async fn list_alarms(&self) -> Result<Vec<AlarmRecord>> {
        Ok(self.store.get_all().await?)
    }

    pub async fn get_alarm(&self, id: AlarmId) -> Result<AlarmRecord> {
        Ok(self.store.get(id).await?)
    }

    /// Create a disarmed alarm from the defaults plus `edit`.
    pub async fn create_alarm(&self, edit: AlarmEdit) -> Result<AlarmRecord> {
        let now = self.local_now();
        let mut record = AlarmRecord::with_defaults(now)?;
        let retime = edit.changes_schedule();
        edit.apply(&mut record);
        if retime {
            record.adjust_days(now)?;
        }

        let taken: HashSet<u32> = self
            .store
            .get_all()
            .await?
            .iter()
            .map(|r| r.request_code)
            .collect();
        record.request_code = unused_request_code(&taken, record.request_code, random_request_code);

        let record = self.store.create(record).await?;
        info!(alarm_id = %record.id, alarm = %record.alarm, "Alarm created");
        Ok(record)
    }

    /// Apply `edit` and bring the record's callbacks in line with it.
    pub async fn edit_alarm(&self, id: AlarmId, edit: AlarmEdit) -> Result<AlarmRecord> {
        let mut record = self.store.get(id).await?;
        edit.apply(&mut record);
        record.adjust_days(self.local_now())?;

        if record.smart_armed && !record.is_smart_eligible() {
            info!(alarm_id = %id, "Route incomplete, smart mode turned off");
            record.smart_armed = false;
            self.alarms.cancel(record.poll_slot()).await?;
        }

        self.store.update(&record).await?;
        if record.alarm_armed {
            arm_plain_alarm(self.alarms.as_ref(), &record).await?;
        }
        if record.smart_armed {
            self.engine.start(&record).await?;
        }

        debug!(alarm_id = %id, alarm = %record.alarm, arrival = %record.arrival, "Alarm edited");
        Ok(record)
    }

    pub async fn set_alarm_armed(&self, id: AlarmId, armed: bool) -> Result<AlarmRecord> {
        let mut record = self.store.get(id).await?;

        if armed {
            record.adjust_days(self.local_now())?;
            record.alarm_armed = true;
            self.store.update(&record).await?;
            arm_plain_alarm(self.alarms.as_ref(), &record).await?;
            info!(
                alarm_id = %id,
                at = %record.alarm_at.to_datetime(self.clock.local_offset()),
                "Alarm armed"
            );
        } else {
            self.alarms.cancel(record.alarm_slot()).await?;
            self.alarms.cancel(record.poll_slot()).await?;
            record.alarm_armed = false;
            record.smart_armed = false;
            self.store.update(&record).await?;
            info!(alarm_id = %id, "Alarm disarmed");
        }
        Ok(record)
    }

    /// Turn smart mode on or off.
    ///
    /// Turning it off has cancelled the poll slot by the time this returns,
    /// so no further poll can be armed from a callback that hasn't started.
    pub async fn set_smart_armed(&self, id: AlarmId, armed: bool) -> Result<AlarmRecord> {
        let mut record = self.store.get(id).await?;

        if !armed {
            self.alarms.cancel(record.poll_slot()).await?;
            record.smart_armed = false;
            self.store.update(&record).await?;
            info!(alarm_id = %id, "Smart mode off");
            return Ok(record);
        }

        if !record.is_smart_eligible() {
            return Err(Error::NotEligible(id));
        }

        self.disarm_other_smart_alarms(id).await?;

        if !record.alarm_armed {
            record.adjust_days(self.local_now())?;
            record.alarm_armed = true;
        }
        record.smart_armed = true;
        self.store.update(&record).await?;
        arm_plain_alarm(self.alarms.as_ref(), &record).await?;
        self.engine.start(&record).await?;

        info!(alarm_id = %id, "Smart mode on");
        Ok(record)
    }

    async fn disarm_other_smart_alarms(&self, keep: AlarmId) -> Result<()> {
        for mut other in self.store.get_all().await? {
            if other.id == keep || !other.smart_armed {
                continue;
            }
            self.alarms.cancel(other.poll_slot()).await?;
            other.smart_armed = false;
            self.store.update(&other).await?;
            info!(alarm_id = %other.id, "Smart mode moved to another alarm");
        }
        Ok(())
    }

    pub async fn delete_alarm(&self, id: AlarmId) -> Result<()> {
        let record = self.store.get(id).await?;
        self.alarms.cancel(record.alarm_slot()).await?;
        self.alarms.cancel(record.poll_slot()).await?;
        self.store.delete(id).await?;
        info!(alarm_id = %id, "Alarm deleted");
        Ok(())
    }

    pub async fn snooze(&self, id: AlarmId) -> Result<Timestamp> {
        self.trigger.snooze(id).await
    }

    pub fn schedule(&self) -> Vec<PendingCallback> {
        self.alarms.pending()
    }
}

/// `first`, or the next draw no other record already uses.
fn unused_request_code(taken: &HashSet<u32>, first: u32, mut draw: impl FnMut() -> u32) -> u32 {
    let mut code = first;
    while taken.contains(&code) {
        code = draw();
    }
    code
}

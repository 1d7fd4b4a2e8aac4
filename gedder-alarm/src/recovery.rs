//! Recovery Coordinator.
//!
//! Runs once when the daemon starts. Armed callbacks don't survive a
//! restart, so every record is walked and its callbacks rebuilt from what
//! the store says. Alarms that came due while the process was down are
//! cleared, never fired late. Running it again on the same state arms the
//! same slots at the same instants, which the scheduling capability treats
//! as a no-op.

use std::sync::Arc;

use crate::alarm_manager::AlarmManager;
use crate::clock::Clock;
use crate::engine::{PollCycleParameters, PollingEngine};
use crate::error::Result;
use crate::record::{AlarmId, AlarmRecord};
use crate::store::AlarmStore;
use crate::tracing::prelude::*;
use crate::trigger::arm_plain_alarm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovered {
    /// Plain alarm re-armed.
    Rearmed,
    /// Plain alarm re-armed and the polling loop run straight away.
    Restarted,
    /// Came due while down; flags cleared.
    Missed,
    /// Smart flag set on a disarmed alarm; cleared.
    Cleared,
    Idle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub rearmed: usize,
    pub restarted: usize,
    pub missed: usize,
    pub cleared: usize,
    pub failures: Vec<(AlarmId, String)>,
}

pub struct RecoveryCoordinator {
    store: Arc<dyn AlarmStore>,
    alarms: Arc<dyn AlarmManager>,
    engine: Arc<PollingEngine>,
    clock: Arc<dyn Clock>,
}

impl RecoveryCoordinator {
    pub fn new(
        store: Arc<dyn AlarmStore>,
        alarms: Arc<dyn AlarmManager>,
        engine: Arc<PollingEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            alarms,
            engine,
            clock,
        }
    }

    /// Rebuild every record's callbacks. A failure on one record is
    /// reported and the rest still run; only failing to list the records at
    /// all is an error.
    pub async fn run(&self) -> Result<RecoveryReport> {
        let records = self.store.get_all().await?;
        let mut report = RecoveryReport::default();

        for record in records {
            let id = record.id;
            match self.recover(record).await {
                Ok(Recovered::Rearmed) => report.rearmed += 1,
                Ok(Recovered::Restarted) => {
                    report.rearmed += 1;
                    report.restarted += 1;
                }
                Ok(Recovered::Missed) => report.missed += 1,
                Ok(Recovered::Cleared) => report.cleared += 1,
                Ok(Recovered::Idle) => {}
                Err(e) => {
                    error!(alarm_id = %id, error = %e, "Recovery failed");
                    report.failures.push((id, e.to_string()));
                }
            }
        }

        info!(
            rearmed = report.rearmed,
            restarted = report.restarted,
            missed = report.missed,
            cleared = report.cleared,
            failed = report.failures.len(),
            "Recovery complete"
        );
        Ok(report)
    }

    async fn recover(&self, mut record: AlarmRecord) -> Result<Recovered> {
        let now = self.clock.now();

        if record.alarm_armed && record.alarm_at > now {
            arm_plain_alarm(self.alarms.as_ref(), &record).await?;
            debug!(alarm_id = %record.id, at = %record.alarm_at, "Alarm re-armed");

            if !record.smart_armed {
                return Ok(Recovered::Rearmed);
            }
            let outcome = self
                .engine
                .run_cycle(PollCycleParameters::from_record(&record))
                .await?;
            debug!(alarm_id = %record.id, outcome = ?outcome, "Polling resumed");
            return Ok(Recovered::Restarted);
        }

        if record.alarm_armed {
            warn!(alarm_id = %record.id, at = %record.alarm_at, "Alarm missed while down");
            record.alarm_armed = false;
            record.smart_armed = false;
            self.alarms.cancel(record.alarm_slot()).await?;
            self.alarms.cancel(record.poll_slot()).await?;
            self.store.update(&record).await?;
            return Ok(Recovered::Missed);
        }

        if record.smart_armed {
            record.smart_armed = false;
            self.alarms.cancel(record.poll_slot()).await?;
            self.store.update(&record).await?;
            return Ok(Recovered::Cleared);
        }

        Ok(Recovered::Idle)
    }
}

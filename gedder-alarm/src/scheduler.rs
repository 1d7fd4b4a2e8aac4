//! The dispatcher task routes fired callbacks to whatever handles them.
//!
//! Poll callbacks go to the polling engine, alarm-slot callbacks to the
//! trigger path. Each callback runs in its own task so a slow provider query
//! never holds up an alarm that is due. Failures are logged; the loop only
//! ends on shutdown or when the scheduling capability goes away.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::alarm_manager::{Callback, FiredCallback};
use crate::engine::PollingEngine;
use crate::tracing::prelude::*;
use crate::trigger::AlarmTrigger;

pub async fn task(
    engine: Arc<PollingEngine>,
    trigger: Arc<AlarmTrigger>,
    mut fired_rx: mpsc::Receiver<FiredCallback>,
    running: CancellationToken,
) {
    trace!("Dispatcher task started.");

    while !running.is_cancelled() {
        tokio::select! {
            fired = fired_rx.recv() => {
                let Some(fired) = fired else {
                    warn!("Scheduling capability closed, dispatcher stopping");
                    break;
                };
                tokio::spawn(dispatch(engine.clone(), trigger.clone(), fired));
            }

            _ = running.cancelled() => {
                info!("Dispatcher shutdown requested");
                break;
            }
        }
    }

    trace!("Dispatcher task stopped.");
}

async fn dispatch(engine: Arc<PollingEngine>, trigger: Arc<AlarmTrigger>, fired: FiredCallback) {
    let slot = fired.slot;
    let callback = match fired.payload.decode() {
        Ok(callback) => callback,
        Err(e) => {
            error!(slot = %slot, error = %e, "Dropping undecodable callback");
            return;
        }
    };

    match callback {
        Callback::Poll(params) => {
            let alarm_id = params.alarm_id;
            match engine.run_cycle(params).await {
                Ok(outcome) => debug!(alarm_id = %alarm_id, outcome = ?outcome, "Poll cycle done"),
                Err(e) => error!(alarm_id = %alarm_id, slot = %slot, error = %e, "Poll cycle failed"),
            }
        }
        Callback::Trigger(request) => {
            let alarm_id = request.alarm_id;
            if let Err(e) = trigger.fire(request).await {
                error!(alarm_id = %alarm_id, slot = %slot, error = %e, "Alarm trigger failed");
            }
        }
    }
}

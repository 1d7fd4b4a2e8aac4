//! The gedder-alarm daemon.
//!
//! Loads the alarm store, rebuilds every armed callback, then runs the
//! dispatcher and the HTTP API until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use gedder_alarm::alarm_manager::TimerAlarmManager;
use gedder_alarm::api::{self, SharedState};
use gedder_alarm::clock::{Clock, SystemClock};
use gedder_alarm::config::Config;
use gedder_alarm::engine::PollingEngine;
use gedder_alarm::recovery::RecoveryCoordinator;
use gedder_alarm::scheduler;
use gedder_alarm::service::AlarmService;
use gedder_alarm::store::JsonFileStore;
use gedder_alarm::travel::DirectionsClient;
use gedder_alarm::trigger::{AlarmTrigger, WakeEvent};

const WAKE_CHANNEL_CAPACITY: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    gedder_alarm::tracing::init_journald_or_stdout();

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        store = %config.store_path.display(),
        api = %config.api_bind,
        basis = %config.engine.duration_basis,
        "Starting gedder-alarm"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let store = Arc::new(
        JsonFileStore::open(&config.store_path)
            .await
            .with_context(|| format!("failed to open {}", config.store_path.display()))?,
    );
    let (alarms, fired_rx) = TimerAlarmManager::new(clock.clone());
    let alarms = Arc::new(alarms);

    let provider = match &config.directions_url {
        Some(url) => {
            let base = Url::parse(url).with_context(|| format!("invalid directions URL {url}"))?;
            DirectionsClient::with_base_url(
                base,
                &config.directions_api_key,
                config.engine.provider_timeout,
            )?
        }
        None => DirectionsClient::new(&config.directions_api_key, config.engine.provider_timeout)?,
    };

    let engine = Arc::new(PollingEngine::new(
        Arc::new(provider),
        store.clone(),
        alarms.clone(),
        clock.clone(),
        config.engine.clone(),
    ));
    let (wake_tx, wake_rx) = mpsc::channel(WAKE_CHANNEL_CAPACITY);
    let trigger = Arc::new(AlarmTrigger::new(
        store.clone(),
        alarms.clone(),
        clock.clone(),
        config.engine.clone(),
        wake_tx,
    ));
    let service = Arc::new(AlarmService::new(
        store.clone(),
        alarms.clone(),
        engine.clone(),
        trigger.clone(),
        clock.clone(),
    ));

    let report = RecoveryCoordinator::new(store, alarms, engine.clone(), clock.clone())
        .run()
        .await
        .context("recovery failed")?;
    info!(
        rearmed = report.rearmed,
        restarted = report.restarted,
        missed = report.missed,
        cleared = report.cleared,
        "Recovery complete"
    );
    for (alarm_id, reason) in &report.failures {
        warn!(alarm_id = %alarm_id, reason = %reason, "Alarm not recovered");
    }

    let running = CancellationToken::new();
    let dispatcher = tokio::spawn(scheduler::task(
        engine,
        trigger,
        fired_rx,
        running.clone(),
    ));
    let wake_logger = tokio::spawn(log_wake_events(wake_rx, clock, running.clone()));
    let server = tokio::spawn(api::serve(
        config.api_bind,
        SharedState::new(service),
        running.clone(),
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
        _ = running.cancelled() => {}
    }
    running.cancel();

    if let Err(e) = dispatcher.await {
        error!(error = %e, "Dispatcher task panicked");
    }
    if let Err(e) = wake_logger.await {
        error!(error = %e, "Wake logger panicked");
    }
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "API server failed"),
        Err(e) => error!(error = %e, "API server panicked"),
    }

    info!("Stopped");
    Ok(())
}

/// Stand-in for the ringer: report each wake-up in the log.
async fn log_wake_events(
    mut wake_rx: mpsc::Receiver<WakeEvent>,
    clock: Arc<dyn Clock>,
    running: CancellationToken,
) {
    let offset = clock.local_offset();
    loop {
        tokio::select! {
            event = wake_rx.recv() => {
                let Some(event) = event else { break };
                info!(
                    alarm_id = %event.alarm_id,
                    source = %event.source,
                    leave_by = ?event.leave_by.map(|t| t.to_datetime(offset)),
                    "WAKE UP"
                );
            }
            _ = running.cancelled() => break,
        }
    }
}

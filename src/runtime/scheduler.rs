//! Daily pause/resume jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{SchedulerSettings, parse_clock_time};
use crate::gateway::Gateway;

const TICK: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledAction {
    Pause,
    Resume,
}

/// A job that runs once a day at `at` local time.
#[derive(Debug, Clone)]
pub struct DailyJob {
    action: ScheduledAction,
    at: NaiveTime,
    last_run: Option<NaiveDate>,
}

impl DailyJob {
    /// A job created after today's time has passed waits for tomorrow.
    pub fn new(action: ScheduledAction, at: NaiveTime, now: NaiveDateTime) -> Self {
        Self {
            action,
            at,
            last_run: (now.time() >= at).then(|| now.date()),
        }
    }

    pub fn due(&mut self, now: NaiveDateTime) -> bool {
        if now.time() >= self.at && self.last_run != Some(now.date()) {
            self.last_run = Some(now.date());
            return true;
        }
        false
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    jobs: Vec<DailyJob>,
}

impl Scheduler {
    pub fn from_settings(settings: &SchedulerSettings, now: NaiveDateTime) -> Result<Self, String> {
        let pause = parse_clock_time(&settings.pause_time)?;
        let resume = parse_clock_time(&settings.resume_time)?;
        Ok(Self {
            jobs: vec![
                DailyJob::new(ScheduledAction::Pause, pause, now),
                DailyJob::new(ScheduledAction::Resume, resume, now),
            ],
        })
    }

    pub fn due_actions(&mut self, now: NaiveDateTime) -> Vec<ScheduledAction> {
        self.jobs
            .iter_mut()
            .filter_map(|job| job.due(now).then_some(job.action))
            .collect()
    }
}

/// Put the player into the action's target state. Nothing happens when it is already there.
pub fn apply(gateway: &Gateway, action: ScheduledAction) {
    let paused = action == ScheduledAction::Pause;
    match gateway.player().set_paused(paused) {
        Ok(Some(state)) => {
            info!("Scheduled {action:?} applied");
            gateway.publish_state(&state);
        }
        Ok(None) => debug!("Scheduled {action:?} skipped, already in that state"),
        Err(e) => warn!("Scheduled {action:?} failed: {e}"),
    }
}

pub async fn run(gateway: Arc<Gateway>, settings: SchedulerSettings, cancel: CancellationToken) {
    let mut scheduler = match Scheduler::from_settings(&settings, Local::now().naive_local()) {
        Ok(s) => s,
        Err(e) => {
            error!("Scheduler disabled: {e}");
            return;
        }
    };
    info!(
        "Scheduler active: pause at {}, resume at {}",
        settings.pause_time, settings.resume_time
    );

    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    'ticks: loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        for action in scheduler.due_actions(Local::now().naive_local()) {
            let gw = Arc::clone(&gateway);
            let job = tokio::task::spawn_blocking(move || apply(&gw, action));
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break 'ticks,
                outcome = job => outcome,
            };
            if let Err(e) = outcome {
                error!("Scheduled {action:?} panicked: {e}");
            }
        }
    }
    debug!("Scheduler stopped");
}

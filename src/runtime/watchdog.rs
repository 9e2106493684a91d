//! Heartbeat contract for an external supervisor.
//!
//! A heartbeat task proves the player lock can still be taken. The monitor
//! asks for a non-zero exit when beats stop, so a supervisor restarts us.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, warn};

use crate::config::WatchdogSettings;
use crate::gateway::Gateway;

use super::shutdown::Shutdown;

pub const EXIT_HEARTBEAT_MISSED: i32 = 3;

#[derive(Debug)]
pub struct Heartbeat {
    last: Mutex<Instant>,
}

impl Heartbeat {
    pub fn new(now: Instant) -> Self {
        Self {
            last: Mutex::new(now),
        }
    }

    pub fn beat(&self, now: Instant) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn last(&self) -> Instant {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// No beat within twice the heartbeat interval.
    pub fn is_stale(&self, now: Instant, heartbeat_interval: Duration) -> bool {
        now.saturating_duration_since(self.last()) > heartbeat_interval * 2
    }
}

pub async fn run_heartbeat(
    gateway: Arc<Gateway>,
    heartbeat: Arc<Heartbeat>,
    settings: WatchdogSettings,
    shutdown: Shutdown,
) {
    let mut ticker = interval(Duration::from_secs(settings.heartbeat_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = ticker.tick() => {}
        }
        let gw = Arc::clone(&gateway);
        let beat = tokio::task::spawn_blocking(move || gw.player().current_state());
        let outcome = tokio::select! {
            _ = shutdown.wait() => break,
            outcome = beat => outcome,
        };
        match outcome {
            Ok(_) => heartbeat.beat(Instant::now()),
            Err(e) => warn!("Heartbeat probe failed: {e}"),
        }
    }
    debug!("Heartbeat stopped");
}

pub async fn run_monitor(
    gateway: Arc<Gateway>,
    heartbeat: Arc<Heartbeat>,
    settings: WatchdogSettings,
    shutdown: Shutdown,
) {
    let heartbeat_interval = Duration::from_secs(settings.heartbeat_secs);
    let mut ticker = interval(Duration::from_secs(settings.check_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = ticker.tick() => {}
        }
        if check(&gateway, &heartbeat, heartbeat_interval, &shutdown, Instant::now()) {
            break;
        }
    }
    debug!("Watchdog stopped");
}

/// Returns true when the watchdog tripped.
pub fn check(
    gateway: &Gateway,
    heartbeat: &Heartbeat,
    heartbeat_interval: Duration,
    shutdown: &Shutdown,
    now: Instant,
) -> bool {
    if !heartbeat.is_stale(now, heartbeat_interval) {
        return false;
    }
    error!(
        "No heartbeat for {:?}; player looks stuck",
        now.saturating_duration_since(heartbeat.last())
    );
    match gateway.player().try_current_state() {
        Some(state) => gateway.persist(&state),
        None => warn!("Player lock is held; state not saved"),
    }
    shutdown.request(EXIT_HEARTBEAT_MISSED, "heartbeat missed");
    true
}

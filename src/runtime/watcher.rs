//! End-of-track detection and idle resource hygiene.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::WatcherSettings;
use crate::gateway::Gateway;
use crate::player::PlaybackProbe;

/// Falling-edge detector over successive probes.
///
/// A track counts as finished only if it was seen busy with a non-zero
/// position and then went idle while not paused. A load resets it.
#[derive(Debug, Default)]
pub struct EndOfTrackDetector {
    last_position: Duration,
    generation: u64,
}

impl EndOfTrackDetector {
    pub fn observe(&mut self, probe: &PlaybackProbe) -> bool {
        if probe.generation != self.generation {
            self.generation = probe.generation;
            self.last_position = Duration::ZERO;
        }
        if probe.paused {
            return false;
        }
        if probe.busy {
            self.last_position = probe.position;
            return false;
        }
        if self.last_position > Duration::ZERO {
            self.last_position = Duration::ZERO;
            return true;
        }
        false
    }
}

/// Fires once per idle period of `timeout` without playback or client commands.
#[derive(Debug)]
pub struct IdleTracker {
    timeout: Duration,
    last_activity: Instant,
}

impl IdleTracker {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_activity: now,
        }
    }

    pub fn observe(&mut self, now: Instant, playing: bool, remote_activity: Instant) -> bool {
        if playing {
            self.last_activity = now;
            return false;
        }
        let last = self.last_activity.max(remote_activity);
        if now.saturating_duration_since(last) >= self.timeout {
            self.last_activity = now;
            return true;
        }
        false
    }
}

pub struct Watcher {
    detector: EndOfTrackDetector,
    idle: IdleTracker,
}

impl Watcher {
    pub fn new(settings: &WatcherSettings, now: Instant) -> Self {
        Self {
            detector: EndOfTrackDetector::default(),
            idle: IdleTracker::new(Duration::from_secs(settings.idle_timeout_secs), now),
        }
    }

    /// One poll. Blocks on the player lock.
    pub fn tick(&mut self, gateway: &Gateway, now: Instant) {
        let player = gateway.player();
        let probe = player.probe();

        if self.detector.observe(&probe) {
            match player.advance_after_end(probe.generation) {
                Some(Ok(state)) => {
                    info!("Track finished, moving to index {}", state.current_index);
                    gateway.publish_state(&state);
                }
                Some(Err(e)) => warn!("Could not advance after track end: {e}"),
                None => debug!("Track end already handled elsewhere"),
            }
        }

        let playing = probe.busy && !probe.paused;
        if self
            .idle
            .observe(now, playing, gateway.hub().last_activity())
        {
            info!("Idle for a while, releasing cached resources");
            player.release_resources();
        }
    }
}

pub async fn run(gateway: Arc<Gateway>, settings: WatcherSettings, cancel: CancellationToken) {
    let mut ticker = interval(Duration::from_millis(settings.poll_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut watcher = Watcher::new(&settings, Instant::now());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let gw = Arc::clone(&gateway);
        let step = tokio::task::spawn_blocking(move || {
            watcher.tick(&gw, Instant::now());
            watcher
        });
        // A tick stuck on the player lock must not keep the loop alive past shutdown.
        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = step => outcome,
        };
        watcher = match outcome {
            Ok(w) => w,
            Err(e) => {
                error!("Watcher tick panicked: {e}");
                Watcher::new(&settings, Instant::now())
            }
        };
    }
    debug!("End-of-track watcher stopped");
}

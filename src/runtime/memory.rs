//! Memory-pressure checks for small always-on hosts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sysinfo::{Pid, System};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::MemorySettings;
use crate::gateway::Gateway;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySample {
    /// System memory in use, as a percentage of the total.
    pub system_percent: f32,
    pub process_rss: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pressure {
    Normal,
    High,
    Critical,
}

/// Decides when to release player resources.
///
/// High pressure releases at most once per cooldown. Critical pressure
/// releases on every check and restarts the cooldown.
#[derive(Debug)]
pub struct MemoryPolicy {
    release_threshold: f32,
    critical_threshold: f32,
    cooldown: Duration,
    last_release: Option<Instant>,
}

impl MemoryPolicy {
    pub fn new(settings: &MemorySettings) -> Self {
        Self {
            release_threshold: settings.release_threshold_percent,
            critical_threshold: settings.critical_threshold_percent,
            cooldown: Duration::from_secs(settings.release_cooldown_secs),
            last_release: None,
        }
    }

    pub fn assess(&mut self, system_percent: f32, now: Instant) -> Pressure {
        if system_percent > self.critical_threshold {
            self.last_release = Some(now);
            return Pressure::Critical;
        }
        if system_percent > self.release_threshold {
            let cooled = self
                .last_release
                .is_none_or(|at| now.saturating_duration_since(at) > self.cooldown);
            if cooled {
                self.last_release = Some(now);
                return Pressure::High;
            }
        }
        Pressure::Normal
    }
}

/// Reads system and process memory through `sysinfo`.
pub struct MemoryProbe {
    system: System,
    pid: Option<Pid>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| warn!("Cannot resolve own pid, process memory not reported: {e}"))
            .ok();
        Self {
            system: System::new(),
            pid,
        }
    }

    pub fn sample(&mut self) -> Option<MemorySample> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return None;
        }
        let system_percent = (self.system.used_memory() as f64 / total as f64 * 100.0) as f32;

        let process_rss = match self.pid {
            Some(pid) if self.system.refresh_process(pid) => self
                .system
                .process(pid)
                .map(|p| p.memory())
                .unwrap_or_default(),
            _ => 0,
        };
        Some(MemorySample {
            system_percent,
            process_rss,
        })
    }
}

/// Act on one sample. Returns the pressure it was judged at.
pub fn respond(
    gateway: &Gateway,
    policy: &mut MemoryPolicy,
    sample: MemorySample,
    now: Instant,
) -> Pressure {
    let rss_mb = sample.process_rss / (1024 * 1024);
    debug!(
        "Memory: system {:.1}%, process {rss_mb} MB",
        sample.system_percent
    );
    let pressure = policy.assess(sample.system_percent, now);
    match pressure {
        Pressure::Normal => {}
        Pressure::High => {
            info!(
                "Memory use at {:.1}%, releasing cached player resources",
                sample.system_percent
            );
            gateway.player().release_resources();
        }
        Pressure::Critical => {
            error!(
                "Critical memory use at {:.1}% (process {rss_mb} MB), releasing player resources",
                sample.system_percent
            );
            gateway.player().release_resources();
        }
    }
    pressure
}

pub struct MemoryMonitor {
    probe: MemoryProbe,
    policy: MemoryPolicy,
}

impl MemoryMonitor {
    pub fn new(settings: &MemorySettings) -> Self {
        Self {
            probe: MemoryProbe::new(),
            policy: MemoryPolicy::new(settings),
        }
    }

    /// One check. Blocks on the player lock when resources are released.
    pub fn check(&mut self, gateway: &Gateway, now: Instant) {
        if let Some(sample) = self.probe.sample() {
            respond(gateway, &mut self.policy, sample, now);
        }
    }
}

pub async fn run(gateway: Arc<Gateway>, settings: MemorySettings, cancel: CancellationToken) {
    let mut ticker = interval(Duration::from_secs(settings.check_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut monitor = MemoryMonitor::new(&settings);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let gw = Arc::clone(&gateway);
        let step = tokio::task::spawn_blocking(move || {
            monitor.check(&gw, Instant::now());
            monitor
        });
        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = step => outcome,
        };
        monitor = match outcome {
            Ok(m) => m,
            Err(e) => {
                error!("Memory check panicked: {e}");
                MemoryMonitor::new(&settings)
            }
        };
    }
    debug!("Memory monitor stopped");
}

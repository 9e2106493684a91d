use std::{env, path::PathBuf};

use chrono::NaiveTime;

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `TUNEBOX__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("TUNEBOX")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.watcher.poll_interval_ms == 0 {
            return Err("watcher.poll_interval_ms must be >= 1".to_string());
        }
        if self.watchdog.check_interval_secs == 0 || self.watchdog.heartbeat_secs == 0 {
            return Err("watchdog intervals must be >= 1".to_string());
        }
        if self.memory.check_interval_secs == 0 {
            return Err("memory.check_interval_secs must be >= 1".to_string());
        }
        if self.memory.release_threshold_percent > self.memory.critical_threshold_percent {
            return Err(
                "memory.release_threshold_percent must be <= memory.critical_threshold_percent"
                    .to_string(),
            );
        }
        if !(0.0..=1.0).contains(&self.playback.default_volume) {
            return Err("playback.default_volume must be within 0.0..=1.0".to_string());
        }
        if self.playback.history_size < self.playback.shuffle_window {
            return Err("playback.history_size must be >= playback.shuffle_window".to_string());
        }
        parse_clock_time(&self.scheduler.pause_time)
            .map_err(|e| format!("scheduler.pause_time: {e}"))?;
        parse_clock_time(&self.scheduler.resume_time)
            .map_err(|e| format!("scheduler.resume_time: {e}"))?;
        Ok(())
    }

    /// Where the session snapshot lives: the configured path, or the XDG state dir.
    pub fn state_path(&self) -> PathBuf {
        self.state
            .path
            .clone()
            .or_else(default_state_path)
            .unwrap_or_else(|| PathBuf::from("tunebox-state.json"))
    }
}

/// Parse a `HH:MM` local clock time.
pub fn parse_clock_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| format!("invalid time {s:?}: {e}"))
}

/// Resolve the config path from `TUNEBOX_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("TUNEBOX_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/tunebox/config.toml`
/// or `~/.config/tunebox/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("tunebox").join("config.toml"))
}

/// `$XDG_STATE_HOME/tunebox/state.json`, or `~/.local/state/tunebox/state.json`.
pub fn default_state_path() -> Option<PathBuf> {
    let state_home = if let Some(xdg) = env::var_os("XDG_STATE_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("state"))
    };

    state_home.map(|d| d.join("tunebox").join("state.json"))
}

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level server settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/tunebox/config.toml` or `~/.config/tunebox/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `TUNEBOX__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub server: ServerSettings,
    pub playback: PlaybackSettings,
    pub watcher: WatcherSettings,
    pub scheduler: SchedulerSettings,
    pub watchdog: WatchdogSettings,
    pub memory: MemorySettings,
    pub audio: AudioSettings,
    pub state: StateSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Fade-out duration when shutting down (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            quit_fade_out_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface the HTTP/WebSocket listener binds to.
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Volume applied when no saved state exists, in `[0, 1]`.
    pub default_volume: f32,
    /// Whether shuffle starts enabled when no saved state exists.
    pub shuffle: bool,
    /// How many previously played indices are remembered.
    pub history_size: usize,
    /// How many of the most recent plays are excluded from shuffle picks.
    pub shuffle_window: usize,
    /// How many recently loaded paths are kept warm before eviction.
    pub recent_cache_size: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            default_volume: 0.5,
            shuffle: false,
            history_size: 10,
            shuffle_window: 5,
            recent_cache_size: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    /// End-of-track polling interval (milliseconds).
    pub poll_interval_ms: u64,
    /// Seconds without local or remote activity before idle cleanup runs.
    pub idle_timeout_secs: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            idle_timeout_secs: 180,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub enabled: bool,
    /// Local time (`HH:MM`) at which playback pauses every day.
    pub pause_time: String,
    /// Local time (`HH:MM`) at which playback resumes every day.
    pub resume_time: String,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            pause_time: "19:00".to_string(),
            resume_time: "10:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchdogSettings {
    /// How often the monitor checks the heartbeat (seconds).
    pub check_interval_secs: u64,
    /// How often the heartbeat task proves the player is responsive (seconds).
    pub heartbeat_secs: u64,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: 30,
            heartbeat_secs: 15,
        }
    }
}

/// Periodic memory-pressure checks. Percentages refer to system memory in use.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub enabled: bool,
    pub check_interval_secs: u64,
    /// Above this, cached player resources are released (at most once per `release_cooldown_secs`).
    pub release_threshold_percent: f32,
    /// Above this, resources are released on every check and the pressure is logged as an error.
    pub critical_threshold_percent: f32,
    pub release_cooldown_secs: u64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: 60,
            release_threshold_percent: 85.0,
            critical_threshold_percent: 90.0,
            release_cooldown_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StateSettings {
    /// Where the session snapshot is persisted. Defaults to the XDG state dir.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    /// The file name including its extension.
    #[serde(alias = "file_name", alias = "name")]
    FileName,
    Title,
    Artist,
    Album,
    /// The file name without extension.
    Stem,
    Path,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Music folder to scan. The first command-line argument overrides it.
    pub folder: Option<PathBuf>,
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// Sub-folder holding loudness-normalized copies of the library.
    pub normalized_dir: String,

    /// Which fields to use to build `Track.display_name`.
    ///
    /// Example: ["artist", "title"] -> "Artist - Title"
    pub display_fields: Vec<TrackDisplayField>,
    /// Separator used to join `display_fields`.
    pub display_separator: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            folder: None,
            extensions: vec!["mp3".into(), "wav".into(), "ogg".into(), "flac".into()],
            follow_links: true,
            include_hidden: false,
            recursive: false,
            max_depth: None,
            normalized_dir: "normalized".to_string(),
            display_fields: vec![TrackDisplayField::FileName],
            display_separator: " - ".to_string(),
        }
    }
}

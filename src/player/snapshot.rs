use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Point-in-time view of the player sent to clients and persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub current_index: usize,
    pub volume: f32,
    pub paused: bool,
    #[serde(rename = "shuffle")]
    pub shuffle_on: bool,
    pub current_track: Option<String>,
    pub playing: bool,
}

/// State read back at startup. Older files spell the shuffle flag `shuffle_on`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedState {
    pub current_index: usize,
    #[serde(rename = "shuffle", alias = "shuffle_on")]
    pub shuffle_on: bool,
    pub volume: f32,
    pub paused: bool,
}

impl Default for SavedState {
    fn default() -> Self {
        Self {
            current_index: 0,
            shuffle_on: false,
            volume: 0.5,
            paused: false,
        }
    }
}

/// What the end-of-track watcher needs from one locked read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackProbe {
    pub paused: bool,
    pub busy: bool,
    pub position: Duration,
    pub generation: u64,
}

use serde::Serialize;
use tracing::error;

use crate::library::{Track, format_duration};
use crate::player::Snapshot;

/// Entry of the song list shown by clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongEntry {
    pub name: String,
    pub duration: String,
}

pub fn song_list(tracks: &[Track]) -> Vec<SongEntry> {
    tracks
        .iter()
        .map(|t| SongEntry {
            name: t.display_name.clone(),
            duration: format_duration(t.duration),
        })
        .collect()
}

/// JSON object sent to clients. Absent parts are left out entirely.
#[derive(Debug, Default, Serialize)]
pub struct Outgoing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Snapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub songs: Option<Vec<SongEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Outgoing {
    pub fn state(state: Snapshot) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    pub fn catalog(state: Snapshot, songs: Vec<SongEntry>) -> Self {
        Self {
            state: Some(state),
            songs: Some(songs),
            message: None,
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        self.message = Some(text.into());
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            error!("Failed to encode outgoing message: {e}");
            String::from("{}")
        })
    }
}

//! Audio-related small types.
//!
//! This module defines the command protocol spoken with the audio thread,
//! the status it reports back and the errors a load can produce.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("audio output device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("audio thread is not running")]
    Disconnected,
}

#[derive(Debug)]
pub enum AudioCmd {
    /// Decode `path` into a fresh paused sink, replacing the current one on success.
    Load {
        path: PathBuf,
        reply: Sender<Result<(), OutputError>>,
    },
    /// Start or resume the loaded sink.
    Play,
    /// Pause the loaded sink.
    Pause,
    /// Stop and drop the loaded sink.
    Stop,
    SetVolume(f32),
    /// Report the current output status.
    Status(Sender<OutputStatus>),
    /// Drop the sink if it has nothing left to play.
    ReleaseIdle,
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

/// Point-in-time view of the output device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutputStatus {
    /// A sink is loaded, still has queued audio and is not paused.
    pub busy: bool,
    /// Playback position within the loaded track.
    pub position: Duration,
    pub volume: f32,
}

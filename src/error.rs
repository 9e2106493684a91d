//! Error types for player operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by [`crate::player::Player`] operations.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("the library is empty")]
    EmptyCatalog,

    #[error("cannot load {}: {reason}", .path.display())]
    TrackLoad { path: PathBuf, reason: String },

    #[error("index {index} out of range (library has {len} tracks)")]
    InvalidIndex { index: usize, len: usize },

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("player has been shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, PlayerError>;

//! Session state persistence.
//!
//! The player state is saved as a small JSON document after every change and
//! read back once at startup. Save failures are logged and otherwise ignored.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::player::{SavedState, Snapshot};

/// Where snapshots go between runs.
pub trait StateStore: Send + Sync {
    fn save(&self, snapshot: &Snapshot);
    fn load(&self) -> Option<SavedState>;
}

pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StateStore for JsonStateFile {
    fn save(&self, snapshot: &Snapshot) {
        match self.write(snapshot) {
            Ok(()) => debug!("Saved state to {}", self.path.display()),
            Err(e) => warn!("Failed to save state to {}: {e:#}", self.path.display()),
        }
    }

    fn load(&self) -> Option<SavedState> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No saved state at {}: {e}", self.path.display());
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Ignoring unreadable state file {}: {e}", self.path.display());
                None
            }
        }
    }
}

/// Keeps snapshots in memory.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    saved: std::sync::Mutex<Vec<Snapshot>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn saves(&self) -> Vec<Snapshot> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(test)]
impl StateStore for MemoryStore {
    fn save(&self, snapshot: &Snapshot) {
        self.saved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(snapshot.clone());
    }

    fn load(&self) -> Option<SavedState> {
        None
    }
}

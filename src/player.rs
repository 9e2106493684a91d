//! Playback state machine.
//!
//! [`Player`] owns the catalog, the playback cursor and the audio output.
//! Every public method takes the single player lock, works on the unlocked
//! [`machine::PlayerCore`] and, when it mutates, returns the snapshot computed
//! before the lock is released. Callers therefore never broadcast a stale
//! state.

mod history;
mod machine;
mod snapshot;

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use crate::audio::AudioOutput;
use crate::config::PlaybackSettings;
use crate::error::{PlayerError, Result};
use crate::library::Track;

use self::machine::PlayerCore;
pub use snapshot::{PlaybackProbe, SavedState, Snapshot};

pub struct Player {
    core: Mutex<PlayerCore>,
}

/// Outcome of pointing a catalog entry at its normalized rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedSwap {
    Applied,
    UnknownTrack,
    /// Another entry already plays from the normalized path.
    PathTaken,
}

impl Player {
    /// Build a player over a non-empty catalog. Nothing is loaded until
    /// [`Player::restore`] runs.
    pub fn new(
        catalog: Vec<Track>,
        output: Box<dyn AudioOutput>,
        settings: &PlaybackSettings,
    ) -> Result<Self> {
        if catalog.is_empty() {
            return Err(PlayerError::EmptyCatalog);
        }
        Ok(Self {
            core: Mutex::new(PlayerCore::new(catalog, output, settings)),
        })
    }

    // A panic while holding the lock must not wedge every other actor.
    fn lock(&self) -> MutexGuard<'_, PlayerCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate(&self, op: impl FnOnce(&mut PlayerCore) -> Result<()>) -> Result<Snapshot> {
        let mut core = self.lock();
        op(&mut core)?;
        Ok(core.snapshot())
    }

    /// Apply a saved session (or the defaults) and start playback unless it was paused.
    pub fn restore(&self, saved: Option<SavedState>) -> Snapshot {
        let mut core = self.lock();
        core.restore(saved);
        core.snapshot()
    }

    pub fn play(&self) -> Result<Snapshot> {
        self.mutate(PlayerCore::play)
    }

    pub fn pause(&self) -> Result<Snapshot> {
        self.mutate(PlayerCore::pause)
    }

    /// Move to the requested paused state. `None` when already there.
    pub fn set_paused(&self, paused: bool) -> Result<Option<Snapshot>> {
        let mut core = self.lock();
        if core.paused == paused {
            return Ok(None);
        }
        core.pause()?;
        Ok(Some(core.snapshot()))
    }

    pub fn next(&self) -> Result<Snapshot> {
        self.mutate(PlayerCore::next)
    }

    pub fn back(&self) -> Result<Snapshot> {
        self.mutate(PlayerCore::back)
    }

    pub fn play_track(&self, index: usize) -> Result<Snapshot> {
        self.mutate(|core| core.play_track(index))
    }

    /// Set the output volume, clamped to `0.0..=1.0`.
    pub fn set_volume(&self, volume: f32) -> Result<Snapshot> {
        self.mutate(|core| core.set_volume(volume))
    }

    pub fn volume(&self) -> f32 {
        self.lock().volume()
    }

    pub fn toggle_shuffle(&self) -> Result<Snapshot> {
        self.mutate(PlayerCore::toggle_shuffle)
    }

    /// Delete the file behind `index` and drop it from the catalog.
    ///
    /// Returns the new state together with the catalog it refers to, both
    /// read under the same lock.
    pub fn delete_track(&self, index: usize) -> Result<(Snapshot, Vec<Track>)> {
        let mut core = self.lock();
        core.delete_track(index)?;
        Ok((core.snapshot(), core.catalog.clone()))
    }

    /// Swap in a freshly scanned catalog.
    pub fn replace_catalog(&self, tracks: Vec<Track>) -> (Snapshot, Vec<Track>) {
        let mut core = self.lock();
        core.replace_catalog(tracks);
        (core.snapshot(), core.catalog.clone())
    }

    /// Point the entry for `original` at its normalized rendition.
    pub fn apply_normalized(&self, original: &Path, normalized: &Path) -> NormalizedSwap {
        self.lock().apply_normalized(original, normalized)
    }

    pub fn release_resources(&self) {
        self.lock().release_resources();
    }

    pub fn current_state(&self) -> Snapshot {
        self.lock().snapshot()
    }

    /// Snapshot without waiting for the lock.
    pub fn try_current_state(&self) -> Option<Snapshot> {
        match self.core.try_lock() {
            Ok(core) => Some(core.snapshot()),
            Err(TryLockError::Poisoned(e)) => Some(e.into_inner().snapshot()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.lock().catalog.clone()
    }

    /// State and catalog read together.
    pub fn view(&self) -> (Snapshot, Vec<Track>) {
        let core = self.lock();
        (core.snapshot(), core.catalog.clone())
    }

    pub fn probe(&self) -> PlaybackProbe {
        self.lock().probe()
    }

    /// Advance after the track loaded at `generation` ran out.
    ///
    /// `None` means nothing was done: the track was replaced or paused in the
    /// meantime, or output is busy again.
    pub fn advance_after_end(&self, generation: u64) -> Option<Result<Snapshot>> {
        let mut core = self.lock();
        let outcome = core.advance_after_end(generation)?;
        Some(outcome.map(|()| core.snapshot()))
    }

    /// Stop output and release the device. Safe to call more than once.
    pub fn cleanup(&self, fade_out: Duration) {
        self.lock().cleanup(fade_out);
    }
}

#[cfg(test)]
mod tests;

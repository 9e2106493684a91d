use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};

use crate::audio::AudioOutput;
use crate::config::PlaybackSettings;
use crate::error::{PlayerError, Result};
use crate::library::Track;

use super::NormalizedSwap;
use super::history::{PlayHistory, RecentPaths, pick_next_index};
use super::snapshot::{PlaybackProbe, SavedState, Snapshot};

/// Player state and the output it drives. Nothing here locks; the owning
/// [`super::Player`] holds the mutex around every call.
pub(super) struct PlayerCore {
    pub(super) catalog: Vec<Track>,
    pub(super) current_index: usize,
    pub(super) paused: bool,
    pub(super) shuffle_on: bool,
    history: PlayHistory,
    recent: RecentPaths,
    shuffle_window: usize,
    generation: u64,
    closed: bool,
    output: Box<dyn AudioOutput>,
    rng: StdRng,
}

impl PlayerCore {
    pub fn new(
        catalog: Vec<Track>,
        mut output: Box<dyn AudioOutput>,
        settings: &PlaybackSettings,
    ) -> Self {
        output.set_volume(settings.default_volume.clamp(0.0, 1.0));
        Self {
            catalog,
            current_index: 0,
            paused: true,
            shuffle_on: settings.shuffle,
            history: PlayHistory::new(settings.history_size),
            recent: RecentPaths::new(settings.recent_cache_size),
            shuffle_window: settings.shuffle_window,
            generation: 0,
            closed: false,
            output,
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(PlayerError::Closed);
        }
        Ok(())
    }

    fn ensure_playable(&self) -> Result<()> {
        self.ensure_open()?;
        if self.catalog.is_empty() {
            return Err(PlayerError::EmptyCatalog);
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.catalog.len() {
            return Err(PlayerError::InvalidIndex {
                index,
                len: self.catalog.len(),
            });
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        let status = self.output.status();
        Snapshot {
            current_index: self.current_index,
            volume: status.volume,
            paused: self.paused,
            shuffle_on: self.shuffle_on,
            current_track: self
                .catalog
                .get(self.current_index)
                .map(|t| t.display_name.clone()),
            playing: !self.paused && status.busy,
        }
    }

    pub fn probe(&self) -> PlaybackProbe {
        let status = self.output.status();
        PlaybackProbe {
            paused: self.paused,
            busy: status.busy,
            position: status.position,
            generation: self.generation,
        }
    }

    /// Load `index` into the output without starting it. On failure
    /// nothing changes and the previous track stays loaded.
    fn load(&mut self, index: usize) -> Result<()> {
        let path = self.catalog[index].path.clone();
        if let Err(e) = self.output.load(&path) {
            error!("Failed to load {}: {e}", path.display());
            return Err(PlayerError::TrackLoad {
                path,
                reason: e.to_string(),
            });
        }

        self.current_index = index;
        self.generation = self.generation.wrapping_add(1);
        for evicted in self.recent.touch(&path) {
            debug!("Evicted {} from recent cache", evicted.display());
        }
        info!("Loaded {}", self.catalog[index].display_name);
        Ok(())
    }

    fn start(&mut self) {
        self.output.play();
        self.paused = false;
    }

    fn load_and_start(&mut self, index: usize) -> Result<()> {
        self.load(index)?;
        self.start();
        Ok(())
    }

    pub fn restore(&mut self, saved: Option<SavedState>) {
        if self.ensure_playable().is_err() {
            return;
        }
        let saved = saved.unwrap_or_default();
        self.current_index = saved.current_index.min(self.catalog.len() - 1);
        self.shuffle_on = saved.shuffle_on;
        if saved.volume.is_finite() {
            self.output.set_volume(saved.volume.clamp(0.0, 1.0));
        }

        let index = self.current_index;
        let result = if saved.paused {
            self.load(index)
        } else {
            self.load_and_start(index)
        };
        if let Err(e) = result {
            warn!("Could not restore playback: {e}");
            self.paused = true;
        } else {
            self.paused = saved.paused;
        }
    }

    pub fn play(&mut self) -> Result<()> {
        self.ensure_playable()?;
        let index = self.current_index;
        if self.paused {
            self.output.play();
            if self.output.status().busy {
                self.paused = false;
                return Ok(());
            }
            warn!("Resume left output idle; reloading current track");
        }
        self.load_and_start(index)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.catalog.is_empty() {
            self.paused = true;
            return Ok(());
        }
        if self.paused {
            return self.play();
        }
        self.output.pause();
        self.paused = true;
        Ok(())
    }

    fn avoid_set(&self, cursor: usize, skipped: &[usize]) -> Vec<usize> {
        let mut avoid: Vec<usize> = self.history.recent(self.shuffle_window).collect();
        avoid.push(self.current_index);
        avoid.push(cursor);
        avoid.extend_from_slice(skipped);
        avoid
    }

    fn pick_next(&mut self, cursor: usize, skipped: &[usize]) -> usize {
        let avoid = self.avoid_set(cursor, skipped);
        pick_next_index(
            cursor,
            self.catalog.len(),
            self.shuffle_on,
            &avoid,
            &mut self.rng,
        )
    }

    pub fn next(&mut self) -> Result<()> {
        self.ensure_playable()?;
        let previous = self.current_index;
        let target = self.pick_next(previous, &[]);
        self.load_and_start(target)?;
        self.history.push(previous);
        Ok(())
    }

    /// Advance like [`Self::next`], skipping tracks that fail to load.
    /// Each catalog entry is tried at most once.
    fn next_skipping_broken(&mut self) -> Result<()> {
        self.ensure_playable()?;
        let previous = self.current_index;
        let mut cursor = previous;
        let mut skipped = Vec::new();
        let mut last_err = PlayerError::EmptyCatalog;

        for _ in 0..self.catalog.len() {
            let target = self.pick_next(cursor, &skipped);
            match self.load_and_start(target) {
                Ok(()) => {
                    self.history.push(previous);
                    return Ok(());
                }
                Err(e @ PlayerError::TrackLoad { .. }) => {
                    warn!("Skipping unplayable track at index {target}");
                    skipped.push(target);
                    cursor = target;
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }

        error!("No playable track left; pausing");
        self.paused = true;
        Err(last_err)
    }

    /// Called by the end-of-track watcher. Returns `None` when another actor
    /// got there first or the player is no longer in a state that should advance.
    pub fn advance_after_end(&mut self, generation: u64) -> Option<Result<()>> {
        if self.closed || self.catalog.is_empty() || self.paused {
            return None;
        }
        if generation != self.generation || self.output.status().busy {
            return None;
        }
        Some(self.next_skipping_broken())
    }

    pub fn back(&mut self) -> Result<()> {
        self.ensure_playable()?;
        let len = self.catalog.len();
        let target = (self.current_index + len - 1) % len;
        self.load_and_start(target)
    }

    pub fn play_track(&mut self, index: usize) -> Result<()> {
        self.ensure_playable()?;
        self.check_index(index)?;
        self.load_and_start(index)
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.ensure_open()?;
        self.output.set_volume(volume.clamp(0.0, 1.0));
        Ok(())
    }

    pub fn volume(&self) -> f32 {
        self.output.status().volume
    }

    pub fn toggle_shuffle(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.shuffle_on = !self.shuffle_on;
        info!("Shuffle {}", if self.shuffle_on { "on" } else { "off" });
        Ok(())
    }

    pub fn delete_track(&mut self, index: usize) -> Result<()> {
        self.ensure_open()?;
        self.check_index(index)?;

        let path = self.catalog[index].path.clone();
        if !path.exists() {
            return Err(PlayerError::FileNotFound(path));
        }

        let deleting_current = index == self.current_index;
        let was_playing = !self.paused;
        if deleting_current {
            self.output.stop();
        }

        if let Err(e) = fs::remove_file(&path) {
            if deleting_current {
                self.reload_after_failed_delete(index, was_playing);
            }
            return Err(delete_error(&path, e));
        }
        info!("Deleted {}", path.display());

        self.catalog.remove(index);
        self.recent.forget(&path);
        self.history.remove_index(index);

        if self.catalog.is_empty() {
            self.current_index = 0;
            self.paused = true;
            info!("Library is now empty");
            return Ok(());
        }

        if deleting_current {
            let replacement = if index < self.catalog.len() { index } else { 0 };
            if let Err(e) = self.load_and_start(replacement) {
                warn!("Replacement track failed to start: {e}");
                self.current_index = replacement;
                self.paused = true;
            }
        } else if index < self.current_index {
            self.current_index -= 1;
        }
        Ok(())
    }

    fn reload_after_failed_delete(&mut self, index: usize, was_playing: bool) {
        let result = if was_playing {
            self.load_and_start(index)
        } else {
            self.load(index)
        };
        if let Err(e) = result {
            warn!("Could not reload track after failed delete: {e}");
            self.paused = true;
        }
    }

    pub fn replace_catalog(&mut self, tracks: Vec<Track>) {
        let current_path = self
            .catalog
            .get(self.current_index)
            .map(|t| t.path.clone());
        self.catalog = tracks;
        self.history.clear();

        if self.catalog.is_empty() {
            self.output.stop();
            self.current_index = 0;
            self.paused = true;
            info!("Library replaced with an empty catalog");
            return;
        }

        match current_path.and_then(|p| self.catalog.iter().position(|t| t.path == p)) {
            Some(i) => self.current_index = i,
            None => {
                self.output.stop();
                self.current_index = 0;
                self.paused = true;
            }
        }
        info!("Library replaced: {} tracks", self.catalog.len());
    }

    pub fn apply_normalized(&mut self, original: &Path, normalized: &Path) -> NormalizedSwap {
        let Some(index) = self.catalog.iter().position(|t| t.path == original) else {
            return NormalizedSwap::UnknownTrack;
        };
        let taken = self
            .catalog
            .iter()
            .enumerate()
            .any(|(i, t)| i != index && t.path == normalized);
        if taken {
            warn!(
                "Normalized file {} already belongs to another track",
                normalized.display()
            );
            return NormalizedSwap::PathTaken;
        }

        let track = &mut self.catalog[index];
        track.path = normalized.to_path_buf();
        track.normalized = true;
        debug!("Using normalized file {}", normalized.display());
        NormalizedSwap::Applied
    }

    pub fn release_resources(&mut self) {
        debug!("Releasing {} cached paths", self.recent.len());
        self.recent.clear();
        self.output.release_idle();
    }

    pub fn cleanup(&mut self, fade_out: Duration) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.output.shutdown(fade_out);
        self.recent.clear();
        info!("Player shut down");
    }

    #[cfg(test)]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

fn delete_error(path: &Path, e: io::Error) -> PlayerError {
    match e.kind() {
        io::ErrorKind::NotFound => PlayerError::FileNotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => PlayerError::PermissionDenied(path.to_path_buf()),
        _ => PlayerError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    }
}

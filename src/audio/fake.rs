//! In-memory `AudioOutput` for tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::output::AudioOutput;
use super::types::{OutputError, OutputStatus};

#[derive(Debug, Default)]
pub struct FakeState {
    pub loaded: Option<PathBuf>,
    pub playing: bool,
    pub finished: bool,
    /// Set once the loaded track has been started at least once.
    pub started: bool,
    pub position: Duration,
    pub volume: f32,
    pub broken: HashSet<PathBuf>,
    /// When set, `play` after a pause leaves the output silent.
    pub resume_fails: bool,
    pub loads: Vec<PathBuf>,
    pub releases: usize,
    pub shutdowns: usize,
}

/// Cloneable handle; clones share state so tests can inspect what the player did.
#[derive(Debug, Clone, Default)]
pub struct FakeOutput {
    state: Arc<Mutex<FakeState>>,
}

impl FakeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.state().broken.insert(path.into());
    }

    /// Pretend the loaded track ran out.
    pub fn finish_track(&self) {
        let mut s = self.state();
        s.playing = false;
        s.finished = true;
    }

    pub fn loaded(&self) -> Option<PathBuf> {
        self.state().loaded.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state().playing
    }

    /// Hold the output lock on another thread until the returned guard drops.
    /// Any player call that touches the output blocks meanwhile.
    pub fn wedge(&self) -> Wedge {
        let (release, released) = mpsc::channel::<()>();
        let (held_tx, held) = mpsc::channel();
        let out = self.clone();
        let thread = thread::spawn(move || {
            let _guard = out.state();
            let _ = held_tx.send(());
            let _ = released.recv();
        });
        let _ = held.recv();
        Wedge {
            release: Some(release),
            thread: Some(thread),
        }
    }
}

pub struct Wedge {
    release: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Wedge {
    fn drop(&mut self) {
        self.release.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl AudioOutput for FakeOutput {
    fn load(&mut self, path: &Path) -> Result<(), OutputError> {
        let mut s = self.state();
        if s.broken.contains(path) {
            return Err(OutputError::Decode {
                path: path.to_path_buf(),
                reason: "unsupported format".to_string(),
            });
        }
        s.loaded = Some(path.to_path_buf());
        s.playing = false;
        s.finished = false;
        s.started = false;
        s.position = Duration::ZERO;
        s.loads.push(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self) {
        let mut s = self.state();
        if s.loaded.is_none() || s.finished || (s.started && s.resume_fails) {
            return;
        }
        s.playing = true;
        s.started = true;
        s.position += Duration::from_millis(500);
    }

    fn pause(&mut self) {
        self.state().playing = false;
    }

    fn stop(&mut self) {
        let mut s = self.state();
        s.loaded = None;
        s.playing = false;
    }

    fn status(&self) -> OutputStatus {
        let s = self.state();
        OutputStatus {
            busy: s.playing,
            position: s.position,
            volume: s.volume,
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.state().volume = volume;
    }

    fn release_idle(&mut self) {
        self.state().releases += 1;
    }

    fn shutdown(&mut self, _fade_out: Duration) {
        let mut s = self.state();
        s.shutdowns += 1;
        s.loaded = None;
        s.playing = false;
    }
}

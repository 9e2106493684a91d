use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use super::thread::spawn_audio_thread;
use super::types::{AudioCmd, OutputError, OutputStatus};

/// A single-track audio sink the player drives.
///
/// Implementations hold at most one loaded track. `load` must leave the
/// previously loaded track untouched when it fails.
pub trait AudioOutput: Send {
    /// Decode `path` and hold it paused, replacing whatever was loaded.
    fn load(&mut self, path: &Path) -> Result<(), OutputError>;
    /// Start or resume the loaded track. A no-op when nothing is loaded.
    fn play(&mut self);
    fn pause(&mut self);
    /// Stop and drop the loaded track, closing its file.
    fn stop(&mut self);
    fn status(&self) -> OutputStatus;
    fn set_volume(&mut self, volume: f32);
    /// Drop buffers that have finished playing.
    fn release_idle(&mut self);
    /// Stop output for good. Later calls are no-ops.
    fn shutdown(&mut self, fade_out: Duration);
}

/// `AudioOutput` backed by a rodio stream living on a dedicated thread.
pub struct RodioOutput {
    tx: Sender<AudioCmd>,
    join: Option<JoinHandle<()>>,
}

impl RodioOutput {
    /// Open the default output device.
    pub fn open() -> Result<Self, OutputError> {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let join = spawn_audio_thread(rx, ready_tx);

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx,
                join: Some(join),
            }),
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                let _ = join.join();
                Err(OutputError::Disconnected)
            }
        }
    }

    fn send(&self, cmd: AudioCmd) {
        if self.tx.send(cmd).is_err() {
            warn!("Audio thread is gone; command dropped");
        }
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, path: &Path) -> Result<(), OutputError> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(AudioCmd::Load {
                path: path.to_path_buf(),
                reply,
            })
            .map_err(|_| OutputError::Disconnected)?;
        rx.recv().map_err(|_| OutputError::Disconnected)?
    }

    fn play(&mut self) {
        self.send(AudioCmd::Play);
    }

    fn pause(&mut self) {
        self.send(AudioCmd::Pause);
    }

    fn stop(&mut self) {
        self.send(AudioCmd::Stop);
    }

    fn status(&self) -> OutputStatus {
        let (reply, rx) = mpsc::channel();
        if self.tx.send(AudioCmd::Status(reply)).is_err() {
            return OutputStatus::default();
        }
        rx.recv().unwrap_or_default()
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(AudioCmd::SetVolume(volume));
    }

    fn release_idle(&mut self) {
        self.send(AudioCmd::ReleaseIdle);
    }

    fn shutdown(&mut self, fade_out: Duration) {
        let Some(join) = self.join.take() else {
            return;
        };
        let _ = self.tx.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });
        if join.join().is_err() {
            warn!("Audio thread panicked during shutdown");
        }
        debug!("Audio output closed");
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.shutdown(Duration::ZERO);
    }
}

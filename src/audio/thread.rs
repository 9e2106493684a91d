use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use rodio::{OutputStreamBuilder, Sink};
use tracing::{debug, info};

use super::sink::create_sink;
use super::types::{AudioCmd, OutputError, OutputStatus};

/// Spawn the thread that owns the output stream and the single loaded sink.
///
/// The outcome of opening the default device is reported once on `ready`
/// before any command is processed.
pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    ready: Sender<Result<(), OutputError>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready.send(Err(OutputError::DeviceUnavailable(e.to_string())));
                return;
            }
        };
        // rodio logs to stderr when OutputStream is dropped; shutdown is already logged.
        stream.log_on_drop(false);
        let _ = ready.send(Ok(()));
        info!("Audio output opened");

        let mut sink: Option<Sink> = None;
        let mut volume: f32 = 1.0;

        fn fade_out_sink(sink: &Sink, from: f32, fade_out_ms: u64) {
            if fade_out_ms == 0 {
                sink.set_volume(0.0);
                return;
            }
            let steps: u64 = 20;
            let step_ms = (fade_out_ms / steps).max(1);
            for step in 1..=steps {
                let t = step as f32 / steps as f32;
                sink.set_volume(from * (1.0 - t));
                thread::sleep(Duration::from_millis(step_ms));
            }
            sink.set_volume(0.0);
        }

        while let Ok(cmd) = rx.recv() {
            match cmd {
                AudioCmd::Load { path, reply } => {
                    let result = create_sink(&stream, &path).map(|new_sink| {
                        new_sink.set_volume(volume);
                        if let Some(old) = sink.take() {
                            old.stop();
                        }
                        sink = Some(new_sink);
                    });
                    let _ = reply.send(result);
                }
                AudioCmd::Play => {
                    if let Some(ref s) = sink {
                        s.play();
                    }
                }
                AudioCmd::Pause => {
                    if let Some(ref s) = sink {
                        s.pause();
                    }
                }
                AudioCmd::Stop => {
                    if let Some(s) = sink.take() {
                        s.stop();
                    }
                }
                AudioCmd::SetVolume(v) => {
                    volume = v;
                    if let Some(ref s) = sink {
                        s.set_volume(v);
                    }
                }
                AudioCmd::Status(reply) => {
                    let status = match sink {
                        Some(ref s) => OutputStatus {
                            busy: !s.empty() && !s.is_paused(),
                            position: s.get_pos(),
                            volume,
                        },
                        None => OutputStatus {
                            volume,
                            ..OutputStatus::default()
                        },
                    };
                    let _ = reply.send(status);
                }
                AudioCmd::ReleaseIdle => {
                    if sink.as_ref().is_some_and(Sink::empty) {
                        debug!("Dropping finished sink");
                        sink = None;
                    }
                }
                AudioCmd::Quit { fade_out_ms } => {
                    if let Some(s) = sink.take() {
                        if !s.is_paused() && !s.empty() {
                            fade_out_sink(&s, volume, fade_out_ms);
                        }
                        s.stop();
                    }
                    break;
                }
            }
        }
        debug!("Audio thread exiting");
    })
}

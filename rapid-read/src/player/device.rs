//! Audio output abstraction and the rodio speaker backend.

use anyhow::{Context, Result, anyhow};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Playback handle for one loaded audio artifact.
///
/// The playback controller owns at most one live handle at a time and
/// stops it before loading the next.
pub trait AudioHandle: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    /// Current playback position in milliseconds.
    fn position_ms(&self) -> u64;
    fn is_playing(&self) -> bool;
}

/// Creates playback handles from audio files.
pub trait AudioOutput: Send + Sync {
    fn load(&self, path: &Path) -> Result<Box<dyn AudioHandle>>;
}

enum StreamRequest {
    Load(PathBuf, mpsc::Sender<std::result::Result<rodio::Sink, String>>),
}

/// Speaker output backed by rodio.
///
/// The cpal output stream is not `Send`, so a dedicated thread owns it and
/// hands out `Sink` controls over a channel.
pub struct SpeakerOutput {
    tx: mpsc::Sender<StreamRequest>,
}

impl SpeakerOutput {
    /// Open the default audio output device.
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::channel::<StreamRequest>();
        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<(), String>>();

        std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let mut stream = match rodio::OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                stream.log_on_drop(false);
                let _ = ready_tx.send(Ok(()));

                while let Ok(StreamRequest::Load(path, reply)) = rx.recv() {
                    let result = open_sink(&stream, &path);
                    let _ = reply.send(result);
                }
            })
            .context("failed to spawn audio output thread")?;

        ready_rx
            .recv()
            .context("audio output thread exited before reporting readiness")?
            .map_err(|e| anyhow!("failed to open default audio output: {e}"))?;

        Ok(Self { tx })
    }
}

fn open_sink(stream: &rodio::OutputStream, path: &Path) -> std::result::Result<rodio::Sink, String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    let source = rodio::Decoder::new(BufReader::new(file))
        .map_err(|e| format!("failed to decode {}: {e}", path.display()))?;

    let sink = rodio::Sink::connect_new(stream.mixer());
    // Loaded paused so the controller decides when audio starts.
    sink.pause();
    sink.append(source);
    Ok(sink)
}

impl AudioOutput for SpeakerOutput {
    fn load(&self, path: &Path) -> Result<Box<dyn AudioHandle>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(StreamRequest::Load(path.to_path_buf(), reply_tx))
            .map_err(|_| anyhow!("audio output thread is gone"))?;

        let sink = reply_rx
            .recv()
            .context("audio output thread dropped the load request")?
            .map_err(|e| anyhow!(e))?;

        Ok(Box::new(SinkHandle { sink }))
    }
}

struct SinkHandle {
    sink: rodio::Sink,
}

impl AudioHandle for SinkHandle {
    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn resume(&mut self) {
        self.sink.play();
    }

    fn stop(&mut self) {
        self.sink.stop();
    }

    fn position_ms(&self) -> u64 {
        self.sink.get_pos().as_millis() as u64
    }

    fn is_playing(&self) -> bool {
        !self.sink.is_paused() && !self.sink.empty()
    }
}

//! Local speaker output: an [`AudioUnit`] backed by `rodio`.
//!
//! `rodio::OutputStream` is `!Send` on some platforms, so the stream and the
//! sink live on a dedicated OS thread. [`LocalAudioUnit`] is the `Send + Sync`
//! proxy: every trait call becomes a [`UnitCommand`] on a channel. The thread
//! wakes every [`TICK`] while idle to report position and detect the end of
//! the audio.

use std::io::Cursor;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rodio::decoder::DecoderError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::audio_io::{AudioUnit, MediaErrorCode, MediaEvent, MediaListener};
use crate::resource::ResourceLocator;

/// Position report interval while playing.
const TICK: Duration = Duration::from_millis(250);

/// Upper bound on waiting for the audio thread to answer `play`.
const PLAY_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors raised while bringing up the local audio thread.
#[derive(Debug, thiserror::Error)]
pub enum LocalAudioError {
    /// Failed to open the default output device.
    #[error("Failed to open audio output stream: {0}")]
    OutputStream(String),

    /// The OS refused to spawn the audio thread.
    #[error("Failed to spawn audio thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The audio thread exited before reporting readiness.
    #[error("Audio thread exited during initialisation")]
    ThreadDied,
}

// ── Commands ───────────────────────────────────────────────────────

/// A command sent from the controller side to the audio thread.
enum UnitCommand {
    SetListener(Option<Arc<dyn MediaListener>>),
    Load(ResourceLocator),
    Play {
        reply: mpsc::Sender<Result<(), MediaErrorCode>>,
    },
    Pause,
    Rewind,
    Unload,
    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// `Send + Sync` handle to the dedicated playback thread.
pub struct LocalAudioUnit {
    cmd_tx: mpsc::Sender<UnitCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl LocalAudioUnit {
    /// Spawn the audio thread on the default output device.
    pub fn spawn() -> Result<Self, LocalAudioError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<UnitCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), LocalAudioError>>();

        let thread = thread::Builder::new()
            .name("ladle-audio".into())
            .spawn(move || run(&cmd_rx, &init_tx))?;

        init_rx.recv().map_err(|_| LocalAudioError::ThreadDied)??;
        tracing::info!("Local audio unit initialized on default output device");

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    fn send(&self, cmd: UnitCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::warn!("Audio thread is gone; command dropped");
        }
    }
}

impl AudioUnit for LocalAudioUnit {
    fn set_listener(&self, listener: Option<Arc<dyn MediaListener>>) {
        self.send(UnitCommand::SetListener(listener));
    }

    fn set_source(&self, source: &ResourceLocator) {
        self.send(UnitCommand::Load(source.clone()));
    }

    /// Blocks until the audio thread answers; see [`await_reply`].
    fn play(&self) -> Result<(), MediaErrorCode> {
        let (reply, rx) = mpsc::channel();
        self.cmd_tx
            .send(UnitCommand::Play { reply })
            .map_err(|_| MediaErrorCode::Aborted)?;
        await_reply(&rx, PLAY_REPLY_TIMEOUT)
    }

    fn pause(&self) {
        self.send(UnitCommand::Pause);
    }

    fn rewind(&self) {
        self.send(UnitCommand::Rewind);
    }

    fn unload(&self) {
        self.send(UnitCommand::Unload);
    }
}

impl Drop for LocalAudioUnit {
    fn drop(&mut self) {
        // Best-effort shutdown; the thread may already be dead.
        let _ = self.cmd_tx.send(UnitCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Wait up to `timeout` for the audio thread's answer.
///
/// On a multi-threaded tokio runtime the wait runs under `block_in_place`,
/// so the calling worker hands its other tasks off instead of stalling them.
/// A dead or unresponsive audio thread reads as `Aborted`.
fn await_reply(
    rx: &mpsc::Receiver<Result<(), MediaErrorCode>>,
    timeout: Duration,
) -> Result<(), MediaErrorCode> {
    let wait = || match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!(?timeout, "Audio thread did not answer play in time");
            Err(MediaErrorCode::Aborted)
        }
        Err(RecvTimeoutError::Disconnected) => Err(MediaErrorCode::Aborted),
    };
    match Handle::try_current() {
        Ok(runtime) if runtime.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(wait)
        }
        _ => wait(),
    }
}

// ── Audio thread ───────────────────────────────────────────────────

struct Loaded {
    bytes: Arc<[u8]>,
    sink: Sink,
    duration: Option<Duration>,
}

struct UnitState {
    handle: OutputStreamHandle,
    listener: Option<Arc<dyn MediaListener>>,
    loaded: Option<Loaded>,
    playing: bool,
}

fn run(cmd_rx: &mpsc::Receiver<UnitCommand>, init_tx: &mpsc::Sender<Result<(), LocalAudioError>>) {
    let (stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = init_tx.send(Err(LocalAudioError::OutputStream(e.to_string())));
            return;
        }
    };
    if init_tx.send(Ok(())).is_err() {
        return;
    }

    let mut state = UnitState {
        handle,
        listener: None,
        loaded: None,
        playing: false,
    };

    loop {
        match cmd_rx.recv_timeout(TICK) {
            Ok(UnitCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(cmd) => state.apply(cmd),
            Err(RecvTimeoutError::Timeout) => state.tick(),
        }
    }

    // `stream` and any sink are dropped here, on the audio thread.
    drop(state);
    drop(stream);
    tracing::debug!("Audio thread shutting down");
}

impl UnitState {
    fn apply(&mut self, cmd: UnitCommand) {
        match cmd {
            UnitCommand::SetListener(listener) => self.listener = listener,
            UnitCommand::Load(locator) => self.load(&locator),
            UnitCommand::Play { reply } => {
                let _ = reply.send(self.play());
            }
            UnitCommand::Pause => self.pause(),
            UnitCommand::Rewind => self.rewind(),
            UnitCommand::Unload => {
                self.loaded = None;
                self.playing = false;
            }
            UnitCommand::Shutdown => {}
        }
    }

    fn load(&mut self, locator: &ResourceLocator) {
        self.loaded = None;
        self.playing = false;

        // A released resource no longer resolves.
        let Some(bytes) = locator.resolve() else {
            self.emit(MediaEvent::Error(MediaErrorCode::Network));
            return;
        };

        match self.build_sink(&bytes) {
            Ok((sink, duration)) => {
                tracing::debug!(resource = %locator.id(), ?duration, "Audio loaded");
                self.loaded = Some(Loaded {
                    bytes,
                    sink,
                    duration,
                });
                self.emit(MediaEvent::CanPlayThrough { duration });
            }
            Err(code) => self.emit(MediaEvent::Error(code)),
        }
    }

    /// Decode `bytes` into a fresh, paused sink positioned at the start.
    fn build_sink(&self, bytes: &Arc<[u8]>) -> Result<(Sink, Option<Duration>), MediaErrorCode> {
        let decoder = Decoder::new(Cursor::new(Arc::clone(bytes))).map_err(|e| match e {
            DecoderError::UnrecognizedFormat => MediaErrorCode::SourceNotSupported,
            other => {
                tracing::warn!(error = %other, "Audio decode failed");
                MediaErrorCode::Decode
            }
        })?;
        let duration = decoder.total_duration();

        let sink = Sink::try_new(&self.handle).map_err(|e| {
            tracing::warn!(error = %e, "Failed to create playback sink");
            MediaErrorCode::Unknown
        })?;
        sink.pause();
        sink.append(decoder);
        Ok((sink, duration))
    }

    fn play(&mut self) -> Result<(), MediaErrorCode> {
        let Some(loaded) = &self.loaded else {
            return Err(MediaErrorCode::Aborted);
        };
        if loaded.sink.empty() {
            // Drained: start over like a media element does after `ended`.
            self.rebuild()?;
        }
        if let Some(loaded) = &self.loaded {
            loaded.sink.play();
        }
        self.playing = true;
        self.emit(MediaEvent::Playing);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(loaded) = &self.loaded {
            if self.playing {
                loaded.sink.pause();
                self.playing = false;
                self.emit(MediaEvent::Paused);
            }
        }
    }

    fn rewind(&mut self) {
        if self.loaded.is_none() {
            return;
        }
        match self.rebuild() {
            Ok(()) => {
                if self.playing {
                    if let Some(loaded) = &self.loaded {
                        loaded.sink.play();
                    }
                }
            }
            Err(code) => {
                self.playing = false;
                self.emit(MediaEvent::Error(code));
            }
        }
    }

    fn rebuild(&mut self) -> Result<(), MediaErrorCode> {
        let Some(bytes) = self.loaded.as_ref().map(|l| Arc::clone(&l.bytes)) else {
            return Err(MediaErrorCode::Aborted);
        };
        let (sink, duration) = self.build_sink(&bytes)?;
        self.loaded = Some(Loaded {
            bytes,
            sink,
            duration,
        });
        Ok(())
    }

    fn tick(&mut self) {
        if !self.playing {
            return;
        }
        let Some(loaded) = &self.loaded else {
            return;
        };

        let duration = loaded.duration;
        if loaded.sink.empty() {
            self.playing = false;
            let end = duration.unwrap_or_else(|| loaded.sink.get_pos());
            self.emit(MediaEvent::TimeUpdate {
                position: end,
                duration,
            });
            self.emit(MediaEvent::Ended);
        } else {
            let position = loaded.sink.get_pos();
            self.emit(MediaEvent::TimeUpdate { position, duration });
        }
    }

    fn emit(&self, event: MediaEvent) {
        if let Some(listener) = &self.listener {
            listener.on_media_event(event);
        }
    }
}

//! Synthesize command handler.
//!
//! Runs the text through the playback controller with a file-backed audio
//! unit, so the payload goes through exactly the validation narration uses,
//! then writes the audio to disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use ladle_voice::{
    AudioUnit, MediaErrorCode, MediaEvent, MediaListener, ResourceLocator, SpeakOptions,
    SpeakOutcome, SpeechPlayback,
};

use crate::bootstrap::CliContext;
use crate::commands::VoiceArgs;
use crate::error::CliError;

/// Audio unit that "loads" a source by writing its bytes to a file.
pub struct FileUnit {
    path: PathBuf,
    listener: Mutex<Option<Arc<dyn MediaListener>>>,
    outcome: Mutex<Option<Result<usize, String>>>,
}

impl FileUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            listener: Mutex::new(None),
            outcome: Mutex::new(None),
        }
    }

    /// Bytes written by the last load, or the write error.
    pub fn outcome(&self) -> Option<Result<usize, String>> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn emit(&self, event: MediaEvent) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener.on_media_event(event);
        }
    }

    fn write(&self, source: &ResourceLocator) -> Result<usize, String> {
        let bytes = source
            .resolve()
            .ok_or_else(|| format!("{} was released before it could be written", source.id()))?;
        std::fs::write(&self.path, &bytes)
            .map_err(|e| format!("{}: {e}", self.path.display()))?;
        Ok(bytes.len())
    }
}

impl AudioUnit for FileUnit {
    fn set_listener(&self, listener: Option<Arc<dyn MediaListener>>) {
        *self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = listener;
    }

    fn set_source(&self, source: &ResourceLocator) {
        let result = self.write(source);
        let event = match &result {
            Ok(len) => {
                tracing::debug!(path = %self.path.display(), bytes = len, mime = source.mime(), "Audio written");
                MediaEvent::CanPlayThrough { duration: None }
            }
            Err(message) => {
                tracing::warn!(%message, "Failed to write audio");
                MediaEvent::Error(MediaErrorCode::Unknown)
            }
        };
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
        self.emit(event);
    }

    fn play(&self) -> Result<(), MediaErrorCode> {
        Err(MediaErrorCode::NotAllowed)
    }

    fn pause(&self) {}

    fn rewind(&self) {}

    fn unload(&self) {}
}

/// Execute the synthesize command. Returns the number of bytes written.
pub async fn execute(
    ctx: &CliContext,
    text: &str,
    out: &Path,
    voice: &VoiceArgs,
) -> Result<usize, CliError> {
    let unit = Arc::new(FileUnit::new(out));
    let config = ctx.playback_config(voice).with_autoplay(false);
    let (playback, _events) = SpeechPlayback::new(
        ctx.synthesis()?,
        Arc::clone(&unit) as Arc<dyn AudioUnit>,
        config,
    );

    let result = playback.speak(text, SpeakOptions::default()).await;
    if let Some(Err(message)) = unit.outcome() {
        return Err(CliError::Io(message));
    }

    match result? {
        SpeakOutcome::Ready | SpeakOutcome::Playing => {}
        SpeakOutcome::Superseded => {
            return Err(CliError::Playback("narration was superseded".into()));
        }
    }

    let written = unit.outcome().and_then(Result::ok).unwrap_or_default();
    println!("Wrote {written} bytes to {}", out.display());
    Ok(written)
}

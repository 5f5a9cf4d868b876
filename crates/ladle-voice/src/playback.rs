//! Speech synthesis playback controller.
//!
//! ```text
//!   Idle ─speak()─▶ Requesting ─payload ok─▶ Ready ─play─▶ Playing ⇄ Paused
//!                        │                     ▲              │
//!                        │                     └── stop() ────┤
//!                        ▼                                    ▼
//!                      Error ◀──────── any failure ────────  Ended
//! ```
//!
//! Every `speak()` advances the session [`Generation`]. The generation is
//! re-checked after each suspension point (network round trip, ready wait)
//! and stamped on the media listener, so responses and events from a
//! superseded call are dropped without side effects.
//!
//! The controller owns exactly one [`ResourceSlot`]. The previous resource is
//! released when a new generation begins, before any new payload can be
//! materialized.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use ladle_core::{SynthesisPayload, SynthesisPort, SynthesisRequest, VoiceSettings};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::audio_io::{AudioUnit, MediaEvent, MediaListener};
use crate::error::{PlaybackError, PlaybackErrorKind};
use crate::generation::{Generation, GenerationCounter};
use crate::resource::ResourceSlot;

/// Media type assumed when the backend declares none.
const FALLBACK_MIME: &str = "audio/mpeg";

// ── Status ─────────────────────────────────────────────────────────

/// Current status of the playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Requesting,
    Ready,
    Playing,
    Paused,
    Ended,
    Error,
}

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted by the playback controller.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StatusChanged(PlaybackStatus),
    /// Fraction of the current audio played, in `[0, 1]`.
    Progress(f32),
    Error(PlaybackError),
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub generation: Generation,
    pub progress: f32,
    pub error: Option<PlaybackErrorKind>,
    pub has_resource: bool,
}

// ── Configuration ──────────────────────────────────────────────────

/// Configuration for the playback controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Longest text accepted, counted in Unicode scalar values (`str::chars`).
    ///
    /// Not bytes and not UTF-16 units: `"🍅"` counts as one.
    pub max_text_len: usize,
    /// Smaller payloads are rejected as truncated.
    pub min_audio_bytes: usize,
    /// Bound on waiting for the unit to report the audio playable.
    pub ready_timeout: Duration,
    pub default_voice_id: Option<String>,
    pub default_model_id: Option<String>,
    /// Start playing as soon as the audio is ready.
    pub autoplay: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_text_len: ladle_core::DEFAULT_MAX_TEXT_LEN,
            min_audio_bytes: ladle_core::DEFAULT_MIN_AUDIO_BYTES,
            ready_timeout: Duration::from_millis(ladle_core::DEFAULT_READY_TIMEOUT_MS),
            default_voice_id: None,
            default_model_id: None,
            autoplay: true,
        }
    }
}

impl PlaybackConfig {
    pub fn from_settings(settings: &VoiceSettings) -> Self {
        Self {
            max_text_len: settings.effective_max_text_len(),
            min_audio_bytes: settings.effective_min_audio_bytes(),
            ready_timeout: Duration::from_millis(settings.effective_ready_timeout_ms()),
            default_voice_id: settings.default_voice_id.clone(),
            default_model_id: settings.default_model_id.clone(),
            autoplay: settings.effective_autoplay(),
        }
    }

    #[must_use]
    pub const fn with_max_text_len(mut self, max: usize) -> Self {
        self.max_text_len = max;
        self
    }

    #[must_use]
    pub const fn with_min_audio_bytes(mut self, min: usize) -> Self {
        self.min_audio_bytes = min;
        self
    }

    #[must_use]
    pub const fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_default_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.default_voice_id = Some(voice_id.into());
        self
    }

    #[must_use]
    pub fn with_default_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.default_model_id = Some(model_id.into());
        self
    }

    #[must_use]
    pub const fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }
}

/// Per-call overrides for `speak()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakOptions {
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
}

impl SpeakOptions {
    #[must_use]
    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }
}

/// How a successful `speak()` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Audio is loaded and waiting for `resume()`.
    Ready,
    /// Audio is loaded and playback was started.
    Playing,
    /// A newer `speak()` or `dispose()` took over; this call had no effect.
    Superseded,
}

// ── Controller ─────────────────────────────────────────────────────

type ReadySender = oneshot::Sender<Result<(), PlaybackError>>;

/// Narration playback controller.
///
/// Share it behind an `Arc` when several UI handlers need it. Dropping the
/// controller disposes it.
pub struct SpeechPlayback {
    inner: Arc<PlaybackInner>,
}

struct PlaybackInner {
    synthesis: Arc<dyn SynthesisPort>,
    unit: Arc<dyn AudioUnit>,
    config: PlaybackConfig,
    /// Serializes listener/source changes on the unit. Taken before `session`;
    /// unit callbacks only ever take `session`.
    binding: Mutex<()>,
    session: Mutex<PlaybackSession>,
    event_tx: mpsc::UnboundedSender<PlaybackEvent>,
    self_ref: Weak<PlaybackInner>,
}

#[derive(Debug, Default)]
struct PlaybackSession {
    status: PlaybackStatus,
    generation: GenerationCounter,
    progress: f32,
    error: Option<PlaybackError>,
    resource: ResourceSlot,
    /// Resolves the pending `speak()` of the current generation.
    ready_tx: Option<ReadySender>,
}

impl SpeechPlayback {
    /// Create a new playback controller.
    ///
    /// Returns the controller and a receiver for [`PlaybackEvent`]s.
    pub fn new(
        synthesis: Arc<dyn SynthesisPort>,
        unit: Arc<dyn AudioUnit>,
        config: PlaybackConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let inner = Arc::new_cyclic(|self_ref| PlaybackInner {
            synthesis,
            unit,
            config,
            binding: Mutex::new(()),
            session: Mutex::new(PlaybackSession::default()),
            event_tx,
            self_ref: self_ref.clone(),
        });
        (Self { inner }, event_rx)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let session = lock(&self.inner.session);
        PlaybackSnapshot {
            status: session.status,
            generation: session.generation.current(),
            progress: session.progress,
            error: session.error.as_ref().map(PlaybackError::kind),
            has_resource: session.resource.is_occupied(),
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        lock(&self.inner.session).status
    }

    pub fn progress(&self) -> f32 {
        lock(&self.inner.session).progress
    }

    pub fn error(&self) -> Option<PlaybackError> {
        lock(&self.inner.session).error.clone()
    }

    /// Resources created by this controller that are still alive (0 or 1).
    pub fn live_resources(&self) -> usize {
        lock(&self.inner.session).resource.live_count()
    }

    /// Request narration for `text` and wait until it is playable.
    ///
    /// Validation failures are returned before any state change or request.
    pub async fn speak(
        &self,
        text: &str,
        options: SpeakOptions,
    ) -> Result<SpeakOutcome, PlaybackError> {
        let inner = &self.inner;
        inner.validate_text(text)?;

        let request = SynthesisRequest::new(text)
            .with_voice_id(options.voice_id.or_else(|| inner.config.default_voice_id.clone()))
            .with_model_id(options.model_id.or_else(|| inner.config.default_model_id.clone()));

        let generation = inner.begin_generation();

        // ── Suspension point 1: network round trip ─────────────────
        let response = inner.synthesis.synthesize(&request).await;
        if !inner.is_current(generation) {
            tracing::debug!(%generation, "Dropping superseded synthesis response");
            return Ok(SpeakOutcome::Superseded);
        }

        let payload = match response {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(%generation, error = %e, "Synthesis request failed");
                let error = PlaybackError::ServiceUnavailable(e.to_string());
                inner.fail(generation, error.clone());
                return Err(error);
            }
        };

        let (bytes, mime) = match inner.validate_payload(payload) {
            Ok(valid) => valid,
            Err(error) => {
                tracing::warn!(%generation, %error, "Rejected synthesis payload");
                inner.fail(generation, error.clone());
                return Err(error);
            }
        };

        // ── Materialize, attach observers, then bind the source ────
        let ready_rx = {
            let _binding = lock(&inner.binding);
            let (ready_tx, ready_rx) = oneshot::channel();
            let locator = {
                let mut session = lock(&inner.session);
                if !session.generation.is_current(generation) {
                    return Ok(SpeakOutcome::Superseded);
                }
                session.ready_tx = Some(ready_tx);
                session.resource.materialize(bytes, mime)
            };
            tracing::debug!(%generation, resource = %locator.id(), "Binding synthesized audio");

            inner.unit.set_listener(Some(Arc::new(PlaybackListener {
                inner: inner.self_ref.clone(),
                generation,
            })));
            inner.unit.set_source(&locator);
            ready_rx
        };

        // ── Suspension point 2: wait until playable ────────────────
        match tokio::time::timeout(inner.config.ready_timeout, ready_rx).await {
            Err(_elapsed) => {
                if !inner.is_current(generation) {
                    return Ok(SpeakOutcome::Superseded);
                }
                let error = PlaybackError::Network(format!(
                    "audio did not become playable within {} ms",
                    inner.config.ready_timeout.as_millis()
                ));
                tracing::warn!(%generation, %error, "Ready wait timed out");
                inner.fail(generation, error.clone());
                inner.discard(generation);
                Err(error)
            }
            // Sender dropped: a newer generation or dispose() took over.
            Ok(Err(_closed)) => Ok(SpeakOutcome::Superseded),
            Ok(Ok(Err(error))) => Err(error),
            Ok(Ok(Ok(()))) => {
                if !inner.is_current(generation) {
                    return Ok(SpeakOutcome::Superseded);
                }
                if !inner.config.autoplay {
                    return Ok(SpeakOutcome::Ready);
                }
                inner.play(generation)?;
                Ok(SpeakOutcome::Playing)
            }
        }
    }

    /// Halt playback and rewind. Keeps the resource loaded.
    pub fn stop(&self) {
        let inner = &self.inner;
        {
            let mut session = lock(&inner.session);
            if !session.resource.is_occupied() {
                return;
            }
            if !matches!(
                session.status,
                PlaybackStatus::Playing | PlaybackStatus::Paused | PlaybackStatus::Ended
            ) {
                return;
            }
            inner.set_progress(&mut session, 0.0);
            inner.set_status(&mut session, PlaybackStatus::Ready);
        }
        inner.unit.pause();
        inner.unit.rewind();
    }

    pub fn pause(&self) {
        let playing = {
            let session = lock(&self.inner.session);
            session.resource.is_occupied() && session.status == PlaybackStatus::Playing
        };
        if playing {
            self.inner.unit.pause();
        }
    }

    /// Start or continue playback of the loaded audio. From `Ended` it starts over.
    pub fn resume(&self) -> Result<(), PlaybackError> {
        let generation = {
            let mut session = lock(&self.inner.session);
            if !session.resource.is_occupied() {
                return Ok(());
            }
            match session.status {
                PlaybackStatus::Ready | PlaybackStatus::Paused => {}
                PlaybackStatus::Ended => self.inner.set_progress(&mut session, 0.0),
                // A refused play() keeps the audio; let the user retry it.
                PlaybackStatus::Error => session.error = None,
                _ => return Ok(()),
            }
            session.generation.current()
        };
        self.inner.play(generation)
    }

    /// `pause()` while playing, else `resume()`.
    pub fn toggle(&self) -> Result<(), PlaybackError> {
        if self.status() == PlaybackStatus::Playing {
            self.pause();
            Ok(())
        } else {
            self.resume()
        }
    }

    /// Halt playback, release the resource, and invalidate any pending `speak()`.
    pub fn dispose(&self) {
        let inner = &self.inner;
        let _binding = lock(&inner.binding);
        {
            let mut session = lock(&inner.session);
            let generation = session.generation.advance();
            session.ready_tx = None;
            session.resource.release();
            session.error = None;
            inner.set_progress(&mut session, 0.0);
            inner.set_status(&mut session, PlaybackStatus::Idle);
            tracing::debug!(%generation, "Speech playback disposed");
        }
        inner.unit.set_listener(None);
        inner.unit.pause();
        inner.unit.unload();
    }
}

impl Drop for SpeechPlayback {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl PlaybackInner {
    fn validate_text(&self, text: &str) -> Result<(), PlaybackError> {
        if text.trim().is_empty() {
            return Err(PlaybackError::Validation);
        }
        let len = text.chars().count();
        if len > self.config.max_text_len {
            return Err(PlaybackError::TextTooLong {
                len,
                max: self.config.max_text_len,
            });
        }
        Ok(())
    }

    fn validate_payload(
        &self,
        payload: SynthesisPayload,
    ) -> Result<(Vec<u8>, String), PlaybackError> {
        if payload.bytes.is_none() {
            return Err(PlaybackError::InvalidAudioPayload(
                "response carried no body".to_string(),
            ));
        }
        if !payload.declares_audio() {
            let declared = payload.content_type.unwrap_or_default();
            return Err(PlaybackError::InvalidAudioPayload(format!(
                "unexpected content type '{declared}'"
            )));
        }
        let mime = payload
            .media_type()
            .unwrap_or_else(|| FALLBACK_MIME.to_string());

        let bytes = payload.bytes.unwrap_or_default();
        if bytes.is_empty() {
            return Err(PlaybackError::InvalidAudioPayload(
                "response body is empty".to_string(),
            ));
        }
        if bytes.len() < self.config.min_audio_bytes {
            return Err(PlaybackError::InvalidAudioPayload(format!(
                "{} bytes is below the {}-byte minimum",
                bytes.len(),
                self.config.min_audio_bytes
            )));
        }
        Ok((bytes, mime))
    }

    /// Start a new generation: invalidate the old one and release its resource.
    fn begin_generation(&self) -> Generation {
        let _binding = lock(&self.binding);
        let generation = {
            let mut session = lock(&self.session);
            let generation = session.generation.advance();
            session.ready_tx = None;
            session.error = None;
            session.resource.release();
            self.set_progress(&mut session, 0.0);
            self.set_status(&mut session, PlaybackStatus::Requesting);
            generation
        };
        tracing::debug!(%generation, "Speak requested");
        self.unit.pause();
        self.unit.unload();
        generation
    }

    /// Release the resource and unbind the unit if `generation` is still current.
    fn discard(&self, generation: Generation) {
        let _binding = lock(&self.binding);
        let released = {
            let mut session = lock(&self.session);
            session.generation.is_current(generation) && session.resource.release()
        };
        if released {
            self.unit.unload();
        }
    }

    fn is_current(&self, generation: Generation) -> bool {
        lock(&self.session).generation.is_current(generation)
    }

    fn play(&self, generation: Generation) -> Result<(), PlaybackError> {
        match self.unit.play() {
            Ok(()) => Ok(()),
            Err(code) => {
                let error = PlaybackError::from(code);
                tracing::warn!(%generation, ?code, "Audio unit refused to play");
                self.fail(generation, error.clone());
                Err(error)
            }
        }
    }

    /// Record `error` for `generation` if it is still current.
    fn fail(&self, generation: Generation, error: PlaybackError) {
        let mut session = lock(&self.session);
        if !session.generation.is_current(generation) {
            return;
        }
        self.fail_locked(&mut session, error);
    }

    fn fail_locked(&self, session: &mut PlaybackSession, error: PlaybackError) {
        if let Some(ready_tx) = session.ready_tx.take() {
            let _ = ready_tx.send(Err(error.clone()));
        }
        session.error = Some(error.clone());
        self.set_status(session, PlaybackStatus::Error);
        self.emit(PlaybackEvent::Error(error));
    }

    fn handle_media_event(&self, generation: Generation, event: MediaEvent) {
        let mut session = lock(&self.session);
        if !session.generation.is_current(generation) {
            tracing::trace!(%generation, ?event, "Dropping stale media event");
            return;
        }

        match event {
            MediaEvent::CanPlayThrough { duration } => {
                if session.status == PlaybackStatus::Requesting {
                    tracing::debug!(%generation, ?duration, "Audio ready to play");
                    self.set_status(&mut session, PlaybackStatus::Ready);
                }
                if let Some(ready_tx) = session.ready_tx.take() {
                    let _ = ready_tx.send(Ok(()));
                }
            }
            MediaEvent::Playing => {
                self.set_status(&mut session, PlaybackStatus::Playing);
            }
            MediaEvent::Paused => {
                if session.status == PlaybackStatus::Playing {
                    self.set_status(&mut session, PlaybackStatus::Paused);
                }
            }
            MediaEvent::TimeUpdate { position, duration } => {
                if session.status != PlaybackStatus::Playing {
                    return;
                }
                let Some(duration) = duration.filter(|d| !d.is_zero()) else {
                    return;
                };
                #[allow(clippy::cast_possible_truncation)] // ratio is clamped to [0, 1]
                let ratio = (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0) as f32;
                if ratio > session.progress {
                    self.set_progress(&mut session, ratio);
                }
            }
            MediaEvent::Ended => {
                self.set_progress(&mut session, 1.0);
                self.set_status(&mut session, PlaybackStatus::Ended);
            }
            MediaEvent::Error(code) => {
                let error = PlaybackError::from(code);
                tracing::warn!(%generation, ?code, "Audio unit reported an error");
                session.resource.release();
                self.fail_locked(&mut session, error);
            }
        }
    }

    #[allow(clippy::float_cmp)] // exact equality is the point: skip duplicate emits
    fn set_progress(&self, session: &mut PlaybackSession, progress: f32) {
        if session.progress != progress {
            session.progress = progress;
            self.emit(PlaybackEvent::Progress(progress));
        }
    }

    fn set_status(&self, session: &mut PlaybackSession, new_status: PlaybackStatus) {
        if session.status != new_status {
            tracing::debug!(old = ?session.status, new = ?new_status, "Playback status transition");
            session.status = new_status;
            self.emit(PlaybackEvent::StatusChanged(new_status));
        }
    }

    /// Emit a playback event (best-effort; a dropped receiver is only logged).
    fn emit(&self, event: PlaybackEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Playback event receiver dropped");
        }
    }
}

// ── Listener adapter ───────────────────────────────────────────────

/// Media listener stamped with the generation it was attached for.
struct PlaybackListener {
    inner: Weak<PlaybackInner>,
    generation: Generation,
}

impl MediaListener for PlaybackListener {
    fn on_media_event(&self, event: MediaEvent) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle_media_event(self.generation, event);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

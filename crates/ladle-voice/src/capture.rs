//! Speech capture controller: a managed session over a recognition engine.
//!
//! ```text
//!   Idle ──start()──▶ (starting) ──engine on_start──▶ Listening
//!    ▲                     │                             │
//!    │                     └── engine refuses ──▶ Error  │ stop() / silence timeout / engine on_end
//!    └───────────────────────────────────────────────────┘
//!                                  any engine error ──▶ Error
//! ```
//!
//! The silence timer is armed only by finalized segments. Interim output
//! replaces the live interim text but never touches the timer, so a speaker
//! mid-utterance is not cut off.
//!
//! Engine primitives are always invoked with the session lock released, so
//! engines may call back synchronously from `start`/`stop`/`abort`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use ladle_core::VoiceSettings;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::audio_io::{
    RecognitionEngine, RecognitionHost, RecognitionListener, RecognitionOptions,
    RecognitionResult,
};
use crate::error::CaptureError;
use crate::timer::CountdownTimer;

// ── Status & transcript ────────────────────────────────────────────

/// Current status of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    #[default]
    Idle,
    Listening,
    Error,
}

/// Live transcript of the current capture session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    /// Provisional text for the utterance in progress.
    pub interim: String,
    /// Confirmed text, concatenated in arrival order.
    pub finalized: String,
}

impl Transcript {
    /// Finalized text followed by the interim window, for live query fields.
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.finalized.len() + self.interim.len());
        text.push_str(&self.finalized);
        text.push_str(&self.interim);
        text
    }

    pub fn is_empty(&self) -> bool {
        self.interim.is_empty() && self.finalized.is_empty()
    }

    pub fn clear(&mut self) {
        self.interim.clear();
        self.finalized.clear();
    }
}

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted by the capture controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    StatusChanged(CaptureStatus),
    TranscriptUpdated(Transcript),
    Error(CaptureError),
    /// The silence timeout elapsed and the session was stopped.
    AutoStopped,
}

// ── Configuration ──────────────────────────────────────────────────

/// Configuration for the capture controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// BCP-47 language tag pushed to the engine.
    pub language: String,
    /// Quiet period after the last finalized segment before auto-stop.
    pub silence_timeout: Duration,
    pub continuous: bool,
    pub interim_results: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            language: ladle_core::DEFAULT_RECOGNITION_LANGUAGE.to_string(),
            silence_timeout: Duration::from_millis(ladle_core::DEFAULT_SILENCE_TIMEOUT_MS),
            continuous: true,
            interim_results: true,
        }
    }
}

impl CaptureConfig {
    pub fn from_settings(settings: &VoiceSettings) -> Self {
        Self {
            language: settings.effective_recognition_language().to_string(),
            silence_timeout: Duration::from_millis(settings.effective_silence_timeout_ms()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    #[must_use]
    pub const fn with_silence_timeout(mut self, timeout: Duration) -> Self {
        self.silence_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    #[must_use]
    pub const fn with_interim_results(mut self, interim_results: bool) -> Self {
        self.interim_results = interim_results;
        self
    }

    fn recognition_options(&self) -> RecognitionOptions {
        RecognitionOptions {
            language: self.language.clone(),
            continuous: self.continuous,
            interim_results: self.interim_results,
        }
    }
}

// ── Controller ─────────────────────────────────────────────────────

/// Managed speech capture session.
///
/// Dropping the controller disposes it.
pub struct SpeechCapture {
    inner: Arc<CaptureInner>,
}

struct CaptureInner {
    engine: Option<Arc<dyn RecognitionEngine>>,
    config: CaptureConfig,
    session: Mutex<CaptureSession>,
    event_tx: mpsc::UnboundedSender<CaptureEvent>,
    /// Runtime the silence countdown runs on; engines may call back from any thread.
    runtime: Option<Handle>,
    self_ref: Weak<CaptureInner>,
}

#[derive(Debug, Default)]
struct CaptureSession {
    status: CaptureStatus,
    transcript: Transcript,
    error: Option<CaptureError>,
    silence_timer: CountdownTimer,
    /// `start()` issued, engine has not confirmed yet.
    starting: bool,
    unsupported_reported: bool,
    disposed: bool,
}

impl SpeechCapture {
    /// Create a controller over `engine`; `None` means the host has no recognizer.
    ///
    /// Call from within a tokio runtime: the silence countdown is scheduled on
    /// the runtime current at construction, whichever thread the engine reports
    /// results from. Returns the controller and a receiver for [`CaptureEvent`]s.
    pub fn new(
        engine: Option<Arc<dyn RecognitionEngine>>,
        config: CaptureConfig,
    ) -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let inner = Arc::new_cyclic(|self_ref| CaptureInner {
            engine,
            config,
            session: Mutex::new(CaptureSession::default()),
            event_tx,
            runtime: Handle::try_current().ok(),
            self_ref: self_ref.clone(),
        });

        if let Some(engine) = &inner.engine {
            engine.configure(&inner.config.recognition_options());
            engine.set_listener(Some(Arc::new(CaptureListener {
                inner: Arc::downgrade(&inner),
            })));
            tracing::debug!(language = %inner.config.language, "Speech capture attached to engine");
        } else {
            tracing::info!("Speech recognition unavailable; capture controller is inert");
        }

        (Self { inner }, event_rx)
    }

    /// Create a controller using whatever engine `host` exposes.
    pub fn detect(
        host: &dyn RecognitionHost,
        config: CaptureConfig,
    ) -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        Self::new(host.recognition_engine(), config)
    }

    /// Whether the host exposes a recognition engine.
    pub fn is_supported(&self) -> bool {
        self.inner.engine.is_some()
    }

    pub fn status(&self) -> CaptureStatus {
        lock(&self.inner.session).status
    }

    pub fn transcript(&self) -> Transcript {
        lock(&self.inner.session).transcript.clone()
    }

    pub fn error(&self) -> Option<CaptureError> {
        lock(&self.inner.session).error.clone()
    }

    pub fn is_listening(&self) -> bool {
        self.status() == CaptureStatus::Listening
    }

    /// Begin a capture session. No-op while listening or already starting.
    pub fn start(&self) {
        let Some(engine) = self.inner.engine.clone() else {
            self.inner.report_unsupported();
            return;
        };

        {
            let mut session = lock(&self.inner.session);
            if session.disposed {
                tracing::warn!("start() called on a disposed capture controller");
                return;
            }
            if session.status == CaptureStatus::Listening || session.starting {
                tracing::debug!(status = ?session.status, "start() ignored; session already active");
                return;
            }

            session.starting = true;
            session.silence_timer.cancel();
            session.error = None;
            if !session.transcript.is_empty() {
                session.transcript.clear();
                self.inner
                    .emit(CaptureEvent::TranscriptUpdated(Transcript::default()));
            }
            if session.status == CaptureStatus::Error {
                self.inner.set_status(&mut session, CaptureStatus::Idle);
            }
        }

        if let Err(message) = engine.start() {
            tracing::warn!(%message, "Recognition engine failed to start");
            let mut session = lock(&self.inner.session);
            session.starting = false;
            self.inner
                .fail(&mut session, CaptureError::EngineStartFailure(message));
        }
    }

    /// Stop the session. No-op unless listening.
    pub fn stop(&self) {
        if self.inner.halt(false) {
            tracing::debug!("Capture stopped");
        }
    }

    /// `stop()` if listening, else `start()`.
    pub fn toggle(&self) {
        if self.is_listening() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Clear transcript and error without touching the engine.
    ///
    /// A start the engine never confirmed is abandoned, so `start()` works again.
    pub fn reset(&self) {
        let mut session = lock(&self.inner.session);
        if session.starting {
            tracing::debug!("reset() abandoning unconfirmed start");
            session.starting = false;
        }
        let had_text = !session.transcript.is_empty();
        session.transcript.clear();
        session.error = None;
        if had_text {
            self.inner
                .emit(CaptureEvent::TranscriptUpdated(Transcript::default()));
        }
        if session.status == CaptureStatus::Error {
            self.inner.set_status(&mut session, CaptureStatus::Idle);
        }
    }

    /// Abort recognition, cancel timers, and detach from the engine.
    pub fn dispose(&self) {
        {
            let mut session = lock(&self.inner.session);
            if session.disposed {
                return;
            }
            session.disposed = true;
            session.starting = false;
            session.silence_timer.cancel();
            session.transcript.interim.clear();
            self.inner.set_status(&mut session, CaptureStatus::Idle);
        }

        if let Some(engine) = &self.inner.engine {
            engine.abort();
            engine.set_listener(None);
        }
        tracing::debug!("Speech capture disposed");
    }
}

impl Drop for SpeechCapture {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl CaptureInner {
    /// Leave `Listening` and stop the engine. Returns whether anything happened.
    fn halt(&self, auto: bool) -> bool {
        let Some(engine) = self.engine.clone() else {
            return false;
        };

        {
            let mut session = lock(&self.session);
            if session.status != CaptureStatus::Listening {
                return false;
            }
            session.silence_timer.cancel();
            self.clear_interim(&mut session);
            self.set_status(&mut session, CaptureStatus::Idle);
            if auto {
                self.emit(CaptureEvent::AutoStopped);
            }
        }

        engine.stop();
        true
    }

    fn on_silence_elapsed(&self, arm_id: u64) {
        {
            let mut session = lock(&self.session);
            if !session.silence_timer.take_if_current(arm_id) {
                return;
            }
        }
        if self.halt(true) {
            tracing::info!(
                timeout_ms = self.config.silence_timeout.as_millis(),
                "Silence timeout elapsed; capture auto-stopped"
            );
        }
    }

    fn arm_silence_timer(&self, session: &mut CaptureSession) {
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            tracing::warn!("No tokio runtime available; silence auto-stop disabled");
            session.silence_timer.cancel();
            return;
        };
        let weak = self.self_ref.clone();
        session
            .silence_timer
            .arm(&runtime, self.config.silence_timeout, move |arm_id| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_silence_elapsed(arm_id);
                }
            });
    }

    fn report_unsupported(&self) {
        let mut session = lock(&self.session);
        if session.unsupported_reported {
            return;
        }
        session.unsupported_reported = true;
        session.error = Some(CaptureError::UnsupportedEnvironment);
        tracing::warn!("start() called but speech recognition is unsupported");
        self.emit(CaptureEvent::Error(CaptureError::UnsupportedEnvironment));
    }

    fn fail(&self, session: &mut CaptureSession, error: CaptureError) {
        session.silence_timer.cancel();
        self.clear_interim(session);
        session.error = Some(error.clone());
        self.set_status(session, CaptureStatus::Error);
        self.emit(CaptureEvent::Error(error));
    }

    fn clear_interim(&self, session: &mut CaptureSession) {
        if !session.transcript.interim.is_empty() {
            session.transcript.interim.clear();
            self.emit(CaptureEvent::TranscriptUpdated(session.transcript.clone()));
        }
    }

    fn set_status(&self, session: &mut CaptureSession, new_status: CaptureStatus) {
        if session.status != new_status {
            tracing::debug!(old = ?session.status, new = ?new_status, "Capture status transition");
            session.status = new_status;
            self.emit(CaptureEvent::StatusChanged(new_status));
        }
    }

    /// Emit a capture event (best-effort; a dropped receiver is only logged).
    fn emit(&self, event: CaptureEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Capture event receiver dropped");
        }
    }

    // ── Engine callbacks ───────────────────────────────────────────

    fn handle_start(&self) {
        let mut session = lock(&self.session);
        if session.disposed {
            return;
        }
        session.starting = false;
        self.set_status(&mut session, CaptureStatus::Listening);
    }

    fn handle_result(&self, result: RecognitionResult) {
        let mut session = lock(&self.session);
        if session.disposed {
            return;
        }

        let listening = session.status == CaptureStatus::Listening;
        let mut changed = false;

        // Engines flush pending finals after stop(); keep them but leave interim alone.
        for segment in &result.finalized {
            session.transcript.finalized.push_str(segment);
            changed = true;
        }

        if listening {
            let interim = result.interim.unwrap_or_default();
            if session.transcript.interim != interim {
                session.transcript.interim = interim;
                changed = true;
            }
            if !result.finalized.is_empty() {
                self.arm_silence_timer(&mut session);
            }
        }

        if changed {
            self.emit(CaptureEvent::TranscriptUpdated(session.transcript.clone()));
        }
    }

    fn handle_end(&self) {
        let mut session = lock(&self.session);
        if session.disposed {
            return;
        }
        session.starting = false;
        session.silence_timer.cancel();
        self.clear_interim(&mut session);
        if session.status == CaptureStatus::Listening {
            self.set_status(&mut session, CaptureStatus::Idle);
        }
    }

    fn handle_error(&self, code: &str) {
        let mut session = lock(&self.session);
        if session.disposed {
            return;
        }
        let error = CaptureError::from_engine_code(code);
        tracing::warn!(code, kind = error.code(), "Recognition engine error");
        session.starting = false;
        self.fail(&mut session, error);
    }
}

// ── Listener adapter ───────────────────────────────────────────────

/// Engine-facing listener. Holds a weak reference so an engine that outlives
/// the controller cannot keep it alive.
struct CaptureListener {
    inner: Weak<CaptureInner>,
}

impl RecognitionListener for CaptureListener {
    fn on_start(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle_start();
        }
    }

    fn on_result(&self, result: RecognitionResult) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle_result(result);
        }
    }

    fn on_end(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle_end();
        }
    }

    fn on_error(&self, code: &str) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle_error(code);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

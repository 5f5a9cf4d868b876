//! Voice mode error types.
//!
//! Capture and playback have separate taxonomies because no consumer ever
//! handles both from the same call site.

use serde::Serialize;

use crate::audio_io::MediaErrorCode;

// ── Capture ────────────────────────────────────────────────────────

/// Errors reported by the speech capture controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The host exposes no recognition engine.
    #[error("Speech recognition is not supported in this environment")]
    UnsupportedEnvironment,

    /// The engine refused to start synchronously.
    #[error("Speech recognition failed to start: {0}")]
    EngineStartFailure(String),

    /// The engine heard nothing it could transcribe.
    #[error("No speech was detected")]
    NoSpeechDetected,

    /// No audio capture device could be opened.
    #[error("No microphone is available")]
    MicrophoneUnavailable,

    /// The user or platform denied microphone access.
    #[error("Microphone permission denied")]
    PermissionDenied,

    /// The recognition service could not be reached.
    #[error("Speech recognition network error")]
    NetworkError,

    /// The platform forbids the recognition service (policy, language pack).
    #[error("Speech recognition service is not allowed")]
    ServiceNotAllowed,

    /// Any engine code without a dedicated mapping.
    #[error("Speech recognition error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Map an engine-reported error code to a capture error.
    pub fn from_engine_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeechDetected,
            "audio-capture" => Self::MicrophoneUnavailable,
            "not-allowed" => Self::PermissionDenied,
            "network" => Self::NetworkError,
            "service-not-allowed" => Self::ServiceNotAllowed,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Stable snake_case identifier for this kind.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedEnvironment => "unsupported_environment",
            Self::EngineStartFailure(_) => "engine_start_failure",
            Self::NoSpeechDetected => "no_speech_detected",
            Self::MicrophoneUnavailable => "microphone_unavailable",
            Self::PermissionDenied => "permission_denied",
            Self::NetworkError => "network_error",
            Self::ServiceNotAllowed => "service_not_allowed",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Transient conditions: a fresh `start()` may succeed right away.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoSpeechDetected | Self::NetworkError)
    }

    /// Conditions that persist until something outside the controller changes.
    pub const fn is_session_terminal(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::UnsupportedEnvironment)
    }
}

// ── Playback ───────────────────────────────────────────────────────

/// Errors reported by the synthesis playback controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// Text was empty after trimming.
    #[error("Nothing to narrate: text is empty")]
    Validation,

    /// Text exceeds the configured cap.
    #[error("Text is too long to narrate ({len} characters, limit {max})")]
    TextTooLong { len: usize, max: usize },

    /// The synthesis backend was unreachable, unauthorized, or answered non-2xx.
    #[error("Speech service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The backend answered 2xx but the body is not usable audio.
    #[error("Invalid audio payload: {0}")]
    InvalidAudioPayload(String),

    /// The audio unit aborted loading.
    #[error("Playback aborted")]
    Aborted,

    /// The audio unit hit a network failure or never became playable.
    #[error("Playback network error: {0}")]
    Network(String),

    /// The audio bytes could not be decoded.
    #[error("Audio could not be decoded")]
    Decode,

    /// The audio unit does not support the payload's format.
    #[error("Audio format is not supported")]
    FormatUnsupported,

    /// Anything else reported by the audio unit.
    #[error("Playback error: {0}")]
    Unknown(String),
}

/// Payload-free mirror of [`PlaybackError`] for snapshots and UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackErrorKind {
    Validation,
    TextTooLong,
    ServiceUnavailable,
    InvalidAudioPayload,
    Aborted,
    Network,
    Decode,
    FormatUnsupported,
    Unknown,
}

impl PlaybackError {
    pub const fn kind(&self) -> PlaybackErrorKind {
        match self {
            Self::Validation => PlaybackErrorKind::Validation,
            Self::TextTooLong { .. } => PlaybackErrorKind::TextTooLong,
            Self::ServiceUnavailable(_) => PlaybackErrorKind::ServiceUnavailable,
            Self::InvalidAudioPayload(_) => PlaybackErrorKind::InvalidAudioPayload,
            Self::Aborted => PlaybackErrorKind::Aborted,
            Self::Network(_) => PlaybackErrorKind::Network,
            Self::Decode => PlaybackErrorKind::Decode,
            Self::FormatUnsupported => PlaybackErrorKind::FormatUnsupported,
            Self::Unknown(_) => PlaybackErrorKind::Unknown,
        }
    }

    /// Stable snake_case identifier for this kind.
    pub const fn code(&self) -> &'static str {
        match self.kind() {
            PlaybackErrorKind::Validation => "validation",
            PlaybackErrorKind::TextTooLong => "text_too_long",
            PlaybackErrorKind::ServiceUnavailable => "service_unavailable",
            PlaybackErrorKind::InvalidAudioPayload => "invalid_audio_payload",
            PlaybackErrorKind::Aborted => "playback_aborted",
            PlaybackErrorKind::Network => "playback_network_error",
            PlaybackErrorKind::Decode => "playback_decode_error",
            PlaybackErrorKind::FormatUnsupported => "playback_format_unsupported",
            PlaybackErrorKind::Unknown => "unknown",
        }
    }

    /// Rejected before any request was sent.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation | Self::TextTooLong { .. })
    }

    /// Transient conditions: calling `speak()` again may succeed.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_) | Self::Network(_))
    }
}

impl From<MediaErrorCode> for PlaybackError {
    fn from(code: MediaErrorCode) -> Self {
        match code {
            MediaErrorCode::Aborted => Self::Aborted,
            MediaErrorCode::Network => Self::Network("audio unit reported a network error".into()),
            MediaErrorCode::Decode => Self::Decode,
            MediaErrorCode::SourceNotSupported => Self::FormatUnsupported,
            MediaErrorCode::NotAllowed => Self::Unknown("playback was not allowed".into()),
            MediaErrorCode::Unknown => Self::Unknown("audio unit reported an error".into()),
        }
    }
}

//! Voice settings domain types and validation.
//!
//! These are pure domain types with no infrastructure dependencies. The voice
//! controllers derive their runtime configs from [`VoiceSettings`].

use serde::{Deserialize, Serialize};

/// Maximum text length accepted by `speak()` before any network call.
pub const DEFAULT_MAX_TEXT_LEN: usize = 5000;

/// Smallest synthesis payload treated as real audio.
pub const DEFAULT_MIN_AUDIO_BYTES: usize = 100;

/// Quiet period after the last finalized segment before capture auto-stops.
pub const DEFAULT_SILENCE_TIMEOUT_MS: u64 = 3000;

/// Upper bound on waiting for synthesized audio to become playable.
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 10_000;

/// Language tag pushed to the recognition engine.
pub const DEFAULT_RECOGNITION_LANGUAGE: &str = "en-US";

/// Voice pipeline settings.
///
/// All fields are optional to support partial settings files and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VoiceSettings {
    /// Endpoint of the remote synthesis function.
    pub synthesis_url: Option<String>,

    /// Voice used when `speak()` is called without one.
    pub default_voice_id: Option<String>,

    /// Synthesis model used when `speak()` is called without one.
    pub default_model_id: Option<String>,

    /// Text length cap for narration requests (1-100,000), in Unicode scalar values.
    pub max_text_len: Option<usize>,

    /// Payloads smaller than this are rejected as truncated.
    pub min_audio_bytes: Option<usize>,

    /// Silence auto-stop window in milliseconds (250-60,000).
    pub silence_timeout_ms: Option<u64>,

    /// Ready-to-play wait bound in milliseconds (500-120,000).
    pub ready_timeout_ms: Option<u64>,

    /// BCP-47 tag for speech recognition.
    pub recognition_language: Option<String>,

    /// Start playback as soon as synthesized audio is ready.
    pub autoplay: Option<bool>,
}

impl VoiceSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            synthesis_url: None,
            default_voice_id: None,
            default_model_id: None,
            max_text_len: Some(DEFAULT_MAX_TEXT_LEN),
            min_audio_bytes: Some(DEFAULT_MIN_AUDIO_BYTES),
            silence_timeout_ms: Some(DEFAULT_SILENCE_TIMEOUT_MS),
            ready_timeout_ms: Some(DEFAULT_READY_TIMEOUT_MS),
            recognition_language: Some(DEFAULT_RECOGNITION_LANGUAGE.to_string()),
            autoplay: Some(true),
        }
    }

    /// Get the effective text cap (with default fallback).
    #[must_use]
    pub const fn effective_max_text_len(&self) -> usize {
        match self.max_text_len {
            Some(len) => len,
            None => DEFAULT_MAX_TEXT_LEN,
        }
    }

    /// Get the effective minimum payload size (with default fallback).
    #[must_use]
    pub const fn effective_min_audio_bytes(&self) -> usize {
        match self.min_audio_bytes {
            Some(bytes) => bytes,
            None => DEFAULT_MIN_AUDIO_BYTES,
        }
    }

    /// Get the effective silence window (with default fallback).
    #[must_use]
    pub const fn effective_silence_timeout_ms(&self) -> u64 {
        match self.silence_timeout_ms {
            Some(ms) => ms,
            None => DEFAULT_SILENCE_TIMEOUT_MS,
        }
    }

    /// Get the effective ready timeout (with default fallback).
    #[must_use]
    pub const fn effective_ready_timeout_ms(&self) -> u64 {
        match self.ready_timeout_ms {
            Some(ms) => ms,
            None => DEFAULT_READY_TIMEOUT_MS,
        }
    }

    /// Get the effective recognition language (with default fallback).
    #[must_use]
    pub fn effective_recognition_language(&self) -> &str {
        self.recognition_language
            .as_deref()
            .unwrap_or(DEFAULT_RECOGNITION_LANGUAGE)
    }

    #[must_use]
    pub const fn effective_autoplay(&self) -> bool {
        match self.autoplay {
            Some(on) => on,
            None => true,
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Max text length must be between 1 and 100,000, got {0}")]
    InvalidMaxTextLen(usize),

    #[error("Silence timeout must be between 250 and 60,000 ms, got {0}")]
    InvalidSilenceTimeout(u64),

    #[error("Ready timeout must be between 500 and 120,000 ms, got {0}")]
    InvalidReadyTimeout(u64),

    #[error("Recognition language cannot be empty")]
    EmptyLanguage,

    #[error("Synthesis URL must start with http:// or https://, got '{0}'")]
    InvalidSynthesisUrl(String),
}

/// Validate settings values.
pub fn validate_settings(settings: &VoiceSettings) -> Result<(), SettingsError> {
    if let Some(len) = settings.max_text_len {
        if !(1..=100_000).contains(&len) {
            return Err(SettingsError::InvalidMaxTextLen(len));
        }
    }

    if let Some(ms) = settings.silence_timeout_ms {
        if !(250..=60_000).contains(&ms) {
            return Err(SettingsError::InvalidSilenceTimeout(ms));
        }
    }

    if let Some(ms) = settings.ready_timeout_ms {
        if !(500..=120_000).contains(&ms) {
            return Err(SettingsError::InvalidReadyTimeout(ms));
        }
    }

    if settings
        .recognition_language
        .as_ref()
        .is_some_and(|l| l.trim().is_empty())
    {
        return Err(SettingsError::EmptyLanguage);
    }

    if let Some(url) = &settings.synthesis_url {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(SettingsError::InvalidSynthesisUrl(url.clone()));
        }
    }

    Ok(())
}

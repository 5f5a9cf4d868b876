//! Speech synthesis port.
//!
//! The playback controller depends on this trait, never on an HTTP client.
//! Adapters (see `ladle-synthesis`) translate transport failures into
//! [`SynthesisPortError`] so the controller can classify them uniformly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── DTOs ───────────────────────────────────────────────────────────

/// Body sent to the synthesis backend.
///
/// Serialises to `{ "text": ..., "voice_id"?: ..., "model_id"?: ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl SynthesisRequest {
    /// Create a request for `text` with backend-chosen voice and model.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: None,
            model_id: None,
        }
    }

    #[must_use]
    pub fn with_voice_id(mut self, voice_id: Option<String>) -> Self {
        self.voice_id = voice_id;
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: Option<String>) -> Self {
        self.model_id = model_id;
        self
    }
}

/// Raw successful response from the synthesis backend.
///
/// Both fields are optional because the backend is not trusted: the
/// playback controller validates the payload before using it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisPayload {
    /// Declared `Content-Type`, if any.
    pub content_type: Option<String>,
    /// Response body, `None` when the backend returned no body at all.
    pub bytes: Option<Vec<u8>>,
}

impl SynthesisPayload {
    pub fn new(content_type: Option<String>, bytes: Option<Vec<u8>>) -> Self {
        Self {
            content_type,
            bytes,
        }
    }

    /// Number of body bytes (0 when absent).
    pub fn len(&self) -> usize {
        self.bytes.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The declared media type without parameters, lowercased.
    ///
    /// `"Audio/MPEG; charset=binary"` becomes `"audio/mpeg"`.
    pub fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Whether the declared type is a recognised binary audio type.
    ///
    /// A missing content type counts as recognised; the byte checks still apply.
    pub fn declares_audio(&self) -> bool {
        match self.media_type() {
            None => true,
            Some(media) => media.starts_with("audio/") || media == "application/octet-stream",
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Errors from synthesis port operations.
///
/// Implementation-specific errors (HTTP, JSON) are mapped to these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisPortError {
    /// The backend could not be reached (DNS, TLS, connect, timeout).
    #[error("Synthesis backend unreachable: {message}")]
    Unreachable {
        /// Description of the transport failure
        message: String,
    },

    /// The credential was missing, expired, or rejected.
    #[error("Synthesis backend rejected credentials (status {status})")]
    Unauthorized {
        /// HTTP status code (401 or 403)
        status: u16,
    },

    /// The backend answered with a non-success status.
    #[error("Synthesis backend returned status {status}: {}", describe_rejection(.error.as_deref(), .message.as_deref()))]
    Rejected {
        /// HTTP status code
        status: u16,
        /// `error` field of the JSON error body, if present
        error: Option<String>,
        /// `message` field of the JSON error body, if present
        message: Option<String>,
    },

    /// The backend answered but the response could not be read.
    #[error("Invalid synthesis response: {message}")]
    InvalidResponse {
        /// What was invalid
        message: String,
    },

    /// Client-side configuration error (bad endpoint, missing token).
    #[error("Synthesis configuration error: {message}")]
    Configuration {
        /// What's wrong with the configuration
        message: String,
    },
}

fn describe_rejection(error: Option<&str>, message: Option<&str>) -> String {
    match (error, message) {
        (Some(e), Some(m)) => format!("{e}: {m}"),
        (Some(only), None) | (None, Some(only)) => only.to_string(),
        (None, None) => "no error body".to_string(),
    }
}

/// Result type alias for synthesis port operations.
pub type SynthesisPortResult<T> = Result<T, SynthesisPortError>;

// ── Port ───────────────────────────────────────────────────────────

/// Remote text-to-speech function.
///
/// One call issues exactly one request. Implementations must not retry
/// silently: the caller owns the generation bookkeeping and a hidden retry
/// would stretch the window in which a response can go stale.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SynthesisPort: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest)
    -> SynthesisPortResult<SynthesisPayload>;
}

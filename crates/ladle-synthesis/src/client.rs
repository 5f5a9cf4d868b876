//! Synthesis client: request shaping and response interpretation.

use serde::Deserialize;
use url::Url;

use crate::config::SynthesisClientConfig;
use crate::error::{SynthesisError, SynthesisResult};
use crate::http::{HttpBackend, RawResponse, ReqwestBackend};
use crate::port::map_error;
use ladle_core::{SynthesisPayload, SynthesisPortResult, SynthesisRequest};

// ============================================================================
// Type Aliases
// ============================================================================

/// Default synthesis client using the reqwest HTTP backend.
pub type DefaultSynthesisClient = SynthesisClient<ReqwestBackend>;

// ============================================================================
// Client
// ============================================================================

/// Client for the remote synthesis function.
///
/// Generic over an HTTP backend so tests can inject a fake. Use
/// `DefaultSynthesisClient` in production and talk to it through
/// `SynthesisPort`.
pub struct SynthesisClient<B: HttpBackend> {
    pub(crate) backend: B,
    pub(crate) endpoint: Url,
}

impl DefaultSynthesisClient {
    /// Create a new client with the given configuration.
    pub fn new(config: &SynthesisClientConfig) -> SynthesisPortResult<Self> {
        Self::build(config).map_err(map_error)
    }

    fn build(config: &SynthesisClientConfig) -> SynthesisResult<Self> {
        let endpoint = validate_endpoint(config.endpoint.as_deref())?;
        if config.token.is_none() {
            tracing::warn!(%endpoint, "synthesis client has no credential configured");
        }
        let backend = ReqwestBackend::new(config)?;
        Ok(Self { backend, endpoint })
    }
}

impl<B: HttpBackend> SynthesisClient<B> {
    /// Create a new client with a custom backend.
    #[cfg(test)]
    pub(crate) fn with_backend(endpoint: &str, backend: B) -> Self {
        Self {
            backend,
            endpoint: Url::parse(endpoint).expect("test endpoint must parse"),
        }
    }

    /// The endpoint requests are sent to.
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send one synthesis request and interpret the response.
    pub(crate) async fn request_audio(
        &self,
        request: &SynthesisRequest,
    ) -> SynthesisResult<SynthesisPayload> {
        tracing::debug!(
            chars = request.text.chars().count(),
            voice_id = ?request.voice_id,
            model_id = ?request.model_id,
            "requesting synthesis"
        );
        let raw = self.backend.post_json(&self.endpoint, request).await?;
        interpret(raw)
    }
}

/// JSON error body returned by the function on failure.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn interpret(raw: RawResponse) -> SynthesisResult<SynthesisPayload> {
    if !raw.is_success() {
        let body: ErrorBody = serde_json::from_slice(&raw.body).unwrap_or_default();
        tracing::warn!(
            status = raw.status,
            error = ?body.error,
            message = ?body.message,
            "synthesis request rejected"
        );
        return Err(SynthesisError::ApiRequestFailed {
            status: raw.status,
            error: body.error,
            message: body.message,
        });
    }

    // 204 carries no body by definition; anything else is passed through for validation.
    let bytes = if raw.status == 204 {
        None
    } else {
        Some(raw.body)
    };
    Ok(SynthesisPayload::new(raw.content_type, bytes))
}

/// Parse the configured endpoint into an absolute http(s) URL with a host.
fn validate_endpoint(endpoint: Option<&str>) -> SynthesisResult<Url> {
    let endpoint = endpoint
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or(SynthesisError::MissingEndpoint)?;
    let url = Url::parse(endpoint)?;
    if !matches!(url.scheme(), "https" | "http") || url.host_str().is_none_or(str::is_empty) {
        return Err(SynthesisError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(url)
}

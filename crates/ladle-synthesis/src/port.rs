//! Port trait implementation for `SynthesisClient`.
//!
//! Implements the core-owned `SynthesisPort` trait, converting internal
//! errors into `SynthesisPortError` at the boundary.

use async_trait::async_trait;
use ladle_core::{
    SynthesisPayload, SynthesisPort, SynthesisPortError, SynthesisPortResult, SynthesisRequest,
};

use crate::client::SynthesisClient;
use crate::error::SynthesisError;
use crate::http::HttpBackend;

// ============================================================================
// Error Mapping
// ============================================================================

/// Convert internal `SynthesisError` to core `SynthesisPortError`.
pub(crate) fn map_error(err: SynthesisError) -> SynthesisPortError {
    match err {
        SynthesisError::ApiRequestFailed {
            status,
            error,
            message,
        } => {
            if status == 401 || status == 403 {
                SynthesisPortError::Unauthorized { status }
            } else {
                SynthesisPortError::Rejected {
                    status,
                    error,
                    message,
                }
            }
        }
        SynthesisError::MissingEndpoint => SynthesisPortError::Configuration {
            message: "no synthesis endpoint configured".to_string(),
        },
        SynthesisError::InvalidUrl(e) => SynthesisPortError::Configuration {
            message: format!("endpoint is not a valid URL: {e}"),
        },
        SynthesisError::InvalidEndpoint(endpoint) => SynthesisPortError::Configuration {
            message: format!("endpoint must be an http(s) URL with a host: {endpoint}"),
        },
        SynthesisError::ClientBuild(e) => SynthesisPortError::Configuration {
            message: e.to_string(),
        },
        SynthesisError::Network(e) => {
            if e.is_body() || e.is_decode() {
                SynthesisPortError::InvalidResponse {
                    message: e.to_string(),
                }
            } else {
                SynthesisPortError::Unreachable {
                    message: e.to_string(),
                }
            }
        }
    }
}

// ============================================================================
// Port Implementation
// ============================================================================

#[async_trait]
impl<B: HttpBackend + Send + Sync> SynthesisPort for SynthesisClient<B> {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> SynthesisPortResult<SynthesisPayload> {
        self.request_audio(request).await.map_err(map_error)
    }
}

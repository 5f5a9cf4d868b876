//! Internal error types for synthesis requests.
//!
//! These errors are internal to `ladle-synthesis` and are mapped to core port
//! errors at the boundary.

use thiserror::Error;

/// Result type alias for synthesis operations.
pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// Errors related to calling the synthesis function.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The function answered with a non-success status.
    #[error("Synthesis request failed with status {status}")]
    ApiRequestFailed {
        /// HTTP status code
        status: u16,
        /// `error` field of the JSON body, if the body was JSON
        error: Option<String>,
        /// `message` field of the JSON body, if the body was JSON
        message: Option<String>,
    },

    /// No endpoint was configured.
    #[error("No synthesis endpoint configured")]
    MissingEndpoint,

    /// The endpoint is not a URL at all.
    #[error("Invalid synthesis endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The endpoint parsed but cannot be requested (non-http scheme or no host).
    #[error("Invalid synthesis endpoint: {0}")]
    InvalidEndpoint(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_request_failed_error_message() {
        let error = SynthesisError::ApiRequestFailed {
            status: 503,
            error: None,
            message: None,
        };
        assert!(error.to_string().contains("503"));
    }

    #[test]
    fn test_invalid_endpoint_error_message() {
        let error = SynthesisError::InvalidEndpoint("ftp://nope".to_string());
        assert!(error.to_string().contains("ftp://nope"));
    }

    #[test]
    fn test_parse_error_converts() {
        let error: SynthesisError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(error, SynthesisError::InvalidUrl(_)));
        assert!(error.to_string().starts_with("Invalid synthesis endpoint URL"));
    }

    #[test]
    fn test_synthesis_result_err() {
        let result: SynthesisResult<()> = Err(SynthesisError::MissingEndpoint);
        assert!(matches!(result, Err(SynthesisError::MissingEndpoint)));
    }
}

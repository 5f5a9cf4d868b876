//! HTTP backend abstraction for the synthesis function.
//!
//! This module provides a trait-based HTTP backend that allows for
//! dependency injection and easy testing. The production implementation
//! uses reqwest and sends exactly one request per call.

use crate::config::SynthesisClientConfig;
use crate::error::{SynthesisError, SynthesisResult};
use async_trait::async_trait;
use ladle_core::SynthesisRequest;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Status, declared type, and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Trait for HTTP backends that can POST a synthesis request.
///
/// This is an implementation detail - external code should use the
/// `SynthesisPort` trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// POST `body` as JSON to `url` and collect the whole response.
    async fn post_json(&self, url: &Url, body: &SynthesisRequest) -> SynthesisResult<RawResponse>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest.
pub struct ReqwestBackend {
    client: reqwest::Client,
    auth_token: Option<String>,
}

impl ReqwestBackend {
    /// Create a new reqwest backend with the given configuration.
    pub fn new(config: &SynthesisClientConfig) -> SynthesisResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(SynthesisError::ClientBuild)?;

        Ok(Self {
            client,
            auth_token: config.token.clone(),
        })
    }

    /// Build a request with optional authentication.
    fn build_request(&self, url: &Url, body: &SynthesisRequest) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(url.as_str())
            .header(ACCEPT, "audio/mpeg, application/json")
            .json(body);
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn post_json(&self, url: &Url, body: &SynthesisRequest) -> SynthesisResult<RawResponse> {
        let response = self.build_request(url, body).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?.to_vec();

        tracing::debug!(status, bytes = body.len(), ?content_type, "synthesis response");

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// A fake HTTP backend that returns one canned response and records requests.
    #[derive(Clone)]
    pub struct FakeBackend {
        response: RawResponse,
        requests: Arc<Mutex<Vec<(String, SynthesisRequest)>>>,
    }

    impl FakeBackend {
        pub fn new(response: RawResponse) -> Self {
            Self {
                response,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// A 200 `audio/mpeg` response with `len` bytes.
        pub fn audio(len: usize) -> Self {
            Self::new(RawResponse {
                status: 200,
                content_type: Some("audio/mpeg".to_string()),
                body: vec![0xFF; len],
            })
        }

        /// A JSON error response.
        pub fn error(status: u16, json: &serde_json::Value) -> Self {
            Self::new(RawResponse {
                status,
                content_type: Some("application/json".to_string()),
                body: serde_json::to_vec(json).unwrap(),
            })
        }

        pub fn requests(&self) -> Vec<(String, SynthesisRequest)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn post_json(
            &self,
            url: &Url,
            body: &SynthesisRequest,
        ) -> SynthesisResult<RawResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), body.clone()));
            Ok(self.response.clone())
        }
    }
}

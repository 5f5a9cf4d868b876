//! Public configuration for the synthesis client.

use std::time::Duration;

/// Environment variable holding the synthesis endpoint.
pub const ENV_SYNTHESIS_URL: &str = "LADLE_SYNTHESIS_URL";
/// Environment variable holding the bearer credential.
pub const ENV_SYNTHESIS_TOKEN: &str = "LADLE_SYNTHESIS_TOKEN";
/// Environment variable overriding the request timeout, in whole seconds.
pub const ENV_SYNTHESIS_TIMEOUT_SECS: &str = "LADLE_SYNTHESIS_TIMEOUT_SECS";

/// Configuration for the synthesis client.
///
/// Use the builder pattern methods to customize the client configuration.
///
/// # Example
///
/// ```
/// use ladle_synthesis::SynthesisClientConfig;
/// use std::time::Duration;
///
/// let config = SynthesisClientConfig::new()
///     .with_endpoint("https://api.example.com/functions/v1/text-to-speech")
///     .with_timeout(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct SynthesisClientConfig {
    /// Full URL of the synthesis function
    pub(crate) endpoint: Option<String>,
    /// Bearer credential sent in the `Authorization` header
    pub(crate) token: Option<String>,
    /// Request timeout
    pub(crate) timeout: Duration,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
}

impl Default for SynthesisClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            timeout: Duration::from_secs(30),
            user_agent: concat!("ladle-synthesis/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SynthesisClientConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from a key lookup.
    ///
    /// Unset or unparsable values keep their defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let timeout = lookup(ENV_SYNTHESIS_TIMEOUT_SECS)
            .and_then(|v| v.trim().parse().ok())
            .map_or(defaults.timeout, Duration::from_secs);
        Self {
            endpoint: lookup(ENV_SYNTHESIS_URL).filter(|v| !v.trim().is_empty()),
            token: lookup(ENV_SYNTHESIS_TOKEN).filter(|v| !v.trim().is_empty()),
            timeout,
            ..defaults
        }
    }

    /// Build a configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Set the synthesis endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Set the bearer credential.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set an optional bearer credential.
    #[must_use]
    pub fn with_optional_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Set the request timeout.
    ///
    /// Defaults to 30 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string for HTTP requests.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// The configured endpoint, if any.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Whether a credential is configured.
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SynthesisClientConfig::new();
        assert!(config.endpoint.is_none());
        assert!(config.token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.contains("ladle-synthesis"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = SynthesisClientConfig::new()
            .with_endpoint("https://tts.example.com/speak")
            .with_token("secret")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent");

        assert_eq!(config.endpoint(), Some("https://tts.example.com/speak"));
        assert_eq!(config.token, Some("secret".to_string()));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn test_optional_token() {
        let with_token = SynthesisClientConfig::new().with_optional_token(Some("t".to_string()));
        assert!(with_token.has_token());

        let without_token = SynthesisClientConfig::new().with_optional_token(None);
        assert!(!without_token.has_token());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_SYNTHESIS_URL, "https://tts.example.com/speak"),
            (ENV_SYNTHESIS_TOKEN, "anon"),
            (ENV_SYNTHESIS_TIMEOUT_SECS, "12"),
        ]);
        let config = SynthesisClientConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.endpoint(), Some("https://tts.example.com/speak"));
        assert_eq!(config.token.as_deref(), Some("anon"));
        assert_eq!(config.timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_from_lookup_ignores_blank_and_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_SYNTHESIS_URL, "   "),
            (ENV_SYNTHESIS_TIMEOUT_SECS, "soon"),
        ]);
        let config = SynthesisClientConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert!(config.endpoint().is_none());
        assert!(!config.has_token());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}

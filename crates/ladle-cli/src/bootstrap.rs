//! CLI bootstrap: the composition root.
//!
//! This is the only place where the synthesis adapter is instantiated.
//! Command handlers receive a [`CliContext`] and work through the
//! `SynthesisPort` trait and the voice controllers.

use std::path::Path;
use std::sync::Arc;

use ladle_core::{SynthesisPort, VoiceSettings, validate_settings};
use ladle_synthesis::{DefaultSynthesisClient, SynthesisClientConfig};
use ladle_voice::PlaybackConfig;

use crate::commands::VoiceArgs;
use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Voice settings from the settings file, or defaults.
    pub settings: VoiceSettings,
    /// Synthesis client configuration with the endpoint resolved.
    pub client: SynthesisClientConfig,
}

impl CliConfig {
    /// Load settings from `settings_path` (if any) and the environment.
    ///
    /// Endpoint precedence: `endpoint` flag, `LADLE_SYNTHESIS_URL`, then the
    /// settings file's `synthesis_url`.
    pub fn load(settings_path: Option<&Path>, endpoint: Option<String>) -> Result<Self, CliError> {
        let settings = match settings_path {
            Some(path) => read_settings(path)?,
            None => VoiceSettings::default(),
        };
        Ok(Self::resolve(
            settings,
            endpoint,
            SynthesisClientConfig::from_env(),
        ))
    }

    fn resolve(
        settings: VoiceSettings,
        endpoint: Option<String>,
        env_client: SynthesisClientConfig,
    ) -> Self {
        let endpoint = endpoint
            .or_else(|| env_client.endpoint().map(str::to_string))
            .or_else(|| settings.synthesis_url.clone());
        let client = match endpoint {
            Some(url) => env_client.with_endpoint(url),
            None => env_client,
        };
        Self { settings, client }
    }
}

/// Read and validate a JSON settings file.
pub fn read_settings(path: &Path) -> Result<VoiceSettings, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    let settings: VoiceSettings = serde_json::from_str(&raw)?;
    validate_settings(&settings)?;
    tracing::debug!(path = %path.display(), "Loaded voice settings");
    Ok(settings)
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    pub settings: VoiceSettings,
    pub client: SynthesisClientConfig,
    synthesis: Option<Arc<dyn SynthesisPort>>,
}

impl CliContext {
    #[cfg(test)]
    pub(crate) fn with_synthesis(settings: VoiceSettings, synthesis: Arc<dyn SynthesisPort>) -> Self {
        Self {
            settings,
            client: SynthesisClientConfig::new(),
            synthesis: Some(synthesis),
        }
    }

    /// The synthesis backend, or a configuration error when no endpoint is set.
    pub fn synthesis(&self) -> Result<Arc<dyn SynthesisPort>, CliError> {
        self.synthesis.clone().ok_or_else(|| {
            CliError::Config(format!(
                "no synthesis endpoint configured (set {} or pass --endpoint)",
                ladle_synthesis::ENV_SYNTHESIS_URL
            ))
        })
    }

    /// Playback configuration from settings, with per-invocation voice overrides.
    pub fn playback_config(&self, voice: &VoiceArgs) -> PlaybackConfig {
        let mut config = PlaybackConfig::from_settings(&self.settings);
        if let Some(voice_id) = &voice.voice {
            config = config.with_default_voice_id(voice_id.clone());
        }
        if let Some(model_id) = &voice.model {
            config = config.with_default_model_id(model_id.clone());
        }
        config
    }
}

/// Bootstrap the CLI context.
///
/// The synthesis client is built only when an endpoint is known, so
/// commands that never call the backend work without one.
pub fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    validate_settings(&config.settings)?;

    let synthesis: Option<Arc<dyn SynthesisPort>> = if config.client.endpoint().is_some() {
        Some(Arc::new(DefaultSynthesisClient::new(&config.client)?))
    } else {
        None
    };

    Ok(CliContext {
        settings: config.settings,
        client: config.client,
        synthesis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_with_url(url: Option<&str>) -> SynthesisClientConfig {
        let url = url.map(str::to_string);
        SynthesisClientConfig::from_lookup(move |key| {
            (key == ladle_synthesis::ENV_SYNTHESIS_URL)
                .then(|| url.clone())
                .flatten()
        })
    }

    #[test]
    fn test_flag_endpoint_wins() {
        let settings = VoiceSettings {
            synthesis_url: Some("https://settings.example.com".into()),
            ..Default::default()
        };
        let config = CliConfig::resolve(
            settings,
            Some("https://flag.example.com".into()),
            env_with_url(Some("https://env.example.com")),
        );
        assert_eq!(config.client.endpoint(), Some("https://flag.example.com"));
    }

    #[test]
    fn test_env_endpoint_beats_settings() {
        let settings = VoiceSettings {
            synthesis_url: Some("https://settings.example.com".into()),
            ..Default::default()
        };
        let config = CliConfig::resolve(settings, None, env_with_url(Some("https://env.example.com")));
        assert_eq!(config.client.endpoint(), Some("https://env.example.com"));
    }

    #[test]
    fn test_settings_endpoint_is_fallback() {
        let settings = VoiceSettings {
            synthesis_url: Some("https://settings.example.com".into()),
            ..Default::default()
        };
        let config = CliConfig::resolve(settings, None, env_with_url(None));
        assert_eq!(config.client.endpoint(), Some("https://settings.example.com"));
    }

    #[test]
    fn test_read_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_text_len": 1200, "autoplay": false}}"#).unwrap();

        let settings = read_settings(file.path()).unwrap();
        assert_eq!(settings.max_text_len, Some(1200));
        assert_eq!(settings.autoplay, Some(false));
        assert!(settings.silence_timeout_ms.is_none());
    }

    #[test]
    fn test_read_settings_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"silence_timeout_ms": 10}}"#).unwrap();

        let err = read_settings(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn test_read_settings_missing_file() {
        let err = read_settings(Path::new("/nonexistent/ladle.json")).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn test_bootstrap_without_endpoint() {
        let config = CliConfig::resolve(VoiceSettings::default(), None, env_with_url(None));
        let ctx = bootstrap(config).unwrap();
        assert!(matches!(ctx.synthesis(), Err(CliError::Config(_))));
    }

    #[test]
    fn test_playback_config_overrides() {
        let config = CliConfig::resolve(
            VoiceSettings {
                default_voice_id: Some("narrator".into()),
                default_model_id: Some("classic".into()),
                ..Default::default()
            },
            None,
            env_with_url(None),
        );
        let ctx = bootstrap(config).unwrap();
        let voice = VoiceArgs {
            voice: None,
            model: Some("turbo".into()),
        };
        let playback = ctx.playback_config(&voice);
        assert_eq!(playback.default_voice_id.as_deref(), Some("narrator"));
        assert_eq!(playback.default_model_id.as_deref(), Some("turbo"));
    }
}

//! CLI-specific error types and mappings.
//!
//! Library errors are mapped to exit codes and user-facing messages here.

use ladle_core::{SettingsError, SynthesisPortError};
use ladle_voice::PlaybackError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument error, including text rejected before any request.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Synthesis or playback failure.
    #[error("{0}")]
    Playback(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions (see sysexits.h).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Playback(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<PlaybackError> for CliError {
    fn from(err: PlaybackError) -> Self {
        if err.is_validation() {
            Self::Arguments(err.to_string())
        } else {
            Self::Playback(err.to_string())
        }
    }
}

impl From<SynthesisPortError> for CliError {
    fn from(err: SynthesisPortError) -> Self {
        match err {
            SynthesisPortError::Configuration { message } => Self::Config(message),
            other => Self::Playback(other.to_string()),
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("invalid settings file: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_usage_errors() {
        let err = CliError::from(PlaybackError::Validation);
        assert_eq!(err.exit_code(), 2);

        let err = CliError::from(PlaybackError::TextTooLong { len: 6, max: 5 });
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_playback_errors_exit_one() {
        let err = CliError::from(PlaybackError::ServiceUnavailable("down".into()));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "Speech service unavailable: down");
    }

    #[test]
    fn test_port_configuration_error_is_config() {
        let err = CliError::from(SynthesisPortError::Configuration {
            message: "no endpoint".into(),
        });
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn test_settings_error_is_config() {
        let err = CliError::from(SettingsError::EmptyLanguage);
        assert_eq!(err.exit_code(), 78);
    }
}

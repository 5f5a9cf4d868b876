#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use ports::{
    SynthesisPayload, SynthesisPort, SynthesisPortError, SynthesisPortResult, SynthesisRequest,
};
pub use settings::{
    DEFAULT_MAX_TEXT_LEN, DEFAULT_MIN_AUDIO_BYTES, DEFAULT_READY_TIMEOUT_MS,
    DEFAULT_RECOGNITION_LANGUAGE, DEFAULT_SILENCE_TIMEOUT_MS, SettingsError, VoiceSettings,
    validate_settings,
};

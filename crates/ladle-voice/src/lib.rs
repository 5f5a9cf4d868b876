#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod audio_io;
pub mod capture;
pub mod error;
pub mod generation;
#[cfg(feature = "local-audio")]
pub mod local_audio;
pub mod playback;
pub mod resource;
pub mod timer;

// Re-export key types for convenience
pub use audio_io::{
    AudioUnit, MediaErrorCode, MediaEvent, MediaListener, RecognitionEngine, RecognitionHost,
    RecognitionListener, RecognitionOptions, RecognitionResult, RecognitionSegment,
};
pub use capture::{CaptureConfig, CaptureEvent, CaptureStatus, SpeechCapture, Transcript};
pub use error::{CaptureError, PlaybackError, PlaybackErrorKind};
pub use generation::{Generation, GenerationCounter};
pub use playback::{
    PlaybackConfig, PlaybackEvent, PlaybackSnapshot, PlaybackStatus, SpeakOptions, SpeakOutcome,
    SpeechPlayback,
};
pub use resource::{AudioResource, ResourceId, ResourceLocator, ResourceSlot};
pub use timer::CountdownTimer;

// Silence unused dev-dependency warnings
#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use mockall as _;

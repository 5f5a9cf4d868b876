//! Trait abstractions for the platform primitives the controllers drive.
//!
//! | Trait | Driven by | Platform equivalent |
//! |---|---|---|
//! | [`RecognitionEngine`] / [`RecognitionListener`] | [`SpeechCapture`](crate::capture::SpeechCapture) | continuous speech recognizer with `onstart`/`onresult`/`onend`/`onerror` |
//! | [`AudioUnit`] / [`MediaListener`] | [`SpeechPlayback`](crate::playback::SpeechPlayback) | a media element bound to one source at a time |
//!
//! All traits are object-safe and take `&self`; implementations use interior
//! mutability. Listeners may be invoked from any thread, including
//! synchronously from inside an engine or unit method.

use std::sync::Arc;
use std::time::Duration;

use crate::resource::ResourceLocator;

// ── Recognition ────────────────────────────────────────────────────

/// Options pushed to the engine when a capture controller is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    /// BCP-47 language tag.
    pub language: String,
    /// Keep recognising across pauses instead of ending after one utterance.
    pub continuous: bool,
    /// Deliver provisional results while the speaker is mid-utterance.
    pub interim_results: bool,
}

/// One raw segment as an engine reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSegment {
    pub text: String,
    pub is_final: bool,
}

impl RecognitionSegment {
    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

/// One result callback: newly finalized segments plus the current interim window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognitionResult {
    /// Segments the engine will not revise, in arrival order.
    pub finalized: Vec<String>,
    /// Provisional text for the utterance in progress.
    pub interim: Option<String>,
}

impl RecognitionResult {
    /// Collapse raw engine segments into the controller's result shape.
    ///
    /// Provisional pieces are concatenated into a single interim string.
    pub fn from_segments<I>(segments: I) -> Self
    where
        I: IntoIterator<Item = RecognitionSegment>,
    {
        let mut finalized = Vec::new();
        let mut interim: Option<String> = None;
        for segment in segments {
            if segment.is_final {
                finalized.push(segment.text);
            } else {
                interim.get_or_insert_with(String::new).push_str(&segment.text);
            }
        }
        Self { finalized, interim }
    }

    /// A result carrying only an interim window.
    pub fn interim_only(text: impl Into<String>) -> Self {
        Self {
            finalized: Vec::new(),
            interim: Some(text.into()),
        }
    }

    /// A result carrying only finalized segments.
    pub fn finalized_only<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            finalized: segments.into_iter().map(Into::into).collect(),
            interim: None,
        }
    }
}

/// Callbacks an engine delivers to its attached listener.
pub trait RecognitionListener: Send + Sync {
    /// The engine confirmed it is capturing.
    fn on_start(&self);

    /// New recognition output is available.
    fn on_result(&self, result: RecognitionResult);

    /// The engine stopped, for whatever reason.
    fn on_end(&self);

    /// The engine failed; `code` is the platform's string code (`"no-speech"`, ...).
    fn on_error(&self, code: &str);
}

/// A platform continuous speech recognizer.
pub trait RecognitionEngine: Send + Sync {
    fn configure(&self, options: &RecognitionOptions);

    /// Attach a listener, replacing any previous one. `None` detaches.
    fn set_listener(&self, listener: Option<Arc<dyn RecognitionListener>>);

    /// Begin recognising. `Err` carries the platform's synchronous failure text.
    fn start(&self) -> Result<(), String>;

    /// Stop and deliver any pending final results.
    fn stop(&self);

    /// Stop immediately and discard pending results.
    fn abort(&self);
}

/// Feature detection for the recognition capability.
pub trait RecognitionHost {
    /// The host's engine, or `None` when recognition is unavailable.
    fn recognition_engine(&self) -> Option<Arc<dyn RecognitionEngine>>;
}

// ── Playback ───────────────────────────────────────────────────────

/// Media error codes an audio unit can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaErrorCode {
    Aborted,
    Network,
    Decode,
    SourceNotSupported,
    /// `play()` was refused (autoplay policy or similar).
    NotAllowed,
    Unknown,
}

/// Lifecycle events from an audio unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    /// Enough data is buffered to play to the end without stalling.
    CanPlayThrough { duration: Option<Duration> },
    Playing,
    Paused,
    /// Periodic position report while playing.
    TimeUpdate {
        position: Duration,
        duration: Option<Duration>,
    },
    Ended,
    Error(MediaErrorCode),
}

/// Receiver for [`MediaEvent`]s.
pub trait MediaListener: Send + Sync {
    fn on_media_event(&self, event: MediaEvent);
}

/// A playback unit bound to at most one source at a time.
pub trait AudioUnit: Send + Sync {
    /// Attach a listener, replacing any previous one. `None` detaches.
    fn set_listener(&self, listener: Option<Arc<dyn MediaListener>>);

    /// Bind a source and begin loading it. Readiness is reported as
    /// [`MediaEvent::CanPlayThrough`] or [`MediaEvent::Error`].
    fn set_source(&self, source: &ResourceLocator);

    fn play(&self) -> Result<(), MediaErrorCode>;

    fn pause(&self);

    /// Seek to the start without changing play/pause state.
    fn rewind(&self);

    /// Drop the bound source.
    fn unload(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_segments_splits_final_and_interim() {
        let result = RecognitionResult::from_segments([
            RecognitionSegment::finalized("chicken"),
            RecognitionSegment::finalized(" curry"),
            RecognitionSegment::interim(" with"),
            RecognitionSegment::interim(" rice"),
        ]);
        assert_eq!(result.finalized, vec!["chicken", " curry"]);
        assert_eq!(result.interim.as_deref(), Some(" with rice"));
    }

    #[test]
    fn test_from_segments_without_interim() {
        let result = RecognitionResult::from_segments([RecognitionSegment::finalized("pasta")]);
        assert_eq!(result.finalized, vec!["pasta"]);
        assert!(result.interim.is_none());
    }

    #[test]
    fn test_from_segments_empty() {
        let result = RecognitionResult::from_segments(Vec::new());
        assert_eq!(result, RecognitionResult::default());
    }

    #[test]
    fn test_shorthand_constructors() {
        assert_eq!(
            RecognitionResult::interim_only("tom"),
            RecognitionResult {
                finalized: vec![],
                interim: Some("tom".into())
            }
        );
        assert_eq!(
            RecognitionResult::finalized_only(["tomato", " soup"]).finalized,
            vec!["tomato", " soup"]
        );
    }
}

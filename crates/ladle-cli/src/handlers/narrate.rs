//! Narrate command handler.
//!
//! Speaks the text through the local output device and renders the
//! controller's progress events until playback ends or fails.

use indicatif::{ProgressBar, ProgressStyle};

use crate::bootstrap::CliContext;
use crate::commands::VoiceArgs;
use crate::error::CliError;

/// Execute the narrate command.
#[cfg(feature = "local-audio")]
pub async fn execute(ctx: &CliContext, text: &str, voice: &VoiceArgs) -> Result<(), CliError> {
    use std::sync::Arc;

    use ladle_voice::local_audio::LocalAudioUnit;
    use ladle_voice::{AudioUnit, PlaybackEvent, PlaybackStatus, SpeakOptions, SpeakOutcome, SpeechPlayback};

    let unit = LocalAudioUnit::spawn().map_err(|e| CliError::Playback(e.to_string()))?;
    let config = ctx.playback_config(voice).with_autoplay(true);
    let (playback, mut events) =
        SpeechPlayback::new(ctx.synthesis()?, Arc::new(unit) as Arc<dyn AudioUnit>, config);

    if playback.speak(text, SpeakOptions::default()).await? == SpeakOutcome::Superseded {
        return Err(CliError::Playback("narration was superseded".into()));
    }

    let bar = narration_bar();
    while let Some(event) = events.recv().await {
        match event {
            PlaybackEvent::Progress(progress) => bar.set_position(bar_position(progress)),
            PlaybackEvent::StatusChanged(PlaybackStatus::Ended) => {
                bar.finish();
                break;
            }
            PlaybackEvent::Error(error) => {
                bar.abandon();
                return Err(error.into());
            }
            PlaybackEvent::StatusChanged(status) => tracing::debug!(?status, "Narration status"),
        }
    }
    Ok(())
}

/// Execute the narrate command.
#[cfg(not(feature = "local-audio"))]
#[allow(clippy::unused_async)]
pub async fn execute(_ctx: &CliContext, _text: &str, _voice: &VoiceArgs) -> Result<(), CliError> {
    Err(CliError::Arguments(
        "narrate needs local audio output; rebuild with `--features local-audio`".into(),
    ))
}

/// Bar length; playback progress in `[0, 1]` maps onto this many steps.
pub const PROGRESS_STEPS: u64 = 1000;

/// Progress bar for a narration, positioned with [`bar_position`].
pub fn narration_bar() -> ProgressBar {
    let bar = ProgressBar::new(PROGRESS_STEPS);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {percent:>3}%")
        .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("█▓░"));
    bar.set_style(style);
    bar
}

/// Bar position for `progress`, clamped to `[0, 1]`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn bar_position(progress: f32) -> u64 {
    (progress.clamp(0.0, 1.0) * PROGRESS_STEPS as f32).round() as u64
}

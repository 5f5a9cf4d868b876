//! Settings command handler.
//!
//! Prints the effective settings (defaults filled in) and the resolved
//! synthesis endpoint.

use ladle_core::VoiceSettings;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Settings with every default applied.
pub fn effective_settings(ctx: &CliContext) -> VoiceSettings {
    let settings = &ctx.settings;
    VoiceSettings {
        synthesis_url: ctx.client.endpoint().map(str::to_string),
        default_voice_id: settings.default_voice_id.clone(),
        default_model_id: settings.default_model_id.clone(),
        max_text_len: Some(settings.effective_max_text_len()),
        min_audio_bytes: Some(settings.effective_min_audio_bytes()),
        silence_timeout_ms: Some(settings.effective_silence_timeout_ms()),
        ready_timeout_ms: Some(settings.effective_ready_timeout_ms()),
        recognition_language: Some(settings.effective_recognition_language().to_string()),
        autoplay: Some(settings.effective_autoplay()),
    }
}

/// Execute the settings command.
pub fn execute(ctx: &CliContext) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(&effective_settings(ctx))?;
    println!("{json}");
    println!(
        "credential: {}",
        if ctx.client.has_token() {
            "configured"
        } else {
            "not set"
        }
    );
    Ok(())
}

//! Subcommand definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Voice and model selection shared by the narration commands.
#[derive(Args, Debug, Clone, Default)]
pub struct VoiceArgs {
    /// Voice id (defaults to the configured voice)
    #[arg(long)]
    pub voice: Option<String>,

    /// Synthesis model id (defaults to the configured model)
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize narration for TEXT and write the audio to a file
    Synthesize {
        /// Text to narrate
        text: String,

        /// Output file
        #[arg(short, long, default_value = "narration.mp3")]
        out: PathBuf,

        #[command(flatten)]
        voice: VoiceArgs,
    },

    /// Speak TEXT through the local output device
    Narrate {
        /// Text to narrate
        text: String,

        #[command(flatten)]
        voice: VoiceArgs,
    },

    /// Print the effective settings and synthesis endpoint
    Settings,
}

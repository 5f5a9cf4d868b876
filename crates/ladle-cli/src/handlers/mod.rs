//! Command handlers.
//!
//! Each handler takes the composed [`CliContext`](crate::CliContext) and the
//! parsed arguments for one subcommand.

pub mod narrate;
pub mod settings;
pub mod synthesize;

#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]
// DefaultSynthesisClient is meant to be used through the SynthesisPort trait,
// not its internal generic structure
#![allow(private_interfaces)]

mod client;
mod config;
mod error;
mod http;
mod port;

// ============================================================================
// Public API
// ============================================================================

// Client
pub use client::DefaultSynthesisClient;

// Configuration
pub use config::{
    ENV_SYNTHESIS_TIMEOUT_SECS, ENV_SYNTHESIS_TOKEN, ENV_SYNTHESIS_URL, SynthesisClientConfig,
};

// Silence unused dev-dependency warnings
#[cfg(test)]
use mockito as _;

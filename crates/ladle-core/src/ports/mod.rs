//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the voice controllers expect from
//! infrastructure. They contain no transport details and use only domain types.

pub mod synthesis;

pub use synthesis::{
    SynthesisPayload, SynthesisPort, SynthesisPortError, SynthesisPortResult, SynthesisRequest,
};

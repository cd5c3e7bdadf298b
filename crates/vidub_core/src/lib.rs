//! vidub Core - Backend logic for translating the speech of a video
//!
//! This crate contains the pipeline orchestration core with zero UI
//! dependencies: the stage sequencer with weighted progress, cooperative
//! cancellation, the temporary-artifact registry and the audio timeline
//! assembler. Downloading, speech recognition, translation, speech synthesis
//! and muxing are supplied by the caller through the traits in
//! [`collaborators`].

pub mod artifacts;
pub mod collaborators;
pub mod config;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod preflight;
pub mod progress;
pub mod subtitles;
pub mod timeline;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}

//! Data models for vidub.
//!
//! This module contains the core data structures used throughout the crate:
//! - Enums for pipeline stages, download quality tiers, subtitle placement
//! - Speech segments produced by transcription
//! - The run request describing one video to process

mod enums;
mod request;
mod segment;

// Re-export all public types
pub use enums::{Stage, SubtitleAlignment, SubtitlePosition, VideoQuality};
pub use request::{InputSource, RunRequest, SubtitleStyle};
pub use segment::{Segment, Transcription};

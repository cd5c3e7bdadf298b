//! Speech segments produced by transcription.

use serde::{Deserialize, Serialize};

/// A time-bounded unit of transcribed (later translated) speech.
///
/// Offsets are seconds from the start of the source audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    /// May be empty after a failed translation; an empty segment is a gap.
    pub text: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Whether the timing is usable (finite, non-negative, `end > start`).
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.end > self.start
    }

    /// Whether there is nothing to speak for this segment.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Start offset in whole milliseconds.
    pub fn start_ms(&self) -> u64 {
        (self.start.max(0.0) * 1000.0).round() as u64
    }

    /// End offset in whole milliseconds.
    pub fn end_ms(&self) -> u64 {
        (self.end.max(0.0) * 1000.0).round() as u64
    }
}

/// Output of the speech-recognition collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    /// Language code detected by the model.
    pub language: String,
    /// Segments ordered by start offset.
    pub segments: Vec<Segment>,
}

impl Transcription {
    pub fn new(language: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            language: language.into(),
            segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_requires_forward_timing() {
        assert!(Segment::new(0.0, 1.5, "hi").is_valid());
        assert!(!Segment::new(2.0, 2.0, "hi").is_valid());
        assert!(!Segment::new(3.0, 1.0, "hi").is_valid());
        assert!(!Segment::new(f64::NAN, 1.0, "hi").is_valid());
    }

    #[test]
    fn start_ms_rounds() {
        assert_eq!(Segment::new(1.2345, 2.0, "x").start_ms(), 1235);
        assert_eq!(Segment::new(0.0, 0.5, "x").end_ms(), 500);
    }

    #[test]
    fn blank_text_is_gap() {
        assert!(Segment::new(0.0, 1.0, "  ").is_blank());
        assert!(!Segment::new(0.0, 1.0, "word").is_blank());
    }
}

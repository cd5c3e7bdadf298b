//! Audio buffers handed to and produced by the assembler.

use serde::{Deserialize, Serialize};

/// Sample rate and channel layout of interleaved `f32` audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Number of frames covering `ms` milliseconds (rounded down).
    ///
    /// Saturates instead of overflowing for absurd offsets.
    pub fn frames_for_ms(&self, ms: u64) -> u64 {
        ms.saturating_mul(self.sample_rate as u64) / 1000
    }

    /// Duration of `frames` frames in milliseconds (rounded down).
    pub fn ms_for_frames(&self, frames: u64) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        frames.saturating_mul(1000) / self.sample_rate as u64
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(24_000, 1)
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz / {} ch", self.sample_rate, self.channels)
    }
}

/// An owned block of interleaved `f32` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub format: AudioFormat,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> Self {
        Self { samples, format }
    }

    /// A clip of `ms` milliseconds of silence.
    pub fn silence(ms: u64, format: AudioFormat) -> Self {
        let len = format.frames_for_ms(ms) as usize * format.channels as usize;
        Self::new(vec![0.0; len], format)
    }

    pub fn empty(format: AudioFormat) -> Self {
        Self::new(Vec::new(), format)
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> u64 {
        if self.format.channels == 0 {
            return 0;
        }
        (self.samples.len() / self.format.channels as usize) as u64
    }

    pub fn duration_ms(&self) -> u64 {
        self.format.ms_for_frames(self.frames())
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A synthesized clip and the nominal start of its segment.
///
/// `clip` is `None` when synthesis failed for that segment.
#[derive(Debug, Clone)]
pub struct TimelineClip {
    pub start_ms: u64,
    pub clip: Option<AudioClip>,
}

impl TimelineClip {
    pub fn new(start_ms: u64, clip: AudioClip) -> Self {
        Self {
            start_ms,
            clip: Some(clip),
        }
    }

    /// Placeholder for a segment whose audio is unavailable.
    pub fn missing(start_ms: u64) -> Self {
        Self {
            start_ms,
            clip: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_math() {
        let fmt = AudioFormat::new(44_100, 2);
        assert_eq!(fmt.frames_for_ms(1000), 44_100);
        assert_eq!(fmt.ms_for_frames(22_050), 500);

        let clip = AudioClip::silence(250, fmt);
        assert_eq!(clip.frames(), 11_025);
        assert_eq!(clip.samples.len(), 22_050);
        assert_eq!(clip.duration_ms(), 250);
    }

    #[test]
    fn huge_offsets_saturate() {
        let fmt = AudioFormat::new(48_000, 2);
        assert_eq!(fmt.frames_for_ms(u64::MAX), u64::MAX / 1000);
        assert_eq!(fmt.ms_for_frames(u64::MAX), u64::MAX / 48_000);
    }

    #[test]
    fn zero_rate_is_zero_duration() {
        let clip = AudioClip::new(vec![0.5; 10], AudioFormat::new(0, 1));
        assert_eq!(clip.duration_ms(), 0);
    }
}

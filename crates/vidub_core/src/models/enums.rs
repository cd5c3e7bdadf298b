//! Core enums used throughout the crate.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One ordered phase of the dubbing pipeline.
///
/// Variants are declared in execution order; `Ord` follows that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Download,
    ExtractAudio,
    Transcribe,
    Translate,
    Synthesize,
    Finalize,
}

impl Stage {
    /// Number of stages.
    pub const COUNT: usize = 6;

    /// All stages in execution order.
    pub const ALL: [Stage; Stage::COUNT] = [
        Stage::Download,
        Stage::ExtractAudio,
        Stage::Transcribe,
        Stage::Translate,
        Stage::Synthesize,
        Stage::Finalize,
    ];

    /// Zero-based position in the pipeline.
    pub fn index(self) -> usize {
        match self {
            Stage::Download => 0,
            Stage::ExtractAudio => 1,
            Stage::Transcribe => 2,
            Stage::Translate => 3,
            Stage::Synthesize => 4,
            Stage::Finalize => 5,
        }
    }

    /// Reference share of the whole run, in percent.
    pub fn default_weight(self) -> u32 {
        match self {
            Stage::Download => 20,
            Stage::ExtractAudio => 10,
            Stage::Transcribe => 30,
            Stage::Translate => 20,
            Stage::Synthesize => 15,
            Stage::Finalize => 5,
        }
    }

    /// Human-readable name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Download => "Download",
            Stage::ExtractAudio => "Extract Audio",
            Stage::Transcribe => "Transcribe",
            Stage::Translate => "Translate",
            Stage::Synthesize => "Synthesize",
            Stage::Finalize => "Finalize",
        }
    }

    /// The stage that runs after this one.
    pub fn next(self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Resolution tier requested from the downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoQuality {
    #[default]
    #[serde(rename = "best")]
    Best,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "240p")]
    P240,
    #[serde(rename = "144p")]
    P144,
}

impl VideoQuality {
    /// Maximum video height for this tier (None = no limit).
    pub fn max_height(self) -> Option<u32> {
        match self {
            VideoQuality::Best => None,
            VideoQuality::P1080 => Some(1080),
            VideoQuality::P720 => Some(720),
            VideoQuality::P480 => Some(480),
            VideoQuality::P360 => Some(360),
            VideoQuality::P240 => Some(240),
            VideoQuality::P144 => Some(144),
        }
    }

    fn label(self) -> &'static str {
        match self {
            VideoQuality::Best => "best",
            VideoQuality::P1080 => "1080p",
            VideoQuality::P720 => "720p",
            VideoQuality::P480 => "480p",
            VideoQuality::P360 => "360p",
            VideoQuality::P240 => "240p",
            VideoQuality::P144 => "144p",
        }
    }
}

impl std::fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for VideoQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best" => Ok(VideoQuality::Best),
            "1080p" => Ok(VideoQuality::P1080),
            "720p" => Ok(VideoQuality::P720),
            "480p" => Ok(VideoQuality::P480),
            "360p" => Ok(VideoQuality::P360),
            "240p" => Ok(VideoQuality::P240),
            "144p" => Ok(VideoQuality::P144),
            other => Err(format!("Unknown video quality '{}'", other)),
        }
    }
}

/// Vertical placement of burned-in subtitles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitlePosition {
    Top,
    Middle,
    #[default]
    Bottom,
}

/// Horizontal alignment of burned-in subtitles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleAlignment {
    Left,
    #[default]
    Center,
    Right,
}

//! The description of one video to process.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use super::enums::{SubtitleAlignment, SubtitlePosition, VideoQuality};

/// Where the source video comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Remote video fetched by the downloader.
    Url(String),
    /// Video already on disk; used in place.
    LocalFile(PathBuf),
}

impl InputSource {
    /// Check that the source is usable before any stage runs.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            InputSource::Url(raw) => {
                let url = Url::parse(raw.trim())
                    .map_err(|e| format!("Malformed URL '{}': {}", raw, e))?;
                match url.scheme() {
                    "http" | "https" => {}
                    other => {
                        return Err(format!("Unsupported URL scheme '{}' in '{}'", other, raw))
                    }
                }
                if url.host_str().map_or(true, str::is_empty) {
                    return Err(format!("URL has no host: '{}'", raw));
                }
                Ok(())
            }
            InputSource::LocalFile(path) => {
                if !path.exists() {
                    return Err(format!("Input file not found: {}", path.display()));
                }
                if !path.is_file() {
                    return Err(format!("Input is not a file: {}", path.display()));
                }
                Ok(())
            }
        }
    }

    /// Short name used for the run log.
    pub fn display_name(&self) -> String {
        match self {
            InputSource::Url(raw) => Url::parse(raw.trim())
                .ok()
                .and_then(|u| {
                    u.path_segments()
                        .and_then(|mut segs| segs.next_back().map(str::to_string))
                        .filter(|s| !s.is_empty())
                        .or_else(|| u.host_str().map(str::to_string))
                })
                .unwrap_or_else(|| "download".to_string()),
            InputSource::LocalFile(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "video".to_string()),
        }
    }

    /// The local file, if this is a local source.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            InputSource::LocalFile(path) => Some(path),
            InputSource::Url(_) => None,
        }
    }
}

/// Styling for the optional subtitle burn-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_font_color")]
    pub font_color: String,
    /// Background box colour, optionally with `@opacity` (e.g. `black@0.5`).
    #[serde(default = "default_box_color")]
    pub box_color: String,
    #[serde(default = "default_border_width")]
    pub border_width: u32,
    #[serde(default = "default_border_color")]
    pub border_color: String,
    #[serde(default)]
    pub position: SubtitlePosition,
    #[serde(default)]
    pub alignment: SubtitleAlignment,
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_font_size() -> u32 {
    24
}

fn default_font_color() -> String {
    "white".to_string()
}

fn default_box_color() -> String {
    "black@0.5".to_string()
}

fn default_border_width() -> u32 {
    1
}

fn default_border_color() -> String {
    "black".to_string()
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            font_color: default_font_color(),
            box_color: default_box_color(),
            border_width: default_border_width(),
            border_color: default_border_color(),
            position: SubtitlePosition::default(),
            alignment: SubtitleAlignment::default(),
        }
    }
}

/// Everything needed to process one video end-to-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub input: InputSource,
    /// Source language code, or `auto` to use the detected language.
    pub from_lang: String,
    pub to_lang: String,
    /// Parent of the run folder (None = alongside the input).
    pub output_dir: Option<PathBuf>,
    pub quality: VideoQuality,
    pub add_subtitles: bool,
    /// Burn-in style; `None` uses the configured `[subtitle]` style.
    #[serde(default)]
    pub subtitle_style: Option<SubtitleStyle>,
}

impl RunRequest {
    pub fn new(input: InputSource, from_lang: impl Into<String>, to_lang: impl Into<String>) -> Self {
        Self {
            input,
            from_lang: from_lang.into(),
            to_lang: to_lang.into(),
            output_dir: None,
            quality: VideoQuality::default(),
            add_subtitles: false,
            subtitle_style: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_quality(mut self, quality: VideoQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Burn the translated subtitles into the final video.
    pub fn with_subtitles(mut self, style: SubtitleStyle) -> Self {
        self.add_subtitles = true;
        self.subtitle_style = Some(style);
        self
    }

    /// Burn the translated subtitles in with the configured style.
    pub fn with_default_subtitles(mut self) -> Self {
        self.add_subtitles = true;
        self.subtitle_style = None;
        self
    }

    /// Whether the source language should come from transcription.
    pub fn detect_source_language(&self) -> bool {
        self.from_lang.trim().is_empty() || self.from_lang.eq_ignore_ascii_case("auto")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn url_validation() {
        assert!(InputSource::Url("https://youtu.be/abc123".into()).validate().is_ok());
        assert!(InputSource::Url("not a url".into()).validate().is_err());
        assert!(InputSource::Url("ftp://example.com/v.mp4".into())
            .validate()
            .is_err());
    }

    #[test]
    fn local_file_validation() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"data").unwrap();

        assert!(InputSource::LocalFile(file).validate().is_ok());
        assert!(InputSource::LocalFile(dir.path().join("missing.mp4"))
            .validate()
            .is_err());
        assert!(InputSource::LocalFile(dir.path().to_path_buf())
            .validate()
            .is_err());
    }

    #[test]
    fn display_names() {
        let local = InputSource::LocalFile(PathBuf::from("/videos/My Talk.mp4"));
        assert_eq!(local.display_name(), "My Talk");

        let remote = InputSource::Url("https://example.com/watch/intro".into());
        assert_eq!(remote.display_name(), "intro");
    }

    #[test]
    fn auto_language_detection_flag() {
        let req = RunRequest::new(InputSource::Url("https://a.b/c".into()), "auto", "pl");
        assert!(req.detect_source_language());
        let req = RunRequest::new(InputSource::Url("https://a.b/c".into()), "en", "pl");
        assert!(!req.detect_source_language());
    }
}

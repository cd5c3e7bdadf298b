//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};
use crate::models::SubtitleStyle;
use crate::timeline::AudioFormat;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Format of the assembled dubbed track.
    #[serde(default)]
    pub audio: AudioSettings,

    #[serde(default)]
    pub voices: VoiceSettings,

    /// Burn-in style for requests that do not name one.
    #[serde(default)]
    pub subtitle: SubtitleStyle,
}

impl Settings {
    /// Per-run logger configuration derived from the logging section.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.logging.level,
            compact: self.logging.compact,
            progress_step: self.logging.progress_step,
            error_tail: self.logging.error_tail as usize,
            show_timestamps: true,
        }
    }

    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::new(self.audio.sample_rate, self.audio.channels)
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.paths.logs_folder)
    }

    /// Configured default output folder, if any.
    pub fn output_folder(&self) -> Option<PathBuf> {
        let trimmed = self.paths.output_folder.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }
}

/// Output and log locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Parent for run folders; empty means next to the input video.
    #[serde(default)]
    pub output_folder: String,

    /// Folder for run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: String::new(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Number of collaborator output lines to show on failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Run logs kept in the logs folder.
    #[serde(default = "default_keep_logs")]
    pub keep_logs: u32,
}

fn default_true() -> bool {
    true
}

fn default_progress_step() -> u32 {
    20
}

fn default_error_tail() -> u32 {
    20
}

fn default_keep_logs() -> u32 {
    5
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            progress_step: default_progress_step(),
            error_tail: default_error_tail(),
            keep_logs: default_keep_logs(),
        }
    }
}

/// Pipeline behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Delete intermediate files when a run ends.
    #[serde(default = "default_true")]
    pub clean_temp_files: bool,

    /// Concurrent text-to-speech requests.
    #[serde(default = "default_synthesis_workers")]
    pub synthesis_workers: usize,

    /// Free space required before a run starts (GB, 0 disables the check).
    #[serde(default = "default_min_free_space_gb")]
    pub min_free_space_gb: f64,

    /// Executables that must be on PATH.
    #[serde(default = "default_required_tools")]
    pub required_tools: Vec<String>,

    /// Extra file-name regexes treated as disposable.
    #[serde(default)]
    pub extra_disposable_patterns: Vec<String>,
}

fn default_synthesis_workers() -> usize {
    4
}

fn default_min_free_space_gb() -> f64 {
    2.0
}

fn default_required_tools() -> Vec<String> {
    vec!["ffmpeg".to_string()]
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            clean_temp_files: true,
            synthesis_workers: default_synthesis_workers(),
            min_free_space_gb: default_min_free_space_gb(),
            required_tools: default_required_tools(),
            extra_disposable_patterns: Vec::new(),
        }
    }
}

/// Sample format of the assembled track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_sample_rate() -> u32 {
    24_000
}

fn default_channels() -> u16 {
    1
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }
}

/// Text-to-speech voice per target language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Voice used when a language has no entry.
    #[serde(default = "default_fallback_voice")]
    pub fallback: String,

    /// Language code to voice name.
    #[serde(default = "default_voice_map")]
    pub languages: BTreeMap<String, String>,
}

fn default_fallback_voice() -> String {
    "en-US-GuyNeural".to_string()
}

fn default_voice_map() -> BTreeMap<String, String> {
    [
        ("en", "en-US-GuyNeural"),
        ("pl", "pl-PL-MarekNeural"),
        ("es", "es-ES-AlvaroNeural"),
        ("fr", "fr-FR-HenriNeural"),
        ("de", "de-DE-ConradNeural"),
        ("it", "it-IT-DiegoNeural"),
        ("ja", "ja-JP-NanjoNeural"),
        ("ru", "ru-RU-DmitryNeural"),
        ("zh", "zh-CN-YunxiNeural"),
        ("pt", "pt-BR-AntonioNeural"),
    ]
    .into_iter()
    .map(|(lang, voice)| (lang.to_string(), voice.to_string()))
    .collect()
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            fallback: default_fallback_voice(),
            languages: default_voice_map(),
        }
    }
}

impl VoiceSettings {
    /// Voice for a language code such as `pl` or `pt-BR`.
    ///
    /// Tries the full code, then its primary subtag, then the fallback.
    pub fn voice_for(&self, lang: &str) -> &str {
        let lang = lang.trim().to_ascii_lowercase();
        let primary = lang.split(['-', '_']).next().unwrap_or(&lang);
        self.languages
            .get(&lang)
            .or_else(|| self.languages.get(primary))
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Pipeline,
    Audio,
    Voices,
    Subtitle,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Pipeline,
        ConfigSection::Audio,
        ConfigSection::Voices,
        ConfigSection::Subtitle,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Pipeline => "pipeline",
            ConfigSection::Audio => "audio",
            ConfigSection::Voices => "voices",
            ConfigSection::Subtitle => "subtitle",
        }
    }

    /// Comment written above the section in a generated file.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Pipeline => "Pipeline behaviour and preflight checks",
            ConfigSection::Audio => "Format of the dubbed audio track",
            ConfigSection::Voices => "Text-to-speech voice per target language",
            ConfigSection::Subtitle => "Default style for burned-in subtitles",
        }
    }
}

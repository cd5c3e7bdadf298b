//! Interfaces to the external engines the pipeline drives.
//!
//! The pipeline owns sequencing, progress, cancellation and cleanup; the
//! actual downloading, speech recognition, translation, speech synthesis
//! and muxing are done by implementations of these traits. All of them are
//! called from the pipeline worker thread (synthesis from a pool of
//! threads), so they must be `Send + Sync`.
//!
//! Long-running implementations should call
//! [`StageProgress::report`] as they go and poll
//! [`StageProgress::is_cancelled`] at their natural iteration points,
//! returning whatever they have when it turns true.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::{SubtitleStyle, Transcription, VideoQuality};
use crate::orchestrator::{StageProgress, StageResult};
use crate::timeline::AudioClip;

/// Fetches a remote video.
pub trait Downloader: Send + Sync {
    /// Download `url` into `dest_dir` and return the video file path.
    fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        quality: VideoQuality,
        progress: &StageProgress<'_>,
    ) -> StageResult<PathBuf>;
}

/// Pulls the audio track out of a video.
pub trait AudioExtractor: Send + Sync {
    /// Write the audio of `video` to `output` (or a sibling) and return it.
    fn extract(&self, video: &Path, output: &Path, progress: &StageProgress<'_>) -> StageResult<PathBuf>;
}

/// Speech recognition.
pub trait Transcriber: Send + Sync {
    /// Transcribe `audio` into timed segments plus the detected language.
    ///
    /// On cancellation, may return the segments produced so far.
    fn transcribe(&self, audio: &Path, progress: &StageProgress<'_>) -> StageResult<Transcription>;
}

/// Machine translation.
pub trait Translator: Send + Sync {
    /// Make the language pair usable (e.g. install a model package).
    ///
    /// Called once per run before the first segment is translated.
    fn prepare(&self, _from_lang: &str, _to_lang: &str) -> StageResult<()> {
        Ok(())
    }

    /// Translate one segment's text.
    fn translate_text(&self, text: &str, from_lang: &str, to_lang: &str) -> StageResult<String>;
}

/// Text-to-speech.
pub trait Synthesizer: Send + Sync {
    /// Speak `text` with `voice`, returning decoded interleaved samples.
    fn synthesize(&self, text: &str, voice: &str) -> StageResult<AudioClip>;
}

/// Audio/video muxing.
pub trait Remuxer: Send + Sync {
    /// Replace the audio of `video` with `audio`, writing `output`.
    fn replace_audio(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        progress: &StageProgress<'_>,
    ) -> StageResult<PathBuf>;

    /// Burn `subtitles` into `video` with `style`, writing `output`.
    fn burn_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        style: &SubtitleStyle,
        output: &Path,
        progress: &StageProgress<'_>,
    ) -> StageResult<PathBuf>;
}

/// The full set of engines one pipeline uses.
#[derive(Clone)]
pub struct Collaborators {
    pub downloader: Arc<dyn Downloader>,
    pub extractor: Arc<dyn AudioExtractor>,
    pub transcriber: Arc<dyn Transcriber>,
    pub translator: Arc<dyn Translator>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub remuxer: Arc<dyn Remuxer>,
}

impl Collaborators {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn Synthesizer>,
        remuxer: Arc<dyn Remuxer>,
    ) -> Self {
        Self {
            downloader,
            extractor,
            transcriber,
            translator,
            synthesizer,
            remuxer,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Collaborators { .. }")
    }
}

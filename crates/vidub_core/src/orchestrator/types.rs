//! Core types for the orchestrator pipeline.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::artifacts::{sanitize_folder_name, CleanupReport, TempArtifactRegistry};
use crate::collaborators::Collaborators;
use crate::config::Settings;
use crate::logging::RunLogger;
use crate::models::{RunRequest, Segment, Stage, SubtitleStyle};
use crate::progress::ProgressAggregator;

use super::errors::SegmentFailure;

/// Shared cooperative cancellation flag.
///
/// Clones observe the same flag. Setting it never blocks; the run stops
/// at its next check.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Progress reporter handed to one stage and its collaborators.
///
/// Reports are clamped to [0, 100] and never go backwards, so concurrent
/// workers can report in any order.
pub struct StageProgress<'a> {
    stage: Stage,
    aggregator: &'a ProgressAggregator,
    cancel: &'a CancelToken,
    logger: &'a RunLogger,
    last: Mutex<f64>,
}

impl<'a> StageProgress<'a> {
    pub fn new(
        stage: Stage,
        aggregator: &'a ProgressAggregator,
        cancel: &'a CancelToken,
        logger: &'a RunLogger,
    ) -> Self {
        Self {
            stage,
            aggregator,
            cancel,
            logger,
            last: Mutex::new(0.0),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Report progress within the stage (0-100). Returns the overall percent.
    pub fn report(&self, fraction_in_stage: f64) -> f64 {
        let requested = if fraction_in_stage.is_nan() {
            0.0
        } else {
            fraction_in_stage.clamp(0.0, 100.0)
        };

        let mut last = self.last.lock();
        let fraction = requested.max(*last);
        *last = fraction;
        let overall = self.aggregator.report(self.stage, fraction);
        drop(last);

        self.logger.progress(overall.floor() as u32);
        overall
    }

    /// Report `done` out of `total` work items.
    pub fn report_items(&self, done: usize, total: usize) -> f64 {
        if total == 0 {
            return self.report(100.0);
        }
        self.report(done as f64 * 100.0 / total as f64)
    }

    /// Poll point for cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Record a line of collaborator output (e.g. tool stderr).
    pub fn output_line(&self, line: &str) {
        self.logger.output_line(line);
    }
}

/// Read-only context passed to pipeline steps.
///
/// Mutable state goes in [`RunContext`].
pub struct Context {
    pub request: RunRequest,
    pub settings: Settings,
    pub collaborators: Collaborators,
    /// Run name used in logs and errors.
    pub run_name: String,
    pub logger: Arc<RunLogger>,
    pub progress: ProgressAggregator,
    pub cancel: CancelToken,
}

impl Context {
    /// Progress reporter for `stage`.
    pub fn stage_progress(&self, stage: Stage) -> StageProgress<'_> {
        StageProgress::new(stage, &self.progress, &self.cancel, &self.logger)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Burn-in style: the request's, else the configured default.
    pub fn subtitle_style(&self) -> &SubtitleStyle {
        self.request
            .subtitle_style
            .as_ref()
            .unwrap_or(&self.settings.subtitle)
    }

    /// Parent for the run folder when the user chose one.
    pub fn output_parent(&self) -> Option<PathBuf> {
        self.request
            .output_dir
            .clone()
            .or_else(|| self.settings.output_folder())
    }
}

/// Output from the Transcribe stage.
#[derive(Debug, Clone, Serialize)]
pub struct TranscribeOutput {
    /// Language reported by the transcriber.
    pub language: String,
    pub segments: Vec<Segment>,
    pub subtitle_path: PathBuf,
}

/// Output from the Translate stage.
#[derive(Debug, Clone, Serialize)]
pub struct TranslateOutput {
    pub from_lang: String,
    pub to_lang: String,
    /// Same length and order as the transcribed segments.
    pub segments: Vec<Segment>,
    pub subtitle_path: PathBuf,
}

/// Output from the Synthesize stage.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizeOutput {
    pub audio_path: PathBuf,
    pub duration_ms: u64,
    pub voice: String,
    pub clips_placed: usize,
}

/// Output from the Finalize stage.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeOutput {
    pub translated_video: PathBuf,
    pub subtitled_video: Option<PathBuf>,
}

impl FinalizeOutput {
    /// The video handed back to the caller.
    pub fn final_video(&self) -> &Path {
        self.subtitled_video.as_deref().unwrap_or(&self.translated_video)
    }
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// The step saw the cancellation flag and stopped early.
    Interrupted,
}

/// Mutable state of one run, accumulated stage by stage.
///
/// Owns the artifact registry. Cleanup runs once through [`finish`];
/// dropping an unfinished context runs it as well, so an unwinding
/// worker still leaves no residue.
///
/// [`finish`]: RunContext::finish
pub struct RunContext {
    pub current_stage: Option<Stage>,
    pub registry: TempArtifactRegistry,
    /// Sanitized stem used to name every artifact.
    pub base_name: Option<String>,
    /// Source video (downloaded or local).
    pub video: Option<PathBuf>,
    pub extracted_audio: Option<PathBuf>,
    pub transcription: Option<TranscribeOutput>,
    pub translation: Option<TranslateOutput>,
    pub synthesis: Option<SynthesizeOutput>,
    pub finalize: Option<FinalizeOutput>,
    pub segment_failures: Vec<SegmentFailure>,
    pub stages_completed: Vec<Stage>,
    cleanup_enabled: bool,
    finished: bool,
}

impl RunContext {
    pub fn new(registry: TempArtifactRegistry, cleanup_enabled: bool) -> Self {
        Self {
            current_stage: None,
            registry,
            base_name: None,
            video: None,
            extracted_audio: None,
            transcription: None,
            translation: None,
            synthesis: None,
            finalize: None,
            segment_failures: Vec::new(),
            stages_completed: Vec::new(),
            cleanup_enabled,
            finished: false,
        }
    }

    pub fn run_folder(&self) -> Option<&Path> {
        self.registry.run_folder()
    }

    /// The run folder, created on first use next to `base_path`.
    ///
    /// Later calls return the same folder.
    pub fn ensure_run_folder(&mut self, parent: &Path, base_path: &Path) -> std::io::Result<PathBuf> {
        if let Some(existing) = self.registry.run_folder() {
            return Ok(existing.to_path_buf());
        }
        let folder = self.registry.create_output_folder_in(parent, base_path)?;
        let stem = base_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.base_name = Some(sanitize_folder_name(&stem));
        Ok(folder)
    }

    /// `<run folder>/<base name><suffix>`, once the folder exists.
    pub fn artifact_path(&self, suffix: &str) -> Option<PathBuf> {
        let folder = self.registry.run_folder()?;
        let base = self.base_name.as_deref()?;
        Some(folder.join(format!("{}{}", base, suffix)))
    }

    pub fn record_failure(&mut self, failure: SegmentFailure) {
        tracing::warn!("{}", failure);
        self.segment_failures.push(failure);
    }

    /// Protect the final videos from cleanup. Called only after Finalize.
    pub fn commit_outputs(&mut self) {
        if let Some(output) = self.finalize.clone() {
            self.registry.mark_keep(output.translated_video);
            if let Some(subbed) = output.subtitled_video {
                self.registry.mark_keep(subbed);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Run cleanup (unless disabled). Only the first call does work.
    pub fn finish(&mut self) -> CleanupReport {
        if self.finished {
            return CleanupReport::default();
        }
        self.finished = true;
        if !self.cleanup_enabled {
            tracing::info!("Temporary file cleanup is disabled; leaving run folder as is");
            return CleanupReport::default();
        }
        self.registry.cleanup()
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.finish();
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub final_video: PathBuf,
    pub run_folder: Option<PathBuf>,
    pub segment_failures: Vec<SegmentFailure>,
    pub stages_completed: Vec<Stage>,
    pub cleanup: CleanupReport,
    pub log_path: Option<PathBuf>,
}

/// How a run ended, short of an error.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Stopped on request while `stage` was current.
    Cancelled { stage: Stage, cleanup: CleanupReport },
}

impl RunOutcome {
    /// The final video, for completed runs.
    pub fn final_video(&self) -> Option<&Path> {
        match self {
            RunOutcome::Completed(report) => Some(&report.final_video),
            RunOutcome::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use crate::progress::{observer_fn, ProgressValue};
    use tempfile::tempdir;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn stage_progress_never_goes_back() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let aggregator = ProgressAggregator::default().with_observer(observer_fn(move |v, _, _| {
            if let ProgressValue::Percent(p) = v {
                sink.lock().push(p);
            }
        }));
        let cancel = CancelToken::new();
        let logger = RunLogger::detached("t", LogConfig::default(), None);
        let progress = StageProgress::new(Stage::Transcribe, &aggregator, &cancel, &logger);

        progress.report(50.0);
        progress.report(20.0);
        progress.report_items(3, 4);

        assert_eq!(*seen.lock(), vec![45.0, 45.0, 52.5]);
    }

    #[test]
    fn run_folder_is_created_once() {
        let dir = tempdir().unwrap();
        let mut state = RunContext::new(TempArtifactRegistry::new(), true);

        let first = state
            .ensure_run_folder(dir.path(), Path::new("/videos/My Talk?.mp4"))
            .unwrap();
        let second = state
            .ensure_run_folder(dir.path(), Path::new("/videos/Other.mp4"))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first, dir.path().join("My Talk"));
        assert_eq!(
            state.artifact_path("_subtitles.srt"),
            Some(dir.path().join("My Talk").join("My Talk_subtitles.srt"))
        );
    }

    #[test]
    fn drop_cleans_up_unfinished_run() {
        let dir = tempdir().unwrap();
        let folder;
        {
            let mut state = RunContext::new(TempArtifactRegistry::new(), true);
            folder = state
                .ensure_run_folder(dir.path(), Path::new("clip.mp4"))
                .unwrap();
            let audio = state.artifact_path("_extracted_audio.wav").unwrap();
            std::fs::write(&audio, b"pcm").unwrap();
            state.registry.register_disposable(audio);
        }
        assert!(!folder.exists());
    }

    #[test]
    fn disabled_cleanup_leaves_files() {
        let dir = tempdir().unwrap();
        let mut state = RunContext::new(TempArtifactRegistry::new(), false);
        state.ensure_run_folder(dir.path(), Path::new("clip.mp4")).unwrap();
        let audio = state.artifact_path("_extracted_audio.wav").unwrap();
        std::fs::write(&audio, b"pcm").unwrap();

        assert!(state.finish().is_empty());
        assert!(state.is_finished());
        drop(state);
        assert!(audio.exists());
    }
}

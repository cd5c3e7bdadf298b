//! Pipeline controller that runs the six stages for one video.

use std::mem;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Local;
use parking_lot::Mutex;

use crate::artifacts::TempArtifactRegistry;
use crate::collaborators::Collaborators;
use crate::config::Settings;
use crate::logging::{prune_old_logs, LineCallback, RunLogger};
use crate::models::{RunRequest, Stage};
use crate::preflight;
use crate::progress::{ProgressAggregator, ProgressObserver, StageWeights};

use super::errors::{PipelineError, PipelineResult, StageError, StageResult};
use super::standard_steps;
use super::step::PipelineStep;
use super::types::{CancelToken, Context, RunContext, RunOutcome, RunReport, StepOutcome};

/// Where a controller is in its single run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    Running(Stage),
    Succeeded,
    /// `stage` is `None` when the run was rejected before any stage ran.
    Failed {
        stage: Option<Stage>,
        message: String,
    },
    Cancelled,
}

/// Runs the dubbing pipeline for one request.
///
/// A controller is single-use: the first [`run`](Self::run) owns it and
/// any later call returns [`PipelineError::AlreadyStarted`]. The cancel
/// token and the state are shared, so they can be read from another
/// thread while the run is in flight.
pub struct PipelineController {
    collaborators: Collaborators,
    settings: Settings,
    weights: StageWeights,
    steps: Vec<Box<dyn PipelineStep>>,
    cancel: CancelToken,
    state: Arc<Mutex<PipelineState>>,
    started: AtomicBool,
    log_callback: Mutex<Option<LineCallback>>,
}

impl PipelineController {
    pub fn new(collaborators: Collaborators, settings: Settings) -> Self {
        Self {
            collaborators,
            settings,
            weights: StageWeights::default(),
            steps: standard_steps(),
            cancel: CancelToken::new(),
            state: Arc::new(Mutex::new(PipelineState::Idle)),
            started: AtomicBool::new(false),
            log_callback: Mutex::new(None),
        }
    }

    /// Use a custom stage weight table.
    pub fn with_weights(mut self, weights: StageWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Share an existing cancellation token (e.g. one owned by the UI).
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Receive every formatted run-log line.
    pub fn with_log_callback(self, callback: LineCallback) -> Self {
        *self.log_callback.lock() = Some(callback);
        self
    }

    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation. Returns immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> PipelineState {
        self.state.lock().clone()
    }

    fn set_state(&self, state: PipelineState) {
        *self.state.lock() = state;
    }

    /// Run every stage for `request` on the calling thread.
    ///
    /// Returns the final video on success and [`RunOutcome::Cancelled`]
    /// when the run was stopped. Temporary artifacts are cleaned up on
    /// every path out of this call.
    pub fn run(
        &self,
        request: RunRequest,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> PipelineResult<RunOutcome> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::AlreadyStarted);
        }

        let result = self.execute(request, observer);
        let final_state = match &result {
            Ok(RunOutcome::Completed(_)) => PipelineState::Succeeded,
            Ok(RunOutcome::Cancelled { .. }) => PipelineState::Cancelled,
            Err(e) => PipelineState::Failed {
                stage: e.stage(),
                message: e.to_string(),
            },
        };
        self.set_state(final_state);
        result
    }

    /// Run on a dedicated worker thread.
    pub fn spawn(
        self,
        request: RunRequest,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> PipelineResult<RunHandle> {
        if self.started.load(Ordering::SeqCst) {
            return Err(PipelineError::AlreadyStarted);
        }

        let name = request.input.display_name();
        let cancel = self.cancel.clone();
        let state = Arc::clone(&self.state);
        let handle = thread::Builder::new()
            .name("vidub-pipeline".to_string())
            .spawn(move || self.run(request, observer))
            .map_err(|e| PipelineError::setup(&name, format!("cannot start pipeline thread: {}", e)))?;

        Ok(RunHandle {
            name,
            handle,
            cancel,
            state,
        })
    }

    /// Parent directory the run folder will live in.
    fn run_parent(&self, request: &RunRequest) -> PathBuf {
        request
            .output_dir
            .clone()
            .or_else(|| self.settings.output_folder())
            .or_else(|| {
                request
                    .input
                    .local_path()
                    .and_then(Path::parent)
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn execute(
        &self,
        request: RunRequest,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> PipelineResult<RunOutcome> {
        request.input.validate().map_err(PipelineError::input)?;
        if request.to_lang.trim().is_empty() {
            return Err(PipelineError::input("No target language given"));
        }

        let parent = self.run_parent(&request);
        let pipeline = &self.settings.pipeline;
        preflight::check_free_space(&parent, pipeline.min_free_space_gb)
            .map_err(PipelineError::resource)?;
        preflight::check_tools(&pipeline.required_tools).map_err(PipelineError::resource)?;

        let run_name = format!(
            "{}_{}",
            request.input.display_name(),
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let logs_dir = self.settings.logs_folder();
        let callback = self.log_callback.lock().take();
        let logger = RunLogger::new(run_name.clone(), &logs_dir, self.settings.log_config(), callback)
            .map_err(|e| {
                PipelineError::setup(
                    &run_name,
                    format!("cannot create run log in {}: {}", logs_dir.display(), e),
                )
            })?;
        match prune_old_logs(&logs_dir, self.settings.logging.keep_logs as usize) {
            Ok(removed) if !removed.is_empty() => {
                logger.debug(&format!("Removed {} old run log(s)", removed.len()))
            }
            Ok(_) => {}
            Err(e) => logger.warn(&format!("Could not prune old logs: {}", e)),
        }

        let mut registry = TempArtifactRegistry::new();
        for pattern in &pipeline.extra_disposable_patterns {
            if let Err(e) = registry.register_pattern(pattern) {
                logger.warn(&format!("Ignoring disposable pattern '{}': {}", pattern, e));
            }
        }
        let mut state = RunContext::new(registry, pipeline.clean_temp_files);

        let mut progress = ProgressAggregator::new(self.weights);
        if let Some(observer) = observer {
            progress = progress.with_observer(observer);
        }

        logger.info(&format!("Input: {}", request.input.display_name()));
        logger.info(&format!(
            "Languages: {} -> {}, quality {}, subtitles {}",
            request.from_lang,
            request.to_lang,
            request.quality,
            if request.add_subtitles { "burned in" } else { "off" }
        ));
        tracing::info!("Starting run '{}'", run_name);

        let ctx = Context {
            request,
            settings: self.settings.clone(),
            collaborators: self.collaborators.clone(),
            run_name,
            logger: Arc::new(logger),
            progress,
            cancel: self.cancel.clone(),
        };

        for step in &self.steps {
            let stage = step.stage();
            state.current_stage = Some(stage);

            if ctx.is_cancelled() {
                ctx.logger
                    .warn(&format!("Run cancelled before stage '{}'", step.name()));
                return Ok(self.cancelled(&ctx, &mut state, stage));
            }

            self.set_state(PipelineState::Running(stage));
            ctx.logger.stage(step.name());
            ctx.progress.report(stage, 0.0);

            match self.run_step(step.as_ref(), &ctx, &mut state) {
                Ok(StepOutcome::Completed) => {
                    ctx.logger.success(&format!("{} completed", step.name()));
                    state.stages_completed.push(stage);
                    ctx.progress.report(stage, 100.0);
                }
                Ok(StepOutcome::Interrupted) => {
                    ctx.logger
                        .warn(&format!("Run cancelled during stage '{}'", step.name()));
                    return Ok(self.cancelled(&ctx, &mut state, stage));
                }
                Err(e) if ctx.is_cancelled() => {
                    ctx.logger.warn(&format!(
                        "Run cancelled during stage '{}' ({})",
                        step.name(),
                        e
                    ));
                    return Ok(self.cancelled(&ctx, &mut state, stage));
                }
                Err(e) => return Err(self.failed(&ctx, &mut state, stage, e)),
            }
        }

        state.current_stage = None;
        state.commit_outputs();
        let final_video = match state.finalize.as_ref() {
            Some(output) => output.final_video().to_path_buf(),
            None => {
                state.finish();
                return Err(PipelineError::setup(
                    &ctx.run_name,
                    "pipeline finished without a final video",
                ));
            }
        };
        let cleanup = state.finish();

        let report = RunReport {
            final_video,
            run_folder: state.run_folder().map(Path::to_path_buf),
            segment_failures: mem::take(&mut state.segment_failures),
            stages_completed: mem::take(&mut state.stages_completed),
            cleanup,
            log_path: ctx.logger.log_path().map(Path::to_path_buf),
        };

        if !report.segment_failures.is_empty() {
            ctx.logger.warn(&format!(
                "{} segment(s) were skipped; the dub has gaps",
                report.segment_failures.len()
            ));
        }
        if let Ok(json) = serde_json::to_string_pretty(&report) {
            ctx.logger.debug(&format!("Run report:\n{}", json));
        }
        ctx.logger
            .success(&format!("Run completed: {}", report.final_video.display()));
        ctx.logger.flush();
        tracing::info!("Run '{}' completed", ctx.run_name);

        Ok(RunOutcome::Completed(report))
    }

    fn run_step(
        &self,
        step: &dyn PipelineStep,
        ctx: &Context,
        state: &mut RunContext,
    ) -> StageResult<StepOutcome> {
        ctx.logger
            .debug(&format!("Validating input for '{}'", step.name()));
        step.validate_input(ctx, state)?;

        ctx.logger.debug(&format!("Executing '{}'", step.name()));
        let outcome = step.execute(ctx, state)?;

        if outcome == StepOutcome::Completed {
            ctx.logger
                .debug(&format!("Validating output for '{}'", step.name()));
            step.validate_output(ctx, state)?;
        }
        Ok(outcome)
    }

    fn cancelled(&self, ctx: &Context, state: &mut RunContext, stage: Stage) -> RunOutcome {
        ctx.progress.report_cancelled(stage);
        let cleanup = state.finish();
        ctx.logger.flush();
        tracing::info!("Run '{}' cancelled at {}", ctx.run_name, stage);
        RunOutcome::Cancelled { stage, cleanup }
    }

    fn failed(
        &self,
        ctx: &Context,
        state: &mut RunContext,
        stage: Stage,
        error: StageError,
    ) -> PipelineError {
        ctx.logger.error(&format!("{} failed: {}", stage, error));
        ctx.logger.show_tail("collaborator output");
        ctx.progress.report_error(stage, &error.to_string());

        let cleanup = state.finish();
        for (path, reason) in &cleanup.failures {
            ctx.logger
                .warn(&format!("Could not remove {}: {}", path.display(), reason));
        }
        ctx.logger.flush();
        tracing::error!("Run '{}' failed at {}: {}", ctx.run_name, stage, error);

        PipelineError::stage_failed(&ctx.run_name, stage, error)
    }
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("state", &self.state())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// A run in progress on its worker thread.
pub struct RunHandle {
    name: String,
    handle: JoinHandle<PipelineResult<RunOutcome>>,
    cancel: CancelToken,
    state: Arc<Mutex<PipelineState>>,
}

impl RunHandle {
    /// Request cancellation. Returns immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> PipelineState {
        self.state.lock().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to end.
    pub fn join(self) -> PipelineResult<RunOutcome> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(PipelineError::setup(self.name, "pipeline worker panicked")),
        }
    }
}

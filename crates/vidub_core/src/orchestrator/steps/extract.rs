//! Extract Audio step - pulls the speech track out of the source video.

use crate::models::Stage;
use crate::orchestrator::errors::{StageError, StageResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunContext, StepOutcome};

pub struct ExtractAudioStep;

impl ExtractAudioStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExtractAudioStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ExtractAudioStep {
    fn stage(&self) -> Stage {
        Stage::ExtractAudio
    }

    fn validate_input(&self, _ctx: &Context, state: &RunContext) -> StageResult<()> {
        match &state.video {
            Some(video) if video.is_file() => Ok(()),
            Some(video) => Err(StageError::file_not_found(video.display().to_string())),
            None => Err(StageError::invalid_input("no source video")),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut RunContext) -> StageResult<StepOutcome> {
        let video = state
            .video
            .clone()
            .ok_or_else(|| StageError::invalid_input("no source video"))?;
        let output = state
            .artifact_path("_extracted_audio.wav")
            .ok_or_else(|| StageError::other("run folder not created"))?;

        // Registered up front so a half-written file is still removed.
        state.registry.register_disposable(&output);

        let progress = ctx.stage_progress(Stage::ExtractAudio);
        let audio = ctx
            .collaborators
            .extractor
            .extract(&video, &output, &progress)?;
        if audio != output {
            state.registry.register_disposable(&audio);
        }
        ctx.logger.info(&format!("Audio extracted to {}", audio.display()));
        state.extracted_audio = Some(audio);

        if progress.is_cancelled() {
            return Ok(StepOutcome::Interrupted);
        }
        progress.report(100.0);
        Ok(StepOutcome::Completed)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunContext) -> StageResult<()> {
        match &state.extracted_audio {
            Some(audio) if audio.is_file() => Ok(()),
            Some(audio) => Err(StageError::file_not_found(audio.display().to_string())),
            None => Err(StageError::invalid_output("no extracted audio recorded")),
        }
    }
}

//! Finalize step - put the dubbed audio into the video.
//!
//! Writes `<name>_translated.mp4` and, when subtitles are requested,
//! `<name>_with_subs.mp4`. Both stay disposable here; the controller marks
//! them kept only once every stage has completed.

use std::path::PathBuf;

use crate::models::Stage;
use crate::orchestrator::errors::{StageError, StageResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, FinalizeOutput, RunContext, StepOutcome};

pub struct FinalizeStep;

impl FinalizeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FinalizeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for FinalizeStep {
    fn stage(&self) -> Stage {
        Stage::Finalize
    }

    fn validate_input(&self, ctx: &Context, state: &RunContext) -> StageResult<()> {
        if state.video.is_none() {
            return Err(StageError::invalid_input("no source video"));
        }
        match &state.synthesis {
            Some(s) if s.audio_path.is_file() => {}
            Some(s) => return Err(StageError::file_not_found(s.audio_path.display().to_string())),
            None => return Err(StageError::invalid_input("no synthesized audio")),
        }
        if ctx.request.add_subtitles {
            match &state.translation {
                Some(t) if t.subtitle_path.is_file() => {}
                Some(t) => return Err(StageError::file_not_found(t.subtitle_path.display().to_string())),
                None => return Err(StageError::invalid_input("no translated subtitles to burn")),
            }
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunContext) -> StageResult<StepOutcome> {
        let video = state
            .video
            .clone()
            .ok_or_else(|| StageError::invalid_input("no source video"))?;
        let audio = state
            .synthesis
            .as_ref()
            .map(|s| s.audio_path.clone())
            .ok_or_else(|| StageError::invalid_input("no synthesized audio"))?;
        let translated_path = state
            .artifact_path("_translated.mp4")
            .ok_or_else(|| StageError::other("run folder not created"))?;

        let progress = ctx.stage_progress(Stage::Finalize);
        let remuxer = &ctx.collaborators.remuxer;

        ctx.logger.section("Replacing audio");
        state.registry.register_disposable(&translated_path);
        let translated_video = remuxer.replace_audio(&video, &audio, &translated_path, &progress)?;
        if translated_video != translated_path {
            state.registry.register_disposable(&translated_video);
        }
        ctx.logger
            .info(&format!("Dubbed video written to {}", translated_video.display()));

        if progress.is_cancelled() {
            state.finalize = Some(FinalizeOutput {
                translated_video,
                subtitled_video: None,
            });
            return Ok(StepOutcome::Interrupted);
        }

        let mut subtitled_video: Option<PathBuf> = None;
        if ctx.request.add_subtitles {
            progress.report(50.0);
            let subtitles = state
                .translation
                .as_ref()
                .map(|t| t.subtitle_path.clone())
                .ok_or_else(|| StageError::invalid_input("no translated subtitles to burn"))?;
            let subbed_path = state
                .artifact_path("_with_subs.mp4")
                .ok_or_else(|| StageError::other("run folder not created"))?;

            ctx.logger.section("Burning subtitles");
            state.registry.register_disposable(&subbed_path);
            let subbed = remuxer.burn_subtitles(
                &translated_video,
                &subtitles,
                ctx.subtitle_style(),
                &subbed_path,
                &progress,
            )?;
            if subbed != subbed_path {
                state.registry.register_disposable(&subbed);
            }
            ctx.logger
                .info(&format!("Subtitled video written to {}", subbed.display()));
            subtitled_video = Some(subbed);
        }

        state.finalize = Some(FinalizeOutput {
            translated_video,
            subtitled_video,
        });

        if progress.is_cancelled() {
            return Ok(StepOutcome::Interrupted);
        }
        progress.report(100.0);
        Ok(StepOutcome::Completed)
    }

    fn validate_output(&self, ctx: &Context, state: &RunContext) -> StageResult<()> {
        let output = state
            .finalize
            .as_ref()
            .ok_or_else(|| StageError::invalid_output("no final video recorded"))?;
        if !output.translated_video.is_file() {
            return Err(StageError::file_not_found(
                output.translated_video.display().to_string(),
            ));
        }
        match (&output.subtitled_video, ctx.request.add_subtitles) {
            (Some(path), _) if !path.is_file() => {
                Err(StageError::file_not_found(path.display().to_string()))
            }
            (None, true) => Err(StageError::invalid_output("subtitles were requested but not burned")),
            _ => Ok(()),
        }
    }
}

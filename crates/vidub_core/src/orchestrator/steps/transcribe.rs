//! Transcribe step - speech to timed text segments.
//!
//! Segments with unusable timing or no text are dropped with a warning.
//! A transcription with nothing left fails the stage. The surviving
//! segments are also written to `<name>_subtitles.srt`.

use crate::models::{Segment, Stage};
use crate::orchestrator::errors::{StageError, StageResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunContext, StepOutcome, TranscribeOutput};
use crate::subtitles::write_srt_file;

pub struct TranscribeStep;

impl TranscribeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TranscribeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for TranscribeStep {
    fn stage(&self) -> Stage {
        Stage::Transcribe
    }

    fn validate_input(&self, _ctx: &Context, state: &RunContext) -> StageResult<()> {
        match &state.extracted_audio {
            Some(audio) if audio.is_file() => Ok(()),
            Some(audio) => Err(StageError::file_not_found(audio.display().to_string())),
            None => Err(StageError::invalid_input("no extracted audio")),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut RunContext) -> StageResult<StepOutcome> {
        let audio = state
            .extracted_audio
            .clone()
            .ok_or_else(|| StageError::invalid_input("no extracted audio"))?;

        let progress = ctx.stage_progress(Stage::Transcribe);
        let transcription = ctx.collaborators.transcriber.transcribe(&audio, &progress)?;
        let total = transcription.segments.len();

        let segments: Vec<Segment> = transcription
            .segments
            .into_iter()
            .enumerate()
            .filter_map(|(i, segment)| {
                if !segment.is_valid() {
                    ctx.logger.warn(&format!(
                        "Dropping segment {} with invalid timing {:.3}-{:.3}",
                        i, segment.start, segment.end
                    ));
                    None
                } else if segment.is_blank() {
                    ctx.logger.warn(&format!("Dropping empty segment {}", i));
                    None
                } else {
                    Some(segment)
                }
            })
            .collect();

        let subtitle_path = state
            .artifact_path("_subtitles.srt")
            .ok_or_else(|| StageError::other("run folder not created"))?;

        if progress.is_cancelled() {
            ctx.logger
                .info(&format!("Transcription stopped early with {} segment(s)", segments.len()));
            state.transcription = Some(TranscribeOutput {
                language: transcription.language,
                segments,
                subtitle_path,
            });
            return Ok(StepOutcome::Interrupted);
        }

        if segments.is_empty() {
            return Err(StageError::invalid_output(format!(
                "no usable speech segments ({} returned)",
                total
            )));
        }

        state.registry.register_disposable(&subtitle_path);
        write_srt_file(&subtitle_path, &segments)
            .map_err(|e| StageError::io("writing transcription subtitles", e))?;

        ctx.logger.info(&format!(
            "Transcribed {} segment(s), detected language '{}'",
            segments.len(),
            transcription.language
        ));
        state.transcription = Some(TranscribeOutput {
            language: transcription.language,
            segments,
            subtitle_path,
        });

        progress.report(100.0);
        Ok(StepOutcome::Completed)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunContext) -> StageResult<()> {
        match &state.transcription {
            Some(output) if !output.segments.is_empty() => Ok(()),
            Some(_) => Err(StageError::invalid_output("transcription has no segments")),
            None => Err(StageError::invalid_output("no transcription recorded")),
        }
    }
}

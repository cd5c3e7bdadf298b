//! Translate step - segment text into the target language.
//!
//! Segments are translated one by one so cancellation is observed between
//! them. A segment that fails to translate keeps its timing with empty
//! text (a gap in the dub) and is recorded as a segment failure.

use crate::models::{Segment, Stage};
use crate::orchestrator::errors::{SegmentFailure, StageError, StageResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunContext, StepOutcome, TranslateOutput};
use crate::subtitles::write_srt_file;

pub struct TranslateStep;

impl TranslateStep {
    pub fn new() -> Self {
        Self
    }

    /// Source language: the requested one, or the detected one for `auto`.
    fn source_language(ctx: &Context, state: &RunContext) -> String {
        if ctx.request.detect_source_language() {
            state
                .transcription
                .as_ref()
                .map(|t| t.language.clone())
                .filter(|lang| !lang.trim().is_empty())
                .unwrap_or_else(|| "auto".to_string())
        } else {
            ctx.request.from_lang.trim().to_string()
        }
    }
}

impl Default for TranslateStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for TranslateStep {
    fn stage(&self) -> Stage {
        Stage::Translate
    }

    fn validate_input(&self, ctx: &Context, state: &RunContext) -> StageResult<()> {
        if ctx.request.to_lang.trim().is_empty() {
            return Err(StageError::invalid_input("no target language"));
        }
        match &state.transcription {
            Some(t) if !t.segments.is_empty() => Ok(()),
            _ => Err(StageError::invalid_input("no transcribed segments")),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut RunContext) -> StageResult<StepOutcome> {
        let source = state
            .transcription
            .as_ref()
            .map(|t| t.segments.clone())
            .ok_or_else(|| StageError::invalid_input("no transcribed segments"))?;
        let from = Self::source_language(ctx, state);
        let to = ctx.request.to_lang.trim().to_string();
        let subtitle_path = state
            .artifact_path(&format!("_subtitles_{}.srt", to))
            .ok_or_else(|| StageError::other("run folder not created"))?;

        let progress = ctx.stage_progress(Stage::Translate);
        let translator = &ctx.collaborators.translator;
        let same_language = from.eq_ignore_ascii_case(&to);

        if same_language {
            ctx.logger
                .info(&format!("Source and target language are both '{}', keeping text", to));
        } else {
            ctx.logger.info(&format!("Preparing translation {} -> {}", from, to));
            translator.prepare(&from, &to)?;
        }

        let total = source.len();
        let mut translated: Vec<Segment> = Vec::with_capacity(total);
        let mut interrupted = false;

        for (index, segment) in source.iter().enumerate() {
            if progress.is_cancelled() {
                interrupted = true;
                break;
            }

            let text = if same_language || segment.is_blank() {
                segment.text.clone()
            } else {
                match translator.translate_text(&segment.text, &from, &to) {
                    Ok(text) => text,
                    Err(e) => {
                        state.record_failure(SegmentFailure::new(
                            Stage::Translate,
                            index,
                            e.to_string(),
                        ));
                        ctx.logger
                            .warn(&format!("Segment {} not translated, leaving a gap: {}", index, e));
                        String::new()
                    }
                }
            };
            translated.push(Segment::new(segment.start, segment.end, text));
            progress.report_items(index + 1, total);
        }

        if interrupted {
            ctx.logger.info(&format!(
                "Translation stopped after {} of {} segment(s)",
                translated.len(),
                total
            ));
            state.translation = Some(TranslateOutput {
                from_lang: from,
                to_lang: to,
                segments: translated,
                subtitle_path,
            });
            return Ok(StepOutcome::Interrupted);
        }

        state.registry.register_disposable(&subtitle_path);
        write_srt_file(&subtitle_path, &translated)
            .map_err(|e| StageError::io("writing translated subtitles", e))?;

        state.translation = Some(TranslateOutput {
            from_lang: from,
            to_lang: to,
            segments: translated,
            subtitle_path,
        });

        progress.report(100.0);
        Ok(StepOutcome::Completed)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunContext) -> StageResult<()> {
        let expected = state.transcription.as_ref().map_or(0, |t| t.segments.len());
        match &state.translation {
            Some(t) if t.segments.len() == expected => Ok(()),
            Some(t) => Err(StageError::invalid_output(format!(
                "{} translated segment(s) for {} source segment(s)",
                t.segments.len(),
                expected
            ))),
            None => Err(StageError::invalid_output("no translation recorded")),
        }
    }
}

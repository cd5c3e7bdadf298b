//! Synthesize step - speech for every translated segment, laid on one track.
//!
//! Segments are spoken in parallel on a bounded rayon pool. Results are
//! put back in segment order before the timeline is assembled, so
//! completion order never affects placement. A segment whose synthesis
//! fails is skipped and recorded; the stage only fails when no segment
//! produced audio.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::models::Stage;
use crate::orchestrator::errors::{SegmentFailure, StageError, StageResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunContext, StepOutcome, SynthesizeOutput};
use crate::timeline::{write_wav, AudioClip, AudioTimelineAssembler, TimelineClip};

/// Result of one segment's synthesis.
enum SpeechResult {
    Clip(AudioClip),
    Failed(String),
    /// Not attempted because the run was cancelled.
    Skipped,
}

pub struct SynthesizeStep;

impl SynthesizeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SynthesizeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SynthesizeStep {
    fn stage(&self) -> Stage {
        Stage::Synthesize
    }

    fn validate_input(&self, _ctx: &Context, state: &RunContext) -> StageResult<()> {
        match &state.translation {
            Some(t) if !t.segments.is_empty() => Ok(()),
            _ => Err(StageError::invalid_input("no translated segments")),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut RunContext) -> StageResult<StepOutcome> {
        let translation = state
            .translation
            .clone()
            .ok_or_else(|| StageError::invalid_input("no translated segments"))?;
        let voice = ctx.settings.voices.voice_for(&translation.to_lang).to_string();
        let format = ctx.settings.audio_format();

        // (segment index, text) for every segment with something to say.
        let jobs: Vec<(usize, &str)> = translation
            .segments
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_blank())
            .map(|(i, s)| (i, s.text.as_str()))
            .collect();
        if jobs.is_empty() {
            return Err(StageError::invalid_input("every translated segment is empty"));
        }

        let workers = ctx.settings.pipeline.synthesis_workers.max(1);
        ctx.logger.info(&format!(
            "Synthesizing {} segment(s) with voice {} on {} worker(s)",
            jobs.len(),
            voice,
            workers
        ));

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("vidub-tts-{}", i))
            .build()
            .map_err(|e| StageError::other(format!("failed to start synthesis pool: {}", e)))?;

        let progress = ctx.stage_progress(Stage::Synthesize);
        let synthesizer = &ctx.collaborators.synthesizer;
        let done = AtomicUsize::new(0);
        let total = jobs.len();

        let results: Vec<(usize, SpeechResult)> = pool.install(|| {
            jobs.par_iter()
                .map(|&(index, text)| {
                    if progress.is_cancelled() {
                        return (index, SpeechResult::Skipped);
                    }
                    let result = match synthesizer.synthesize(text, &voice) {
                        Ok(clip) => SpeechResult::Clip(clip),
                        Err(e) => SpeechResult::Failed(e.to_string()),
                    };
                    let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                    progress.report_items(finished, total);
                    (index, result)
                })
                .collect()
        });

        if progress.is_cancelled() {
            ctx.logger.info(&format!(
                "Synthesis stopped after {} of {} segment(s)",
                done.load(Ordering::SeqCst),
                total
            ));
            return Ok(StepOutcome::Interrupted);
        }

        // `collect` on an indexed parallel iterator keeps input order.
        let mut clips = Vec::with_capacity(results.len());
        let mut clip_segments = Vec::with_capacity(results.len());
        for (index, result) in results {
            let start_ms = translation.segments[index].start_ms();
            match result {
                SpeechResult::Clip(clip) => clips.push(TimelineClip::new(start_ms, clip)),
                SpeechResult::Failed(message) => {
                    ctx.logger
                        .warn(&format!("Segment {} not synthesized, skipping: {}", index, message));
                    state.record_failure(SegmentFailure::new(Stage::Synthesize, index, message));
                    clips.push(TimelineClip::missing(start_ms));
                }
                SpeechResult::Skipped => clips.push(TimelineClip::missing(start_ms)),
            }
            clip_segments.push(index);
        }

        let track = AudioTimelineAssembler::new(format).assemble(&clips);
        for skipped in &track.skipped {
            let index = clip_segments[skipped.index];
            if clips[skipped.index].clip.is_some() {
                state.record_failure(SegmentFailure::new(
                    Stage::Synthesize,
                    index,
                    skipped.reason.clone(),
                ));
            }
        }

        if track.placements.is_empty() {
            return Err(StageError::other("no segment could be synthesized"));
        }

        let audio_path = state
            .artifact_path("_translated_audio.wav")
            .ok_or_else(|| StageError::other("run folder not created"))?;
        state.registry.register_disposable(&audio_path);
        write_wav(&audio_path, &track.audio).map_err(|e| StageError::other(e.to_string()))?;

        ctx.logger.info(&format!(
            "Assembled {} clip(s) into {:.1}s of audio",
            track.placements.len(),
            track.duration_ms as f64 / 1000.0
        ));
        state.synthesis = Some(SynthesizeOutput {
            audio_path,
            duration_ms: track.duration_ms,
            voice,
            clips_placed: track.placements.len(),
        });

        progress.report(100.0);
        Ok(StepOutcome::Completed)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunContext) -> StageResult<()> {
        match &state.synthesis {
            Some(output) if output.audio_path.is_file() => Ok(()),
            Some(output) => Err(StageError::file_not_found(output.audio_path.display().to_string())),
            None => Err(StageError::invalid_output("no synthesized audio recorded")),
        }
    }
}

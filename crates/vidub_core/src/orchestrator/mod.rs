//! Pipeline orchestrator for dubbing one video.
//!
//! A [`PipelineController`] runs the six stages in order on one
//! [`RunContext`], reporting weighted progress, observing cancellation
//! between and inside stages, and cleaning the run folder on every exit.
//!
//! # Architecture
//!
//! ```text
//! PipelineController
//!     ├── Step: Download
//!     ├── Step: Extract Audio
//!     ├── Step: Transcribe
//!     ├── Step: Translate
//!     ├── Step: Synthesize
//!     └── Step: Finalize
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vidub_core::orchestrator::PipelineController;
//!
//! let controller = PipelineController::new(collaborators, settings);
//! let handle = controller.spawn(request, Some(observer))?;
//! // ... later, from the UI thread
//! handle.cancel();
//! let outcome = handle.join()?;
//! ```

mod controller;
mod errors;
mod step;
pub mod steps;
mod types;

pub use controller::{PipelineController, PipelineState, RunHandle};
pub use errors::{PipelineError, PipelineResult, SegmentFailure, StageError, StageResult};
pub use step::PipelineStep;
pub use steps::{
    DownloadStep, ExtractAudioStep, FinalizeStep, SynthesizeStep, TranscribeStep, TranslateStep,
};
pub use types::{
    CancelToken, Context, FinalizeOutput, RunContext, RunOutcome, RunReport, StageProgress,
    StepOutcome, SynthesizeOutput, TranscribeOutput, TranslateOutput,
};

/// The six steps in stage order.
pub fn standard_steps() -> Vec<Box<dyn PipelineStep>> {
    vec![
        Box::new(DownloadStep::new()),
        Box::new(ExtractAudioStep::new()),
        Box::new(TranscribeStep::new()),
        Box::new(TranslateStep::new()),
        Box::new(SynthesizeStep::new()),
        Box::new(FinalizeStep::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;

    #[test]
    fn standard_steps_follow_stage_order() {
        let stages: Vec<Stage> = standard_steps().iter().map(|s| s.stage()).collect();
        assert_eq!(stages, Stage::ALL.to_vec());
    }
}

//! Pipeline step trait definition.

use crate::models::Stage;

use super::errors::StageResult;
use super::types::{Context, RunContext, StepOutcome};

/// One stage of the pipeline.
///
/// The controller calls these methods in order:
///
/// 1. `validate_input` - Check that earlier stages left what this one needs
/// 2. `execute` - Perform the stage's work
/// 3. `validate_output` - Verify the stage recorded its output
///
/// `validate_output` is skipped when `execute` returns
/// [`StepOutcome::Interrupted`].
pub trait PipelineStep: Send + Sync {
    /// The stage this step implements.
    fn stage(&self) -> Stage;

    /// Step name for logging and error context.
    fn name(&self) -> &str {
        self.stage().name()
    }

    fn validate_input(&self, ctx: &Context, state: &RunContext) -> StageResult<()>;

    /// Do the work and record results in `state`.
    ///
    /// Should poll `ctx.cancel` at each natural iteration point and return
    /// `StepOutcome::Interrupted` (keeping any partial results) once it is
    /// set.
    fn execute(&self, ctx: &Context, state: &mut RunContext) -> StageResult<StepOutcome>;

    fn validate_output(&self, ctx: &Context, state: &RunContext) -> StageResult<()>;
}

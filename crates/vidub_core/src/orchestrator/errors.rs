//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Stage → Collaborator → Detail

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::models::Stage;

/// What `run()` returns when a run does not complete.
///
/// Cancellation is not an error; it is reported as
/// [`RunOutcome::Cancelled`](super::RunOutcome::Cancelled).
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input was rejected before any stage ran.
    #[error("Invalid input: {message}")]
    Input { message: String },

    /// A required resource (disk space, external tool) is missing.
    #[error("Resource check failed: {message}")]
    Resource { message: String },

    /// A stage failed; the run was aborted and cleaned up.
    #[error("Run '{run_name}' failed at stage '{stage}': {source}")]
    StageFailed {
        run_name: String,
        stage: Stage,
        #[source]
        source: StageError,
    },

    /// Failed to set up the run (log file, configuration).
    #[error("Run '{run_name}' setup failed: {message}")]
    Setup { run_name: String, message: String },

    /// The controller has already been used for a run.
    #[error("This pipeline controller has already run")]
    AlreadyStarted,
}

impl PipelineError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource {
            message: message.into(),
        }
    }

    pub fn stage_failed(run_name: impl Into<String>, stage: Stage, source: StageError) -> Self {
        Self::StageFailed {
            run_name: run_name.into(),
            stage,
            source,
        }
    }

    pub fn setup(run_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Setup {
            run_name: run_name.into(),
            message: message.into(),
        }
    }

    /// The stage the run failed in, if it got that far.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Error from a stage or the collaborator it called.
#[derive(Error, Debug)]
pub enum StageError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// An external command failed.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A required file was not found.
    #[error("Required file not found: {path}")]
    FileNotFound { path: String },

    /// A collaborator (downloader, transcriber, ...) reported an error.
    #[error("{0}")]
    Collaborator(String),

    /// Generic stage error with message.
    #[error("{0}")]
    Other(String),
}

impl StageError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn command_failed(tool: impl Into<String>, exit_code: i32, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// A per-segment failure that was recovered inside a stage.
///
/// The segment is dropped (synthesis) or left as a gap (translation) and
/// the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentFailure {
    pub stage: Stage,
    /// Index into the segment list.
    pub index: usize,
    pub message: String,
}

impl SegmentFailure {
    pub fn new(stage: Stage, index: usize, message: impl Into<String>) -> Self {
        Self {
            stage,
            index,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SegmentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} segment {}: {}", self.stage, self.index, self.message)
    }
}

/// Result type for stage and collaborator operations.
pub type StageResult<T> = Result<T, StageError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_displays_context() {
        let err = StageError::command_failed("ffmpeg", 1, "Invalid data found");
        let msg = err.to_string();
        assert!(msg.contains("ffmpeg"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("Invalid data found"));
    }

    #[test]
    fn pipeline_error_chains_context() {
        let stage_err = StageError::file_not_found("/tmp/x_extracted_audio.wav");
        let err = PipelineError::stage_failed("my_talk", Stage::ExtractAudio, stage_err);

        let msg = err.to_string();
        assert!(msg.contains("my_talk"));
        assert!(msg.contains("Extract Audio"));
        assert_eq!(err.stage(), Some(Stage::ExtractAudio));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn segment_failure_display() {
        let failure = SegmentFailure::new(Stage::Synthesize, 3, "tts timeout");
        assert_eq!(failure.to_string(), "Synthesize segment 3: tts timeout");
    }
}

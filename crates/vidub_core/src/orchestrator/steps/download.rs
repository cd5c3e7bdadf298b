//! Download step - obtains the source video and creates the run folder.
//!
//! URL input is fetched by the downloader into the output directory, then
//! moved into a fresh run folder named after the downloaded file and kept.
//! Local input is used in place; the run folder is created next to it (or
//! in the requested output directory) and the file is never touched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::{InputSource, Stage};
use crate::orchestrator::errors::{StageError, StageResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunContext, StepOutcome};

pub struct DownloadStep;

impl DownloadStep {
    pub fn new() -> Self {
        Self
    }

    fn download_remote(&self, ctx: &Context, state: &mut RunContext, url: &str) -> StageResult<StepOutcome> {
        let parent = ctx.output_parent().unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)
            .map_err(|e| StageError::io(format!("creating {}", parent.display()), e))?;

        ctx.logger.info(&format!("Downloading {} ({})", url, ctx.request.quality));
        let progress = ctx.stage_progress(Stage::Download);
        let downloaded = ctx
            .collaborators
            .downloader
            .download(url, &parent, ctx.request.quality, &progress)?;

        if !downloaded.is_file() {
            return Err(StageError::file_not_found(downloaded.display().to_string()));
        }
        let cancelled = progress.is_cancelled();

        let folder = state
            .ensure_run_folder(&parent, &downloaded)
            .map_err(|e| StageError::io("creating run folder", e))?;
        let file_name = downloaded
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| StageError::invalid_output("downloaded path has no file name"))?;
        let video = folder.join(file_name);

        // A download finished after cancel goes with the rest of the run.
        if cancelled {
            state.registry.register_disposable(&downloaded);
            state.registry.register_disposable(&video);
            move_file(&downloaded, &video)
                .map_err(|e| StageError::io(format!("moving download into {}", folder.display()), e))?;
            state.video = Some(video);
            return Ok(StepOutcome::Interrupted);
        }

        move_file(&downloaded, &video)
            .map_err(|e| StageError::io(format!("moving download into {}", folder.display()), e))?;
        state.registry.mark_keep(&video);
        ctx.logger.info(&format!("Video saved to {}", video.display()));
        state.video = Some(video);

        progress.report(100.0);
        Ok(StepOutcome::Completed)
    }

    fn use_local(&self, ctx: &Context, state: &mut RunContext, path: &Path) -> StageResult<StepOutcome> {
        let parent = ctx.output_parent().unwrap_or_else(|| match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        });

        let folder = state
            .ensure_run_folder(&parent, path)
            .map_err(|e| StageError::io("creating run folder", e))?;
        ctx.logger
            .info(&format!("Using local file {} (run folder {})", path.display(), folder.display()));
        state.video = Some(path.to_path_buf());

        ctx.stage_progress(Stage::Download).report(100.0);
        Ok(StepOutcome::Completed)
    }
}

impl Default for DownloadStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for DownloadStep {
    fn stage(&self) -> Stage {
        Stage::Download
    }

    fn validate_input(&self, ctx: &Context, _state: &RunContext) -> StageResult<()> {
        ctx.request.input.validate().map_err(StageError::invalid_input)
    }

    fn execute(&self, ctx: &Context, state: &mut RunContext) -> StageResult<StepOutcome> {
        match &ctx.request.input {
            InputSource::Url(url) => self.download_remote(ctx, state, url.trim()),
            InputSource::LocalFile(path) => self.use_local(ctx, state, path),
        }
    }

    fn validate_output(&self, _ctx: &Context, state: &RunContext) -> StageResult<()> {
        match &state.video {
            Some(video) if video.is_file() => Ok(()),
            Some(video) => Err(StageError::file_not_found(video.display().to_string())),
            None => Err(StageError::invalid_output("no video recorded")),
        }
    }
}

/// Rename, falling back to copy + delete across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if from == to {
        return Ok(());
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

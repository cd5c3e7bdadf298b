//! Temporary artifact tracking for a single run.
//!
//! Every stage writes its intermediate files into the run folder. The
//! [`TempArtifactRegistry`] records which of them are disposable and which
//! must be kept, and removes the rest once the run ends, whether it
//! succeeded, failed or was cancelled.
//!
//! Cleanup runs in two passes:
//!
//! 1. Known intermediate names at the top of the run folder
//!    (`*_extracted_audio.*`, `*_subtitles.srt`, `*_subtitles_*.srt`,
//!    `*_translated_audio.*`).
//! 2. A bottom-up walk that deletes registered files, files matching the
//!    disposable regexes or carrying a `temp`/`tmp` marker, and then any
//!    folder left empty.

mod patterns;
mod registry;

pub use patterns::{
    compile_pattern, has_temp_marker, sanitize_folder_name, DISPOSABLE_GLOBS, DISPOSABLE_PATTERNS,
};
pub use registry::{CleanupReport, TempArtifactRegistry};

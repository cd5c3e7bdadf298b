//! Per-run artifact tracking and cleanup.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use super::patterns::{
    compile_pattern, glob_to_regex, has_temp_marker, sanitize_folder_name, DISPOSABLE_GLOBS,
    DISPOSABLE_PATTERNS,
};

/// What one cleanup pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted_files: Vec<PathBuf>,
    pub deleted_dirs: Vec<PathBuf>,
    /// Paths that could not be removed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    /// Whether the pass removed anything.
    pub fn is_empty(&self) -> bool {
        self.deleted_files.is_empty() && self.deleted_dirs.is_empty() && self.failures.is_empty()
    }

    fn record_failure(&mut self, path: &Path, err: &io::Error) {
        tracing::warn!("Cleanup could not remove {}: {}", path.display(), err);
        self.failures.push((path.to_path_buf(), err.to_string()));
    }
}

/// Tracks the files a run produces and removes the disposable ones.
///
/// A file survives cleanup when it is marked keep. Otherwise it is
/// deleted if it was registered disposable, matches one of the
/// disposable patterns, or its name contains `temp`/`tmp`. Files that are
/// neither registered nor matched are left alone.
#[derive(Debug)]
pub struct TempArtifactRegistry {
    run_folder: Option<PathBuf>,
    created_folders: Vec<PathBuf>,
    keep: HashSet<PathBuf>,
    disposable: HashSet<PathBuf>,
    globs: Vec<Regex>,
    patterns: Vec<Regex>,
}

impl TempArtifactRegistry {
    /// Registry with the built-in disposable patterns.
    pub fn new() -> Self {
        let globs = DISPOSABLE_GLOBS
            .iter()
            .filter_map(|g| match glob_to_regex(g) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("Ignoring glob '{}': {}", g, e);
                    None
                }
            })
            .collect();
        let patterns = DISPOSABLE_PATTERNS
            .iter()
            .filter_map(|p| match compile_pattern(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("Ignoring pattern '{}': {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            run_folder: None,
            created_folders: Vec::new(),
            keep: HashSet::new(),
            disposable: HashSet::new(),
            globs,
            patterns,
        }
    }

    /// Add a disposable-name pattern (full match on the base name).
    pub fn register_pattern(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.patterns.push(compile_pattern(pattern)?);
        Ok(())
    }

    /// Mark a path for deletion at cleanup. Kept paths stay kept.
    pub fn register_disposable(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.keep.contains(&path) {
            self.disposable.insert(path);
        }
    }

    /// Protect a path from cleanup, overriding any disposable status.
    pub fn mark_keep(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.disposable.remove(&path);
        self.keep.insert(path);
    }

    pub fn is_kept(&self, path: &Path) -> bool {
        self.keep.contains(path)
    }

    pub fn is_disposable(&self, path: &Path) -> bool {
        self.disposable.contains(path)
    }

    /// The working folder of the current run, once created.
    pub fn run_folder(&self) -> Option<&Path> {
        self.run_folder.as_deref()
    }

    /// Every folder created through this registry.
    pub fn created_folders(&self) -> &[PathBuf] {
        &self.created_folders
    }

    /// Create a unique run folder next to `base_path`.
    pub fn create_output_folder(&mut self, base_path: &Path) -> io::Result<PathBuf> {
        let parent = match base_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        self.create_output_folder_in(&parent, base_path)
    }

    /// Create a unique run folder inside `parent`, named after `base_path`.
    ///
    /// The folder name is the sanitized file stem. When it is taken, `_1`,
    /// `_2`, ... are appended until `create_dir` succeeds, so two runs can
    /// never end up sharing a folder.
    pub fn create_output_folder_in(&mut self, parent: &Path, base_path: &Path) -> io::Result<PathBuf> {
        let stem = base_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = sanitize_folder_name(&stem);

        fs::create_dir_all(parent)?;

        let mut counter = 0u32;
        loop {
            let candidate = if counter == 0 {
                parent.join(&name)
            } else {
                parent.join(format!("{}_{}", name, counter))
            };
            match fs::create_dir(&candidate) {
                Ok(()) => {
                    tracing::debug!("Created run folder {}", candidate.display());
                    self.created_folders.push(candidate.clone());
                    self.run_folder = Some(candidate.clone());
                    return Ok(candidate);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(e),
            }
        }
    }

    /// Whether a file should be removed by the pattern walk.
    fn should_delete(&self, path: &Path) -> bool {
        if self.keep.contains(path) {
            return false;
        }
        if self.disposable.contains(path) {
            return true;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };
        self.patterns.iter().any(|re| re.is_match(&name)) || has_temp_marker(&name)
    }

    /// Remove every disposable artifact of the run.
    ///
    /// Never fails: each deletion error is logged and recorded in the
    /// report, and the pass carries on. Safe to call repeatedly.
    pub fn cleanup(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        if let Some(root) = self.run_folder.clone() {
            if root.is_dir() {
                self.remove_glob_matches(&root, &mut report);
                self.walk_and_remove(&root, &mut report);
            }
        }

        let leftovers: Vec<PathBuf> = self
            .disposable
            .iter()
            .filter(|p| !self.keep.contains(*p) && p.is_file())
            .cloned()
            .collect();
        for path in leftovers {
            match fs::remove_file(&path) {
                Ok(()) => report.deleted_files.push(path),
                Err(e) => report.record_failure(&path, &e),
            }
        }

        if !report.is_empty() {
            tracing::info!(
                "Cleanup removed {} file(s) and {} folder(s), {} failure(s)",
                report.deleted_files.len(),
                report.deleted_dirs.len(),
                report.failures.len()
            );
        }
        report
    }

    fn remove_glob_matches(&self, root: &Path, report: &mut CleanupReport) {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                report.record_failure(root, &e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || self.keep.contains(&path) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if self.globs.iter().any(|re| re.is_match(&name)) {
                match fs::remove_file(&path) {
                    Ok(()) => report.deleted_files.push(path),
                    Err(e) => report.record_failure(&path, &e),
                }
            }
        }
    }

    fn walk_and_remove(&self, root: &Path, report: &mut CleanupReport) {
        for entry in WalkDir::new(root).contents_first(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    tracing::warn!("Cleanup walk error at {}: {}", path.display(), e);
                    report.failures.push((path, e.to_string()));
                    continue;
                }
            };
            let path = entry.path();

            if entry.file_type().is_dir() {
                let empty = fs::read_dir(path)
                    .map(|mut it| it.next().is_none())
                    .unwrap_or(false);
                if empty {
                    match fs::remove_dir(path) {
                        Ok(()) => report.deleted_dirs.push(path.to_path_buf()),
                        Err(e) => report.record_failure(path, &e),
                    }
                }
            } else if self.should_delete(path) {
                match fs::remove_file(path) {
                    Ok(()) => report.deleted_files.push(path.to_path_buf()),
                    Err(e) => report.record_failure(path, &e),
                }
            }
        }
    }
}

impl Default for TempArtifactRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn folder_names_get_numeric_suffix() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("My Video.mp4");
        let mut registry = TempArtifactRegistry::new();

        let first = registry.create_output_folder(&base).unwrap();
        let second = registry.create_output_folder(&base).unwrap();

        assert_eq!(first, dir.path().join("My Video"));
        assert_eq!(second, dir.path().join("My Video_1"));
        assert!(first.is_dir() && second.is_dir());
        assert_eq!(registry.run_folder(), Some(second.as_path()));
        assert_eq!(registry.created_folders().len(), 2);
    }

    #[test]
    fn cleanup_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut registry = TempArtifactRegistry::new();
        let run = registry
            .create_output_folder(&dir.path().join("video.mp4"))
            .unwrap();

        let audio = run.join("video_extracted_audio.wav");
        let output = run.join("video_translated.mp4");
        touch(&audio);
        touch(&output);
        registry.register_disposable(&audio);
        registry.mark_keep(&output);

        let first = registry.cleanup();
        assert_eq!(first.deleted_files, vec![audio.clone()]);
        assert!(first.failures.is_empty());
        assert!(!audio.exists());
        assert!(output.exists());

        let second = registry.cleanup();
        assert!(second.is_empty());
        assert!(output.exists());
    }

    #[test]
    fn unmatched_unregistered_files_survive() {
        let dir = tempdir().unwrap();
        let mut registry = TempArtifactRegistry::new();
        let run = registry
            .create_output_folder(&dir.path().join("talk.mp4"))
            .unwrap();

        let notes = run.join("notes.txt");
        let subs = run.join("talk_subtitles_pl.srt");
        let scratch = run.join("nested").join("segment_TMP_3.wav");
        fs::create_dir_all(scratch.parent().unwrap()).unwrap();
        touch(&notes);
        touch(&subs);
        touch(&scratch);

        let report = registry.cleanup();

        assert!(notes.exists());
        assert!(!subs.exists());
        assert!(!scratch.exists());
        assert!(!run.join("nested").exists());
        assert!(report.deleted_dirs.contains(&run.join("nested")));
    }

    #[test]
    fn keep_overrides_disposable() {
        let dir = tempdir().unwrap();
        let mut registry = TempArtifactRegistry::new();
        let run = registry
            .create_output_folder(&dir.path().join("clip.mp4"))
            .unwrap();

        let audio = run.join("clip_translated_audio.wav");
        touch(&audio);
        registry.register_disposable(&audio);
        registry.mark_keep(&audio);
        registry.register_disposable(&audio);

        assert!(registry.is_kept(&audio));
        assert!(!registry.is_disposable(&audio));
        registry.cleanup();
        assert!(audio.exists());
    }

    #[test]
    fn registered_paths_are_removed_without_pattern() {
        let dir = tempdir().unwrap();
        let mut registry = TempArtifactRegistry::new();
        let run = registry
            .create_output_folder(&dir.path().join("clip.mp4"))
            .unwrap();

        let odd = run.join("clip_translated.mp4");
        let outside = dir.path().join("scratch.bin");
        touch(&odd);
        touch(&outside);
        registry.register_disposable(&odd);
        registry.register_disposable(&outside);

        let report = registry.cleanup();

        assert!(!odd.exists());
        assert!(!outside.exists());
        assert!(!run.exists());
        assert_eq!(report.deleted_dirs, vec![run]);
    }

    #[test]
    fn extra_patterns_apply() {
        let dir = tempdir().unwrap();
        let mut registry = TempArtifactRegistry::new();
        registry.register_pattern(r".*\.part").unwrap();
        assert!(registry.register_pattern("(").is_err());

        let run = registry
            .create_output_folder(&dir.path().join("clip.mp4"))
            .unwrap();
        let partial = run.join("clip.mp4.part");
        touch(&partial);

        registry.cleanup();
        assert!(!partial.exists());
    }

    #[cfg(unix)]
    #[test]
    fn failed_deletion_is_reported_and_the_rest_still_goes() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let mut registry = TempArtifactRegistry::new();
        let run = registry
            .create_output_folder(&dir.path().join("clip.mp4"))
            .unwrap();

        let locked = run.join("locked");
        fs::create_dir(&locked).unwrap();
        let stuck = locked.join("clip_extracted_audio.wav");
        let loose = run.join("clip_translated_audio.wav");
        touch(&stuck);
        touch(&loose);
        registry.register_disposable(&stuck);
        registry.register_disposable(&loose);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not bind a privileged user.
        let write_check = locked.join("write_check");
        if fs::write(&write_check, b"x").is_ok() {
            fs::remove_file(&write_check).unwrap();
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let report = registry.cleanup();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(report.failures.iter().any(|(path, _)| path == &stuck));
        assert!(stuck.exists());
        assert!(report.deleted_files.contains(&loose));
        assert!(!loose.exists());
        assert!(run.exists());
    }

    #[test]
    fn cleanup_without_folder_is_noop() {
        let mut registry = TempArtifactRegistry::new();
        assert!(registry.cleanup().is_empty());
    }
}

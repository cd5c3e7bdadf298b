//! Resource checks that run before the first stage.

use std::path::{Path, PathBuf};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Fail when the filesystem holding `path` has less than `min_gb` free.
///
/// `path` may not exist yet; its nearest existing ancestor is checked.
/// If the query itself fails, a warning is logged and the check passes.
pub fn check_free_space(path: &Path, min_gb: f64) -> Result<(), String> {
    if min_gb <= 0.0 {
        return Ok(());
    }

    let anchor = existing_ancestor(path);
    match available_bytes(&anchor) {
        Some(bytes) => {
            let free_gb = bytes as f64 / BYTES_PER_GB;
            tracing::debug!("{:.2} GB free at {}", free_gb, anchor.display());
            if free_gb < min_gb {
                Err(format!(
                    "Insufficient disk space at {}: {:.2} GB free, {:.2} GB required",
                    anchor.display(),
                    free_gb,
                    min_gb
                ))
            } else {
                Ok(())
            }
        }
        None => {
            tracing::warn!("Could not determine free space at {}", anchor.display());
            Ok(())
        }
    }
}

/// Fail when any tool is not found on `PATH`.
pub fn check_tools(tools: &[String]) -> Result<(), String> {
    let missing: Vec<&str> = tools
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| which::which(t).is_err())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("Required tool(s) not found on PATH: {}", missing.join(", ")))
    }
}

fn existing_ancestor(path: &Path) -> PathBuf {
    let mut current = Some(path);
    while let Some(p) = current {
        if p.exists() {
            return p.to_path_buf();
        }
        current = p.parent().filter(|parent| !parent.as_os_str().is_empty());
    }
    PathBuf::from(".")
}

#[cfg(unix)]
fn available_bytes(path: &Path) -> Option<u64> {
    match nix::sys::statvfs::statvfs(path) {
        Ok(stat) => Some(stat.blocks_available() as u64 * stat.fragment_size() as u64),
        Err(e) => {
            tracing::debug!("statvfs({}) failed: {}", path.display(), e);
            None
        }
    }
}

#[cfg(not(unix))]
fn available_bytes(_path: &Path) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn zero_requirement_always_passes() {
        let dir = tempdir().unwrap();
        assert!(check_free_space(dir.path(), 0.0).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn absurd_requirement_fails() {
        let dir = tempdir().unwrap();
        let err = check_free_space(&dir.path().join("not/yet/created"), 1.0e12).unwrap_err();
        assert!(err.contains("Insufficient disk space"));
    }

    #[test]
    fn missing_tool_is_reported() {
        let err = check_tools(&["definitely-not-a-real-tool-xyz".to_string()]).unwrap_err();
        assert!(err.contains("definitely-not-a-real-tool-xyz"));
        assert!(check_tools(&[]).is_ok());
        assert!(check_tools(&["  ".to_string()]).is_ok());
    }

    #[test]
    fn ancestor_lookup_stops_at_existing_dir() {
        let dir = tempdir().unwrap();
        let deep = dir.path().join("a").join("b");
        assert_eq!(existing_ancestor(&deep), dir.path());
    }
}

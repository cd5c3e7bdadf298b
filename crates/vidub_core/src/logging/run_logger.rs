//! Per-run logger with file and callback output.
//!
//! Each run gets its own logger that:
//! - Writes to a dedicated log file
//! - Sends formatted lines to a callback (if provided)
//! - Supports compact mode with progress filtering
//! - Maintains a tail buffer of collaborator output for failure reports

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LineCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-run logger with dual output (file + callback).
pub struct RunLogger {
    run_name: String,
    log_path: Option<PathBuf>,
    file_writer: Mutex<Option<BufWriter<File>>>,
    line_callback: Mutex<Option<LineCallback>>,
    config: LogConfig,
    tail_buffer: Mutex<VecDeque<String>>,
    /// Last progress value logged (for compact mode filtering).
    last_progress: Mutex<u32>,
}

impl RunLogger {
    /// Create a logger writing to `<log_dir>/<run_name>.log`.
    pub fn new(
        run_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        line_callback: Option<LineCallback>,
    ) -> io::Result<Self> {
        let run_name = run_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&run_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            run_name,
            log_path: Some(log_path),
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            line_callback: Mutex::new(line_callback),
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(64)),
            last_progress: Mutex::new(0),
        })
    }

    /// A logger with no file, only the callback (if any).
    pub fn detached(run_name: impl Into<String>, config: LogConfig, line_callback: Option<LineCallback>) -> Self {
        Self {
            run_name: run_name.into(),
            log_path: None,
            file_writer: Mutex::new(None),
            line_callback: Mutex::new(line_callback),
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(64)),
            last_progress: Mutex::new(0),
        }
    }

    /// Path of the log file, unless the logger is detached.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log a stage marker.
    pub fn stage(&self, stage_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Stage.format(stage_name));
    }

    pub fn section(&self, section_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Section.format(section_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log overall progress (filtered in compact mode).
    ///
    /// Returns true if the progress was logged, false if filtered.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);

            let current_step = (percent / step) * step;
            let last_step = (*last / step) * step;

            if current_step <= last_step && percent < 100 {
                return false;
            }
            if percent >= 100 && *last >= 100 {
                return false;
            }
            *last = percent;
        }

        self.log(LogLevel::Info, &format!("Progress: {}%", percent));
        true
    }

    /// Record a line of collaborator output.
    ///
    /// Always kept in the tail buffer; only written out in verbose mode.
    pub fn output_line(&self, line: &str) {
        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail == 0 {
                buffer.clear();
            } else {
                while buffer.len() >= self.config.error_tail {
                    buffer.pop_front();
                }
                buffer.push_back(line.to_string());
            }
        }

        if self.config.compact {
            return;
        }
        self.output(&self.format_message(line));
    }

    /// Write the tail buffer out (typically after a failure).
    pub fn show_tail(&self, header: &str) {
        let lines = self.get_tail();
        if lines.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in &lines {
            self.output(&self.format_message(line));
        }
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Flush and close the log file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = *self.line_callback.lock() {
            callback(formatted);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RunLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLogger")
            .field("run_name", &self.run_name)
            .field("log_path", &self.log_path)
            .finish()
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Delete all but the newest `keep` `*.log` files in `log_dir`.
///
/// Returns the removed paths. A missing directory is not an error.
pub fn prune_old_logs(log_dir: &Path, keep: usize) -> io::Result<Vec<PathBuf>> {
    if !log_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            logs.push((modified, path));
        }
    }

    // Newest first; ties broken by name so the order is stable.
    logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    let mut removed = Vec::new();
    for (_, path) in logs.into_iter().skip(keep) {
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) => tracing::warn!("Could not remove old log {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("test_run", dir.path(), LogConfig::default(), None).unwrap();

        let path = logger.log_path().unwrap();
        assert!(path.exists());
        assert!(path.to_string_lossy().contains("test_run.log"));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("test_run", dir.path(), LogConfig::default(), None).unwrap();

        logger.stage("Download");
        logger.info("Test message");
        logger.flush();

        let content = fs::read_to_string(logger.log_path().unwrap()).unwrap();
        assert!(content.contains("=== Download ==="));
        assert!(content.contains("Test message"));
    }

    #[test]
    fn level_filters_messages() {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let logger = RunLogger::detached(
            "quiet",
            LogConfig {
                level: LogLevel::Warn,
                ..LogConfig::default()
            },
            Some(Box::new(move |_line| {
                sink.fetch_add(1, Ordering::SeqCst);
            })),
        );

        logger.debug("hidden");
        logger.info("hidden");
        logger.warn("shown");
        logger.error("shown");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            progress_step: 20,
            ..LogConfig::default()
        };
        let logger = RunLogger::new("test_run", dir.path(), config, None).unwrap();

        assert!(!logger.progress(5));
        assert!(!logger.progress(15));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
        assert!(!logger.progress(100));
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let config = LogConfig {
            compact: true,
            error_tail: 5,
            ..LogConfig::default()
        };
        let logger = RunLogger::detached("tail", config, None);

        for i in 0..10 {
            logger.output_line(&format!("Line {}", i));
        }

        let tail = logger.get_tail();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "Line 5");
        assert_eq!(tail[4], "Line 9");
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }

    #[test]
    fn prunes_all_but_newest_logs() {
        let dir = tempdir().unwrap();
        for i in 0..7 {
            let path = dir.path().join(format!("run_{}.log", i));
            fs::write(&path, b"log").unwrap();
            let file = File::options().write(true).open(&path).unwrap();
            let time = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000 + i as u64);
            file.set_modified(time).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        let removed = prune_old_logs(dir.path(), 5).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(!dir.path().join("run_0.log").exists());
        assert!(!dir.path().join("run_1.log").exists());
        assert!(dir.path().join("run_6.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn prune_missing_dir_is_ok() {
        let dir = tempdir().unwrap();
        assert!(prune_old_logs(&dir.path().join("absent"), 5).unwrap().is_empty());
    }
}

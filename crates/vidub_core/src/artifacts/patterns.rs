//! Disposable-name patterns and folder-name sanitizing.

use regex::Regex;

/// Glob patterns for intermediate files at the top level of a run folder.
pub const DISPOSABLE_GLOBS: &[&str] = &[
    "*_extracted_audio.*",
    "*_subtitles.srt",
    "*_subtitles_*.srt",
    "*_translated_audio.*",
];

/// Regular expressions matched against the full base name of every file
/// found while walking the run folder.
pub const DISPOSABLE_PATTERNS: &[&str] = &[
    r".*_extracted_audio\.(wav|mp3)",
    r".*_subtitles\.srt",
    r".*_subtitles_[a-z]{2,3}\.srt",
    r".*_translated_audio\.(wav|mp3)",
    r"temp_\d+\.(mp3|wav)",
    r".*temp_.*",
    r"tmp.*",
    r".*\.temp",
    r"ffmpeg_temp\.\w+",
];

/// Characters that are not allowed in a run folder name.
const ILLEGAL_NAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|', '#'];

/// Compile a pattern so it must match the whole name.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

/// Translate a shell-style glob (`*` and `?` only) into an anchored regex.
pub fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    for ch in glob.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out)
}

/// Whether a base name carries the broad "temp"/"tmp" marker.
pub fn has_temp_marker(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("temp") || lower.contains("tmp")
}

/// Strip characters that are illegal in folder names.
///
/// Falls back to `video` when nothing usable remains.
pub fn sanitize_folder_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_NAME_CHARS.contains(c))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "video".to_string()
    } else {
        cleaned.to_string()
    }
}

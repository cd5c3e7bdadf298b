//! SRT subtitle writer.
//!
//! Segment offsets are float seconds; SRT uses millisecond timing
//! (HH:MM:SS,mmm), so times are rounded to the nearest millisecond at
//! write time.

use std::fs;
use std::io;
use std::path::Path;

use crate::models::Segment;

/// Write segments to SRT format string.
///
/// Blank segments (e.g. a failed translation) are left out and the
/// remaining cues are numbered consecutively from 1.
pub fn write_srt(segments: &[Segment]) -> String {
    let mut output = String::new();

    for (i, segment) in segments.iter().filter(|s| !s.is_blank()).enumerate() {
        if i > 0 {
            output.push('\n');
        }

        output.push_str(&format!("{}\n", i + 1));

        let start = format_srt_time(segment.start_ms());
        let end = format_srt_time(segment.end_ms());
        output.push_str(&format!("{} --> {}\n", start, end));

        output.push_str(segment.text.trim());
        output.push('\n');
    }

    output
}

/// Write segments to an SRT file, replacing it if present.
pub fn write_srt_file(path: &Path, segments: &[Segment]) -> io::Result<()> {
    fs::write(path, write_srt(segments))
}

/// Format milliseconds as SRT timestamp (HH:MM:SS,mmm).
pub fn format_srt_time(ms: u64) -> String {
    let millis = ms % 1000;
    let total_secs = ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0), "00:00:00,000");
        assert_eq!(format_srt_time(1000), "00:00:01,000");
        assert_eq!(format_srt_time(1500), "00:00:01,500");
        assert_eq!(format_srt_time(60000), "00:01:00,000");
        assert_eq!(format_srt_time(3600000), "01:00:00,000");
        assert_eq!(format_srt_time(3723004), "01:02:03,004");
    }

    #[test]
    fn test_write_basic_srt() {
        let segments = vec![
            Segment::new(1.0, 4.0, "Hello, world!"),
            Segment::new(5.0, 8.0, "Test subtitle."),
        ];

        let output = write_srt(&segments);

        assert!(output.contains("1\n00:00:01,000 --> 00:00:04,000\nHello, world!\n"));
        assert!(output.contains("\n\n2\n00:00:05,000 --> 00:00:08,000\nTest subtitle.\n"));
    }

    #[test]
    fn test_blank_segments_are_skipped() {
        let segments = vec![
            Segment::new(0.0, 1.0, "one"),
            Segment::new(1.0, 2.0, "   "),
            Segment::new(2.0, 3.0, "three"),
        ];

        let output = write_srt(&segments);

        assert!(!output.contains("3\n"));
        assert!(output.contains("2\n00:00:02,000 --> 00:00:03,000\nthree\n"));
    }

    #[test]
    fn test_write_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("talk_subtitles.srt");
        write_srt_file(&path, &[Segment::new(0.25, 1.5, "hi")]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1\n00:00:00,250 --> 00:00:01,500\nhi\n");
    }
}

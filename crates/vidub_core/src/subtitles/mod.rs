//! Subtitle file output.

mod srt;

pub use srt::{format_srt_time, write_srt, write_srt_file};

//! WAV persistence for assembled tracks.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;

use super::clip::{AudioClip, AudioFormat};

/// Errors from reading or writing track files.
#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Failed to write WAV {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to read WAV {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),
}

/// Write interleaved samples as 32-bit float PCM.
pub fn write_wav(path: &Path, clip: &AudioClip) -> Result<(), TimelineError> {
    if clip.format.channels == 0 || clip.format.sample_rate == 0 {
        return Err(TimelineError::InvalidFormat(clip.format.to_string()));
    }

    let spec = WavSpec {
        channels: clip.format.channels,
        sample_rate: clip.format.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let wrap = |source| TimelineError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = WavWriter::create(path, spec).map_err(wrap)?;
    for sample in &clip.samples {
        writer.write_sample(*sample).map_err(wrap)?;
    }
    writer.finalize().map_err(wrap)
}

/// Read a WAV file into `f32` samples, normalising integer PCM.
pub fn read_wav(path: &Path) -> Result<AudioClip, TimelineError> {
    let wrap = |source| TimelineError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = WavReader::open(path).map_err(wrap)?;
    let spec = reader.spec();
    let format = AudioFormat::new(spec.sample_rate, spec.channels);

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(wrap)?,
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<Vec<_>, _>>()
                .map_err(wrap)?
        }
    };

    Ok(AudioClip::new(samples, format))
}

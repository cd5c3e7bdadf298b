//! Gap-preserving concatenation of timed clips.

use super::clip::{AudioClip, AudioFormat, TimelineClip};

/// Latest accepted clip start (24 hours).
const MAX_START_MS: u64 = 24 * 60 * 60 * 1000;

/// Why a clip contributed no audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedClip {
    /// Position in the input list.
    pub index: usize,
    pub reason: String,
}

/// Where one clip landed in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub index: usize,
    /// Offset of the first frame of the clip in the track.
    pub offset_ms: u64,
    /// Silence inserted just before the clip.
    pub silence_ms: u64,
}

/// The assembled track.
#[derive(Debug, Clone)]
pub struct AssembledTrack {
    pub audio: AudioClip,
    pub duration_ms: u64,
    pub placements: Vec<Placement>,
    pub skipped: Vec<SkippedClip>,
}

/// Builds one continuous track from clips placed at their nominal starts.
///
/// Clips are consumed in input order. Before each clip, silence is
/// inserted up to its start; a clip that starts before the current end of
/// the track is appended immediately. Audio is never truncated, dropped or
/// moved earlier.
#[derive(Debug, Clone, Copy)]
pub struct AudioTimelineAssembler {
    format: AudioFormat,
}

impl AudioTimelineAssembler {
    pub fn new(format: AudioFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn assemble(&self, clips: &[TimelineClip]) -> AssembledTrack {
        let channels = self.format.channels as usize;
        let mut samples: Vec<f32> = Vec::new();
        let mut frames: u64 = 0;
        let mut placements = Vec::with_capacity(clips.len());
        let mut skipped = Vec::new();

        for (index, item) in clips.iter().enumerate() {
            let Some(clip) = item.clip.as_ref() else {
                tracing::debug!("Timeline: segment {} has no audio, skipping", index);
                skipped.push(SkippedClip {
                    index,
                    reason: "no audio".to_string(),
                });
                continue;
            };

            if clip.format != self.format {
                tracing::warn!(
                    "Timeline: segment {} is {} but the track is {}, skipping",
                    index,
                    clip.format,
                    self.format
                );
                skipped.push(SkippedClip {
                    index,
                    reason: format!("format {} does not match {}", clip.format, self.format),
                });
                continue;
            }

            // A trailing partial frame would shift the interleaving of every later clip.
            if channels == 0 || clip.samples.len() % channels != 0 {
                tracing::warn!(
                    "Timeline: segment {} has {} samples, not whole {}-channel frames, skipping",
                    index,
                    clip.samples.len(),
                    channels
                );
                skipped.push(SkippedClip {
                    index,
                    reason: format!("{} samples is not a whole number of frames", clip.samples.len()),
                });
                continue;
            }

            if item.start_ms > MAX_START_MS {
                tracing::warn!("Timeline: segment {} starts out of range, skipping", index);
                skipped.push(SkippedClip {
                    index,
                    reason: format!("start {} ms is out of range", item.start_ms),
                });
                continue;
            }

            let target = self.format.frames_for_ms(item.start_ms);
            let gap = target.saturating_sub(frames);
            if gap > 0 {
                samples.resize(samples.len() + gap as usize * channels, 0.0);
                frames += gap;
            }

            placements.push(Placement {
                index,
                offset_ms: self.format.ms_for_frames(frames),
                silence_ms: self.format.ms_for_frames(gap),
            });

            samples.extend_from_slice(&clip.samples);
            frames += clip.frames();
        }

        let audio = AudioClip::new(samples, self.format);
        let duration_ms = audio.duration_ms();
        AssembledTrack {
            audio,
            duration_ms,
            placements,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt() -> AudioFormat {
        AudioFormat::new(44_100, 2)
    }

    fn tone(ms: u64) -> AudioClip {
        let f = fmt();
        let len = f.frames_for_ms(ms) as usize * f.channels as usize;
        AudioClip::new(vec![0.25; len], f)
    }

    fn silent_frames(track: &AudioClip) -> usize {
        track.samples.iter().filter(|s| **s == 0.0).count() / track.format.channels as usize
    }

    #[test]
    fn contiguous_clips_have_no_silence() {
        let asm = AudioTimelineAssembler::new(fmt());
        let track = asm.assemble(&[TimelineClip::new(0, tone(1000)), TimelineClip::new(1000, tone(500))]);

        assert_eq!(track.duration_ms, 1500);
        assert_eq!(silent_frames(&track.audio), 0);
        assert_eq!(track.placements[1].offset_ms, 1000);
        assert!(track.skipped.is_empty());
    }

    #[test]
    fn gaps_are_filled_with_silence() {
        let asm = AudioTimelineAssembler::new(fmt());
        let track = asm.assemble(&[TimelineClip::new(0, tone(500)), TimelineClip::new(2000, tone(500))]);

        assert_eq!(track.duration_ms, 2500);
        assert_eq!(track.placements[1].silence_ms, 1500);
        assert_eq!(track.placements[1].offset_ms, 2000);
        assert_eq!(silent_frames(&track.audio), fmt().frames_for_ms(1500) as usize);
    }

    #[test]
    fn overrun_pushes_next_clip_later() {
        let asm = AudioTimelineAssembler::new(fmt());
        let track = asm.assemble(&[TimelineClip::new(0, tone(3000)), TimelineClip::new(1000, tone(500))]);

        assert_eq!(track.duration_ms, 3500);
        assert_eq!(track.placements[1].offset_ms, 3000);
        assert_eq!(track.placements[1].silence_ms, 0);
        assert_eq!(silent_frames(&track.audio), 0);
    }

    #[test]
    fn missing_clip_contributes_nothing() {
        let asm = AudioTimelineAssembler::new(fmt());
        let track = asm.assemble(&[
            TimelineClip::new(0, tone(500)),
            TimelineClip::missing(600),
            TimelineClip::new(1000, tone(500)),
        ]);

        assert_eq!(track.duration_ms, 1500);
        assert_eq!(track.skipped.len(), 1);
        assert_eq!(track.skipped[0].index, 1);
        assert_eq!(track.placements.len(), 2);
        assert_eq!(track.placements[1].silence_ms, 500);
    }

    #[test]
    fn input_order_is_kept_for_decreasing_starts() {
        let asm = AudioTimelineAssembler::new(fmt());
        let track = asm.assemble(&[TimelineClip::new(2000, tone(100)), TimelineClip::new(500, tone(100))]);

        assert_eq!(track.placements[0].offset_ms, 2000);
        assert_eq!(track.placements[1].offset_ms, 2100);
        assert_eq!(track.duration_ms, 2200);
    }

    #[test]
    fn mismatched_format_is_skipped() {
        let asm = AudioTimelineAssembler::new(fmt());
        let mono = AudioClip::new(vec![0.1; 100], AudioFormat::new(22_050, 1));
        let track = asm.assemble(&[TimelineClip::new(0, mono), TimelineClip::new(0, tone(200))]);

        assert_eq!(track.skipped.len(), 1);
        assert_eq!(track.skipped[0].index, 0);
        assert_eq!(track.duration_ms, 200);
    }

    #[test]
    fn partial_frame_clip_is_skipped() {
        let asm = AudioTimelineAssembler::new(fmt());
        let ragged = AudioClip::new(vec![0.25; 101], fmt());
        let track = asm.assemble(&[
            TimelineClip::new(0, tone(100)),
            TimelineClip::new(100, ragged),
            TimelineClip::new(100, tone(100)),
        ]);

        assert_eq!(track.skipped.len(), 1);
        assert_eq!(track.skipped[0].index, 1);
        assert_eq!(track.audio.samples.len() % 2, 0);
        assert_eq!(track.duration_ms, 200);
    }

    #[test]
    fn absurd_start_is_skipped() {
        let asm = AudioTimelineAssembler::new(fmt());
        let track = asm.assemble(&[TimelineClip::new(u64::MAX, tone(100)), TimelineClip::new(0, tone(100))]);

        assert_eq!(track.skipped.len(), 1);
        assert_eq!(track.skipped[0].index, 0);
        assert_eq!(track.duration_ms, 100);
    }

    #[test]
    fn empty_input_is_empty_track() {
        let track = AudioTimelineAssembler::new(fmt()).assemble(&[]);
        assert_eq!(track.duration_ms, 0);
        assert!(track.audio.is_empty());
    }
}

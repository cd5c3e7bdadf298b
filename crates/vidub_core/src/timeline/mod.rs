//! Audio timeline assembly.
//!
//! Synthesized speech clips are placed back at the start times of the
//! segments they were generated from, producing one continuous track that
//! the remuxer can lay over the original video.
//!
//! ```text
//! segments:  [0 ---- 500)           [2000 -- 2500)
//! track:     [clip 0][  silence 1500 ms  ][clip 1]
//! ```

mod assembler;
mod clip;
mod wav;

pub use assembler::{AssembledTrack, AudioTimelineAssembler, Placement, SkippedClip};
pub use clip::{AudioClip, AudioFormat, TimelineClip};
pub use wav::{read_wav, write_wav, TimelineError};

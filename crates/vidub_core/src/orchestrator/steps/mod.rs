//! Pipeline step implementations.
//!
//! One step per stage, run in [`Stage::ALL`](crate::models::Stage::ALL) order.

mod download;
mod extract;
mod finalize;
mod synthesize;
mod transcribe;
mod translate;

pub use download::DownloadStep;
pub use extract::ExtractAudioStep;
pub use finalize::FinalizeStep;
pub use synthesize::SynthesizeStep;
pub use transcribe::TranscribeStep;
pub use translate::TranslateStep;

//! Weighted progress reporting.
//!
//! Each stage reports progress within itself (0-100). The
//! [`ProgressAggregator`] maps that onto one overall percentage using fixed
//! per-stage weights and forwards it to a single [`ProgressObserver`].
//!
//! ```text
//! Download  ExtractAudio  Transcribe  Translate  Synthesize  Finalize
//! [ 0..20 ) [ 20..30 )    [ 30..60 )  [ 60..80 ) [ 80..95 )  [ 95..100 ]
//! ```

mod aggregator;
mod observer;

pub use aggregator::{ProgressAggregator, StageWeights, WeightsError};
pub use observer::{observer_fn, ProgressObserver, ProgressValue};

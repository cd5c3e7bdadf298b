//! Stage weights and the overall-percent calculation.

use std::sync::Arc;

use thiserror::Error;

use crate::models::Stage;

use super::observer::{ProgressObserver, ProgressValue};

/// A stage weight table that cannot be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeightsError {
    #[error("Stage weights must sum to 100, got {0}")]
    BadTotal(u32),
}

/// Fixed per-stage weights, summing to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageWeights {
    weights: [u32; Stage::COUNT],
}

impl StageWeights {
    /// Build a weight table, indexed in stage order.
    ///
    /// Rejects tables that do not sum to exactly 100.
    pub fn new(weights: [u32; Stage::COUNT]) -> Result<Self, WeightsError> {
        let total: u32 = weights.iter().sum();
        if total != 100 {
            return Err(WeightsError::BadTotal(total));
        }
        Ok(Self { weights })
    }

    /// Weight of one stage.
    pub fn weight(&self, stage: Stage) -> u32 {
        self.weights[stage.index()]
    }

    /// Sum of the weights of all stages strictly before `stage`.
    pub fn offset(&self, stage: Stage) -> u32 {
        self.weights[..stage.index()].iter().sum()
    }

    /// Always 100; kept as a method so callers can assert it.
    pub fn total(&self) -> u32 {
        self.weights.iter().sum()
    }
}

impl Default for StageWeights {
    fn default() -> Self {
        Self {
            weights: Stage::ALL.map(Stage::default_weight),
        }
    }
}

/// Maps (stage, percent-in-stage) onto one overall percent.
///
/// Apart from the weight table and the observer it forwards to, the
/// aggregator is stateless: [`ProgressAggregator::overall`] is a pure
/// function of its inputs.
#[derive(Clone)]
pub struct ProgressAggregator {
    weights: StageWeights,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ProgressAggregator {
    pub fn new(weights: StageWeights) -> Self {
        Self {
            weights,
            observer: None,
        }
    }

    /// Set the observer that receives every event.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn weights(&self) -> &StageWeights {
        &self.weights
    }

    /// Overall percent for `fraction_in_stage` (0-100) of `stage`.
    ///
    /// Out-of-range and NaN fractions are clamped into [0, 100].
    pub fn overall(&self, stage: Stage, fraction_in_stage: f64) -> f64 {
        let fraction = if fraction_in_stage.is_nan() {
            0.0
        } else {
            fraction_in_stage.clamp(0.0, 100.0)
        };
        let offset = self.weights.offset(stage) as f64;
        let weight = self.weights.weight(stage) as f64;
        (offset + weight * fraction / 100.0).clamp(0.0, 100.0)
    }

    /// Compute the overall percent and forward it to the observer.
    pub fn report(&self, stage: Stage, fraction_in_stage: f64) -> f64 {
        let overall = self.overall(stage, fraction_in_stage);
        if let Some(ref observer) = self.observer {
            observer.on_progress(ProgressValue::Percent(overall), stage, None);
        }
        overall
    }

    /// Forward a failure sentinel for `stage`.
    pub fn report_error(&self, stage: Stage, message: &str) {
        if let Some(ref observer) = self.observer {
            observer.on_progress(ProgressValue::Failed, stage, Some(message));
        }
    }

    /// Forward a cancellation sentinel for `stage`.
    pub fn report_cancelled(&self, stage: Stage) {
        if let Some(ref observer) = self.observer {
            observer.on_progress(ProgressValue::Cancelled, stage, Some("cancelled by user"));
        }
    }
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new(StageWeights::default())
    }
}

impl std::fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressAggregator")
            .field("weights", &self.weights)
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::observer_fn;
    use parking_lot::Mutex;

    #[test]
    fn weights_are_conserved() {
        let weights = StageWeights::default();
        assert_eq!(weights.total(), 100);
        assert_eq!(
            StageWeights::new([20, 10, 30, 20, 15, 6]),
            Err(WeightsError::BadTotal(101))
        );
        assert!(StageWeights::new([50, 10, 10, 10, 10, 10]).is_ok());
    }

    #[test]
    fn stage_start_equals_earlier_weights() {
        let agg = ProgressAggregator::default();
        let expected = [0.0, 20.0, 30.0, 60.0, 80.0, 95.0];
        for (stage, want) in Stage::ALL.iter().zip(expected) {
            assert_eq!(agg.overall(*stage, 0.0), want);
        }
    }

    #[test]
    fn finalize_complete_is_exactly_hundred() {
        let agg = ProgressAggregator::default();
        assert_eq!(agg.overall(Stage::Finalize, 100.0), 100.0);
    }

    #[test]
    fn in_order_reports_are_monotonic() {
        let agg = ProgressAggregator::default();
        let mut last = -1.0;
        for stage in Stage::ALL {
            for fraction in [0.0, 10.0, 33.3, 50.0, 99.9, 100.0] {
                let overall = agg.overall(stage, fraction);
                assert!(overall >= last, "{} < {} at {}", overall, last, stage);
                assert!(overall >= 0.0);
                last = overall;
            }
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn fractions_are_clamped() {
        let agg = ProgressAggregator::default();
        assert_eq!(agg.overall(Stage::Transcribe, -5.0), 30.0);
        assert_eq!(agg.overall(Stage::Transcribe, 250.0), 60.0);
        assert_eq!(agg.overall(Stage::Transcribe, f64::NAN), 30.0);
        assert_eq!(agg.overall(Stage::Transcribe, 50.0), 45.0);
    }

    #[test]
    fn observer_gets_percent_and_sentinels() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let agg = ProgressAggregator::default().with_observer(observer_fn(
            move |value, stage, error| {
                sink.lock().push((value, stage, error.map(str::to_string)));
            },
        ));

        assert_eq!(agg.report(Stage::Translate, 50.0), 70.0);
        agg.report_error(Stage::Synthesize, "tts offline");
        agg.report_cancelled(Stage::Finalize);

        let events = events.lock();
        assert_eq!(events[0].0, ProgressValue::Percent(70.0));
        assert_eq!(events[1].0, ProgressValue::Failed);
        assert_eq!(events[1].2.as_deref(), Some("tts offline"));
        assert_eq!(events[2].0, ProgressValue::Cancelled);
        assert_eq!(events[2].1, Stage::Finalize);
    }
}

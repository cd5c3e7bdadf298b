//! Observer interface for overall progress.

use std::sync::Arc;

use crate::models::Stage;

/// Value delivered to the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressValue {
    /// Overall progress in [0, 100].
    Percent(f64),
    /// The run failed in the reported stage.
    Failed,
    /// The run was cancelled in the reported stage.
    Cancelled,
}

impl ProgressValue {
    /// The percentage, if this is a normal progress event.
    pub fn percent(&self) -> Option<f64> {
        match self {
            ProgressValue::Percent(p) => Some(*p),
            _ => None,
        }
    }

    /// Whether this value signals abnormal termination.
    pub fn is_terminal_sentinel(&self) -> bool {
        !matches!(self, ProgressValue::Percent(_))
    }
}

/// Receives progress from the pipeline worker thread.
///
/// Called from whichever thread is doing the work, so implementations
/// must be `Send + Sync`. The error argument is only set alongside
/// [`ProgressValue::Failed`] and [`ProgressValue::Cancelled`].
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, value: ProgressValue, stage: Stage, error: Option<&str>);
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressValue, Stage, Option<&str>) + Send + Sync,
{
    fn on_progress(&self, value: ProgressValue, stage: Stage, error: Option<&str>) {
        self(value, stage, error)
    }
}

/// Wrap a closure as a shareable observer.
pub fn observer_fn<F>(f: F) -> Arc<dyn ProgressObserver>
where
    F: Fn(ProgressValue, Stage, Option<&str>) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn closure_observer_receives_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = observer_fn(move |value, stage, error| {
            sink.lock().push((value, stage, error.map(str::to_string)));
        });

        observer.on_progress(ProgressValue::Percent(12.5), Stage::Download, None);
        observer.on_progress(ProgressValue::Failed, Stage::Translate, Some("boom"));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0.percent(), Some(12.5));
        assert!(seen[1].0.is_terminal_sentinel());
        assert_eq!(seen[1].2.as_deref(), Some("boom"));
    }
}

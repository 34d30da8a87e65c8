//! Observer hooks for the optimizer and the slice fitter.
//!
//! All callbacks run synchronously on the fitting thread. Anything slow
//! (redrawing, network) should be handed off to another thread by the
//! implementor; the core makes no assumption about what a callback does.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::ShapeParameters;
use crate::models::TwoCircleShape;

/// Notified by the optimizer while it searches.
pub trait FitMonitor {
    /// A new best point was found.
    fn on_improvement(&mut self, _value: f64, _params: &ShapeParameters) {}

    /// Normalized progress of the current `optimize` call, in `[0, 1]`.
    fn on_progress(&mut self, _fraction: f64) {}
}

/// Notified by the slice fitter between slices.
pub trait ProgressSink {
    /// Normalized progress over the slice range, in `[0, 1]`.
    fn report(&mut self, fraction: f64);

    /// `slice` finished; `shape` is `None` when the slice was skipped.
    fn slice_finished(&mut self, _slice: usize, _shape: Option<&TwoCircleShape>) {}
}

/// Cooperative cancellation flag, cheap to clone and share across threads.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Monitor that logs improvements at debug level.
#[derive(Debug, Default)]
pub struct LogMonitor {
    improvements: usize,
}

impl LogMonitor {
    pub fn improvements(&self) -> usize {
        self.improvements
    }
}

impl FitMonitor for LogMonitor {
    fn on_improvement(&mut self, value: f64, params: &ShapeParameters) {
        self.improvements += 1;
        log::debug!(
            "improvement #{}: objective={value:.6} params={:.3?}",
            self.improvements,
            params
        );
    }
}

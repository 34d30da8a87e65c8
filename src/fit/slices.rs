//! Slice-range driver.
//!
//! Fits the two-circle shape on every slice of a range, using the result of
//! each slice as the starting point for the next one (warm start).
//!
//! Responsibilities:
//! - validate the whole configuration before touching any plane
//! - resolve defaults (bounds from the plane size, sample count from the
//!   initial perimeter) once per run
//! - apply the error policy (skip the slice or abort the run)
//! - honour cancellation between slices and report progress

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::domain::{Bounds, ErrorPolicy, FitConfig, PlaneSource, SliceRange};
use crate::error::{ConfigError, FitError};
use crate::fit::monitor::{CancellationToken, FitMonitor, ProgressSink};
use crate::fit::optimizer::{OptimizerConfig, ShapeOptimizer};
use crate::models::TwoCircleShape;

/// Fitted shape of one slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceFit {
    /// 1-based slice index.
    pub slice: usize,
    pub shape: TwoCircleShape,
    pub value: f64,
    pub converged: bool,
    pub iterations: usize,
    pub evaluations: usize,
}

/// A slice left without a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSlice {
    pub slice: usize,
    pub reason: String,
}

/// Outcome of a run over a slice range.
///
/// `slots` holds one entry per index of the range, in range order; `None`
/// marks a skipped slice or one not reached before cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub range: SliceRange,
    pub sample_count: usize,
    pub bounds: Bounds,
    pub slots: Vec<Option<SliceFit>>,
    pub skipped: Vec<SkippedSlice>,
    pub cancelled: bool,
}

impl FitResult {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slices that produced a shape.
    pub fn fitted(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Pairs of (slice index, fit) in range order.
    pub fn rows(&self) -> impl Iterator<Item = (usize, Option<&SliceFit>)> + '_ {
        self.range.indices().zip(self.slots.iter().map(Option::as_ref))
    }

    /// Last shape produced, if any.
    pub fn last_shape(&self) -> Option<&TwoCircleShape> {
        self.slots.iter().rev().flatten().map(|f| &f.shape).next()
    }
}

/// Optional observers of a run.
#[derive(Default)]
pub struct FitHooks<'h> {
    pub monitor: Option<&'h mut dyn FitMonitor>,
    pub cancel: Option<&'h CancellationToken>,
    pub progress: Option<&'h mut dyn ProgressSink>,
}

pub struct SliceFitter<'h> {
    config: FitConfig,
    hooks: FitHooks<'h>,
}

impl<'h> SliceFitter<'h> {
    pub fn new(config: FitConfig) -> Self {
        Self {
            config,
            hooks: FitHooks::default(),
        }
    }

    pub fn with_monitor(mut self, monitor: &'h mut dyn FitMonitor) -> Self {
        self.hooks.monitor = Some(monitor);
        self
    }

    pub fn with_cancellation(mut self, token: &'h CancellationToken) -> Self {
        self.hooks.cancel = Some(token);
        self
    }

    pub fn with_progress(mut self, sink: &'h mut dyn ProgressSink) -> Self {
        self.hooks.progress = Some(sink);
        self
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Fit every slice of `range`, starting from `initial`.
    pub fn run(
        &mut self,
        initial: &TwoCircleShape,
        planes: &dyn PlaneSource,
        range: SliceRange,
    ) -> Result<FitResult, FitError> {
        let mut optimizer = self.prepare(initial, planes, range)?;
        let sample_count = optimizer.config().sample_count;
        let bounds = optimizer.config().bounds;
        info!(
            "fitting slices {range} ({} planes), method={}, objective={}, samples={sample_count}",
            range.len(),
            self.config.method.display_name(),
            self.config.objective.display_name()
        );

        let mut shape = initial.clone();
        let mut slots: Vec<Option<SliceFit>> = vec![None; range.len()];
        let mut skipped = Vec::new();
        let mut cancelled = false;

        for (index, slice) in range.indices().enumerate() {
            if self.hooks.cancel.is_some_and(|t| t.is_cancelled()) {
                info!("cancelled before slice {slice}");
                cancelled = true;
                break;
            }
            if let (Some(sink), Some(fraction)) = (self.hooks.progress.as_deref_mut(), range.progress(slice)) {
                sink.report(fraction);
            }

            let monitor = self.hooks.monitor.as_deref_mut();
            let outcome = planes
                .plane(slice)
                .and_then(|plane| optimizer.optimize(&mut shape, &plane, monitor));

            match outcome {
                Ok(report) => {
                    if !report.converged {
                        debug!("slice {slice}: stopped at the iteration cap");
                    }
                    debug!("slice {slice}: {shape} value={:.6}", report.value);
                    slots[index] = Some(SliceFit {
                        slice,
                        shape: shape.clone(),
                        value: report.value,
                        converged: report.converged,
                        iterations: report.iterations,
                        evaluations: report.evaluations,
                    });
                }
                Err(err) if err.is_config() => return Err(err),
                Err(err) => match self.config.on_error {
                    ErrorPolicy::Skip => {
                        warn!("slice {slice} skipped: {err}");
                        skipped.push(SkippedSlice {
                            slice,
                            reason: err.to_string(),
                        });
                    }
                    ErrorPolicy::Abort => {
                        warn!("slice {slice} failed, aborting: {err}");
                        return Err(err);
                    }
                },
            }

            if let Some(sink) = self.hooks.progress.as_deref_mut() {
                sink.slice_finished(slice, slots[index].as_ref().map(|f| &f.shape));
            }
        }

        let result = FitResult {
            range,
            sample_count,
            bounds,
            slots,
            skipped,
            cancelled,
        };
        info!(
            "done: {}/{} slices fitted{}",
            result.fitted(),
            result.len(),
            if cancelled { " (cancelled)" } else { "" }
        );
        Ok(result)
    }

    /// Validate and resolve the run configuration without reading any plane.
    fn prepare(
        &self,
        initial: &TwoCircleShape,
        planes: &dyn PlaneSource,
        range: SliceRange,
    ) -> Result<ShapeOptimizer, FitError> {
        range.validate()?;
        if let Some(index) = initial.parameters().iter().position(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteStart { index }.into());
        }
        let available = planes.slice_count();
        if range.stop > available {
            return Err(ConfigError::SliceOutOfRange {
                slice: range.stop,
                available,
            }
            .into());
        }

        let bounds = match self.config.bounds {
            Some(bounds) => bounds,
            None => {
                let (width, height) = planes.dimensions();
                Bounds::from_image_size(width, height)
            }
        };
        let sample_count = match self.config.sample_count {
            Some(n) => n,
            None => {
                let perimeter = initial.perimeter();
                if perimeter.is_finite() && perimeter >= 1.0 {
                    perimeter.floor() as usize
                } else {
                    0
                }
            }
        };

        ShapeOptimizer::new(OptimizerConfig {
            method: self.config.method,
            objective: self.config.objective,
            interpolation: self.config.interpolation,
            sample_count,
            bounds,
            options: self.config.options,
        })
    }
}

/// Fit `initial` across `range` of `planes` with the given configuration.
pub fn fit(
    initial: &TwoCircleShape,
    planes: &dyn PlaneSource,
    range: SliceRange,
    config: &FitConfig,
    hooks: FitHooks<'_>,
) -> Result<FitResult, FitError> {
    SliceFitter {
        config: config.clone(),
        hooks,
    }
    .run(initial, planes, range)
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::cell::Cell;

    use super::*;
    use crate::data::synthetic::{SyntheticStack, render_rims};
    use crate::domain::{ImagePlane, ImageStack, OptimizationMethod};
    use crate::error::EvaluationError;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn truth() -> TwoCircleShape {
        TwoCircleShape::new(30.0, 30.0, 10.0, 70.0, 70.0, 8.0)
    }

    fn stack_of(n: usize) -> ImageStack {
        let plane = render_rims(100, 100, &truth(), 2.5, 0.1, 1.0);
        ImageStack::new(vec![plane; n])
    }

    /// Counts plane accesses; optionally fails some slices.
    struct CountingSource {
        inner: ImageStack,
        accesses: Cell<usize>,
        broken: Vec<usize>,
    }

    impl PlaneSource for CountingSource {
        fn slice_count(&self) -> usize {
            self.inner.slice_count()
        }

        fn dimensions(&self) -> (usize, usize) {
            self.inner.dimensions()
        }

        fn plane(&self, slice: usize) -> Result<Cow<'_, ImagePlane>, FitError> {
            self.accesses.set(self.accesses.get() + 1);
            if self.broken.contains(&slice) {
                return Err(EvaluationError::PlaneUnavailable {
                    slice,
                    reason: "corrupt".into(),
                }
                .into());
            }
            self.inner.plane(slice)
        }
    }

    fn counting(n: usize, broken: Vec<usize>) -> CountingSource {
        CountingSource {
            inner: stack_of(n),
            accesses: Cell::new(0),
            broken,
        }
    }

    #[test]
    fn end_to_end_single_slice() {
        init_logs();
        let stack = stack_of(1);
        let initial = TwoCircleShape::new(31.5, 28.8, 11.0, 68.9, 71.2, 7.2);
        let result = fit(
            &initial,
            &stack,
            SliceRange::single(1),
            &FitConfig::default(),
            FitHooks::default(),
        )
        .unwrap();

        assert_eq!(result.len(), 1);
        // floor(2 pi (11 + 7.2)) = 114
        assert_eq!(result.sample_count, 114);
        let fitted = result.slots[0].as_ref().unwrap();
        assert_eq!(fitted.slice, 1);
        for (g, w) in fitted.shape.parameters().iter().zip(truth().parameters().iter()) {
            assert!((g - w).abs() < 0.5, "got {} want {}", fitted.shape, truth());
        }
    }

    #[test]
    fn end_to_end_from_a_coarse_start() {
        init_logs();
        let plane = render_rims(100, 100, &truth(), 4.0, 0.1, 1.0);
        let stack = ImageStack::new(vec![plane]);
        let initial = TwoCircleShape::new(25.0, 25.0, 12.0, 65.0, 65.0, 10.0);
        let config = FitConfig {
            bounds: Some(Bounds::new([0.0; 6], [100.0; 6])),
            ..FitConfig::default()
        };
        let result = fit(&initial, &stack, SliceRange::single(1), &config, FitHooks::default()).unwrap();
        let fitted = result.last_shape().unwrap();
        for (g, w) in fitted.parameters().iter().zip(truth().parameters().iter()) {
            assert!((g - w).abs() < 1.0, "got {fitted} want {}", truth());
        }
    }

    #[test]
    fn result_length_follows_the_range() {
        init_logs();
        let stack = stack_of(7);
        let config = FitConfig {
            sample_count: Some(60),
            ..FitConfig::default()
        };
        for (range, expected) in [
            (SliceRange::new(1, 7, 1), 7),
            (SliceRange::new(2, 7, 2), 3),
            (SliceRange::new(3, 3, 1), 1),
            (SliceRange::new(1, 7, 10), 1),
        ] {
            let result = fit(&truth(), &stack, range, &config, FitHooks::default()).unwrap();
            assert_eq!(result.len(), expected, "range {range}");
            assert!(result.slots.iter().all(Option::is_some));
            let slices: Vec<usize> = result.rows().map(|(s, _)| s).collect();
            assert_eq!(slices, range.indices().collect::<Vec<_>>());
        }
    }

    #[test]
    fn configuration_errors_come_before_plane_access() {
        let source = counting(3, vec![]);
        let mut bounds = Bounds::from_image_size(100, 100);
        bounds.lower[2] = 20.0;
        bounds.upper[2] = 5.0;
        let config = FitConfig {
            bounds: Some(bounds),
            ..FitConfig::default()
        };
        let err = fit(&truth(), &source, SliceRange::new(1, 3, 1), &config, FitHooks::default()).unwrap_err();
        assert!(err.is_config(), "{err}");
        assert_eq!(source.accesses.get(), 0);

        let zero = FitConfig {
            sample_count: Some(0),
            ..FitConfig::default()
        };
        let err = fit(&truth(), &source, SliceRange::single(1), &zero, FitHooks::default()).unwrap_err();
        assert_eq!(err, FitError::Config(ConfigError::NonPositiveSampleCount));

        let err = fit(&truth(), &source, SliceRange::new(2, 9, 1), &FitConfig::default(), FitHooks::default())
            .unwrap_err();
        assert_eq!(
            err,
            FitError::Config(ConfigError::SliceOutOfRange {
                slice: 9,
                available: 3
            })
        );

        let err = fit(&truth(), &source, SliceRange::new(1, 3, 0), &FitConfig::default(), FitHooks::default())
            .unwrap_err();
        assert!(err.is_config());
        assert_eq!(source.accesses.get(), 0);
    }

    #[test]
    fn non_finite_start_is_a_configuration_error() {
        let source = counting(2, vec![]);
        for bad in [f64::NAN, f64::INFINITY] {
            let start = TwoCircleShape::new(bad, 30.0, 10.0, 70.0, 70.0, 8.0);
            let err = fit(&start, &source, SliceRange::new(1, 2, 1), &FitConfig::default(), FitHooks::default())
                .unwrap_err();
            assert_eq!(err, FitError::Config(ConfigError::NonFiniteStart { index: 0 }));
        }
        // Same with an explicit sample count.
        let config = FitConfig {
            sample_count: Some(100),
            ..FitConfig::default()
        };
        let start = TwoCircleShape::new(30.0, 30.0, 10.0, 70.0, f64::NAN, 8.0);
        let err = fit(&start, &source, SliceRange::single(1), &config, FitHooks::default()).unwrap_err();
        assert_eq!(err, FitError::Config(ConfigError::NonFiniteStart { index: 4 }));
        assert_eq!(source.accesses.get(), 0);
    }

    #[test]
    fn degenerate_initial_shape_has_no_samples() {
        let stack = stack_of(1);
        let tiny = TwoCircleShape::new(10.0, 10.0, 0.05, 20.0, 20.0, 0.05);
        let err = fit(&tiny, &stack, SliceRange::single(1), &FitConfig::default(), FitHooks::default())
            .unwrap_err();
        assert_eq!(err, FitError::Config(ConfigError::NonPositiveSampleCount));
    }

    #[test]
    fn fitted_shapes_stay_inside_bounds() {
        init_logs();
        let stack = stack_of(3);
        let mut bounds = Bounds::from_image_size(100, 100);
        bounds.lower[0] = 35.0;
        bounds.upper[5] = 6.0;
        let config = FitConfig {
            bounds: Some(bounds),
            method: OptimizationMethod::NelderMead,
            ..FitConfig::default()
        };
        let result = fit(&truth(), &stack, SliceRange::new(1, 3, 1), &config, FitHooks::default()).unwrap();
        for fit in result.slots.iter().flatten() {
            assert!(bounds.contains(&fit.shape.parameters()), "{}", fit.shape);
        }
    }

    #[test]
    fn warm_start_tracks_drifting_shapes() {
        init_logs();
        let start = truth();
        let stack = SyntheticStack {
            width: 100,
            height: 100,
            slices: 6,
            shape: start.clone(),
            drift: (1.0, 0.5),
            sigma: 2.5,
            background: 0.1,
            amplitude: 1.0,
            noise: 0.0,
            seed: 7,
        }
        .render()
        .unwrap();

        // 6 slices of drift add up to 5 px; far beyond the basin of a cold start.
        let result = fit(
            &start,
            &stack,
            SliceRange::new(1, 6, 1),
            &FitConfig::default(),
            FitHooks::default(),
        )
        .unwrap();
        assert_eq!(result.fitted(), 6);
        let last = result.last_shape().unwrap();
        assert!((last.parameters()[0] - 35.0).abs() < 0.5, "{last}");
        assert!((last.parameters()[1] - 32.5).abs() < 0.5, "{last}");
        assert!((last.parameters()[3] - 75.0).abs() < 0.5, "{last}");
    }

    #[test]
    fn skip_policy_leaves_gaps_and_abort_policy_stops() {
        init_logs();
        let source = counting(4, vec![2]);
        let skip = fit(
            &truth(),
            &source,
            SliceRange::new(1, 4, 1),
            &FitConfig::default(),
            FitHooks::default(),
        )
        .unwrap();
        assert_eq!(skip.len(), 4);
        assert!(skip.slots[1].is_none());
        assert_eq!(skip.fitted(), 3);
        assert_eq!(skip.skipped.len(), 1);
        assert_eq!(skip.skipped[0].slice, 2);

        let abort = FitConfig {
            on_error: ErrorPolicy::Abort,
            ..FitConfig::default()
        };
        let source = counting(4, vec![2]);
        let err = fit(&truth(), &source, SliceRange::new(1, 4, 1), &abort, FitHooks::default()).unwrap_err();
        assert!(!err.is_config());
        assert_eq!(source.accesses.get(), 2);
    }

    #[test]
    fn cancellation_stops_between_slices() {
        struct CancelAfter<'a> {
            token: &'a CancellationToken,
            after: usize,
            finished: Vec<usize>,
            reports: Vec<f64>,
        }
        impl ProgressSink for CancelAfter<'_> {
            fn report(&mut self, fraction: f64) {
                self.reports.push(fraction);
            }
            fn slice_finished(&mut self, slice: usize, shape: Option<&TwoCircleShape>) {
                assert!(shape.is_some());
                self.finished.push(slice);
                if self.finished.len() == self.after {
                    self.token.cancel();
                }
            }
        }

        let stack = stack_of(5);
        let token = CancellationToken::new();
        let mut sink = CancelAfter {
            token: &token,
            after: 2,
            finished: Vec::new(),
            reports: Vec::new(),
        };
        let config = FitConfig {
            sample_count: Some(60),
            ..FitConfig::default()
        };
        let result = SliceFitter::new(config)
            .with_cancellation(&token)
            .with_progress(&mut sink)
            .run(&truth(), &stack, SliceRange::new(1, 5, 1))
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.len(), 5);
        assert_eq!(result.fitted(), 2);
        assert!(result.slots[2..].iter().all(Option::is_none));
        assert_eq!(sink.finished, vec![1, 2]);
        assert_eq!(sink.reports, vec![0.0, 0.25]);
    }
}

//! Bounded derivative-free search methods.
//!
//! Every method talks to the objective through [`Problem`], which:
//! - projects each trial vector into the box before evaluating it
//! - tracks the best point seen so far (what the optimizer finally returns)
//! - notifies the monitor on every improvement and on progress
//! - counts evaluations against the evaluation cap
//!
//! Methods are selected at runtime through the [`DirectSearch`] trait.

use nalgebra::SVector;

use crate::domain::{Bounds, N_PARAMS, OptimizationMethod, OptimizerOptions, ShapeParameters};
use crate::error::FitError;
use crate::fit::monitor::FitMonitor;

pub mod line;
pub mod powell;
pub mod simplex;

pub use powell::PowellSearch;
pub use simplex::NelderMead;

/// Parameter vector in the search space.
pub type ParamVector = SVector<f64, N_PARAMS>;

/// Denominator guard for relative tolerance tests.
pub(crate) const TINY: f64 = 1e-12;

pub fn to_vector(p: &ShapeParameters) -> ParamVector {
    ParamVector::from_column_slice(p)
}

pub fn to_parameters(v: &ParamVector) -> ShapeParameters {
    let mut out = [0.0; N_PARAMS];
    out.copy_from_slice(v.as_slice());
    out
}

/// Result of one search run.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub point: ParamVector,
    pub value: f64,
    pub iterations: usize,
    /// `false` when the iteration or evaluation cap stopped the search.
    pub converged: bool,
}

/// A bounded minimization strategy.
pub trait DirectSearch {
    fn name(&self) -> &'static str;

    fn minimize(&self, problem: &mut Problem<'_, '_>, start: ParamVector) -> Result<SearchOutcome, FitError>;
}

/// Instantiate the search strategy for `method`.
pub fn searcher(method: OptimizationMethod) -> Box<dyn DirectSearch> {
    match method {
        OptimizationMethod::ConjugateDirection => Box::new(PowellSearch {
            update_directions: true,
        }),
        OptimizationMethod::OrthogonalSearch => Box::new(PowellSearch {
            update_directions: false,
        }),
        OptimizationMethod::NelderMead => Box::new(NelderMead::default()),
    }
}

/// Objective plus box constraints, as seen by a search method.
pub struct Problem<'a, 'm> {
    objective: &'a mut dyn FnMut(&ParamVector) -> Result<f64, FitError>,
    lower: ParamVector,
    upper: ParamVector,
    options: OptimizerOptions,
    monitor: Option<&'a mut (dyn FitMonitor + 'm)>,
    best: Option<(ParamVector, f64)>,
    evaluations: usize,
}

impl<'a, 'm> Problem<'a, 'm> {
    pub fn new(
        objective: &'a mut dyn FnMut(&ParamVector) -> Result<f64, FitError>,
        bounds: &Bounds,
        options: OptimizerOptions,
        monitor: Option<&'a mut (dyn FitMonitor + 'm)>,
    ) -> Self {
        Self {
            objective,
            lower: to_vector(&bounds.lower),
            upper: to_vector(&bounds.upper),
            options,
            monitor,
            best: None,
            evaluations: 0,
        }
    }

    pub fn options(&self) -> &OptimizerOptions {
        &self.options
    }

    /// Component-wise clamp into `[lower, upper]`.
    pub fn project(&self, x: &ParamVector) -> ParamVector {
        x.zip_zip_map(&self.lower, &self.upper, |v, lo, hi| v.clamp(lo, hi))
    }

    /// Evaluate the objective at the projection of `x`.
    pub fn evaluate(&mut self, x: &ParamVector) -> Result<f64, FitError> {
        let x = self.project(x);
        let value = (self.objective)(&x)?;
        self.evaluations += 1;

        let improved = match self.best {
            Some((_, best)) => value < best,
            None => true,
        };
        if improved {
            self.best = Some((x, value));
            if let Some(monitor) = self.monitor.as_deref_mut() {
                monitor.on_improvement(value, &to_parameters(&x));
            }
        }
        Ok(value)
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn exhausted(&self) -> bool {
        self.evaluations >= self.options.max_evaluations
    }

    /// Best point evaluated so far.
    pub fn best(&self) -> Option<(ParamVector, f64)> {
        self.best
    }

    pub fn report_progress(&mut self, fraction: f64) {
        if let Some(monitor) = self.monitor.as_deref_mut() {
            monitor.on_progress(fraction.clamp(0.0, 1.0));
        }
    }

    /// Range of `t` keeping `x + t d` inside the box (`x` assumed feasible).
    pub fn feasible_interval(&self, x: &ParamVector, d: &ParamVector) -> (f64, f64) {
        let mut t_lo = f64::NEG_INFINITY;
        let mut t_hi = f64::INFINITY;
        for j in 0..N_PARAMS {
            let dj = d[j];
            if dj.abs() <= TINY {
                continue;
            }
            let a = (self.lower[j] - x[j]) / dj;
            let b = (self.upper[j] - x[j]) / dj;
            t_lo = t_lo.max(a.min(b));
            t_hi = t_hi.min(a.max(b));
        }
        (t_lo.min(0.0), t_hi.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn unit_box(lo: f64, hi: f64) -> Bounds {
        Bounds::new([lo; N_PARAMS], [hi; N_PARAMS])
    }

    // Weighted bowl with minimum value 1 at `center`.
    pub(crate) fn bowl(center: [f64; N_PARAMS]) -> impl FnMut(&ParamVector) -> Result<f64, FitError> {
        move |x: &ParamVector| {
            Ok(1.0
                + x.iter()
                    .zip(center.iter())
                    .enumerate()
                    .map(|(i, (a, b))| (i as f64 + 1.0) * (a - b).powi(2))
                    .sum::<f64>())
        }
    }

    #[test]
    fn evaluate_projects_and_tracks_best() {
        let mut seen: Vec<ParamVector> = Vec::new();
        let mut f = |x: &ParamVector| -> Result<f64, FitError> {
            seen.push(*x);
            Ok(x.norm_squared())
        };
        let bounds = unit_box(-1.0, 1.0);
        let mut problem = Problem::new(&mut f, &bounds, OptimizerOptions::default(), None);

        let v = problem.evaluate(&ParamVector::repeat(5.0)).unwrap();
        assert_eq!(v, 6.0);
        problem.evaluate(&ParamVector::repeat(0.5)).unwrap();
        problem.evaluate(&ParamVector::repeat(0.9)).unwrap();

        let (best_x, best_f) = problem.best().unwrap();
        assert_eq!(best_x, ParamVector::repeat(0.5));
        assert!((best_f - 1.5).abs() < 1e-12);
        assert_eq!(problem.evaluations(), 3);
        drop(problem);
        assert!(seen.iter().all(|x| x.iter().all(|v| (-1.0..=1.0).contains(v))));
    }

    #[test]
    fn feasible_interval_respects_box() {
        let mut f = |_: &ParamVector| -> Result<f64, FitError> { Ok(0.0) };
        let bounds = unit_box(0.0, 10.0);
        let problem = Problem::new(&mut f, &bounds, OptimizerOptions::default(), None);

        let x = ParamVector::repeat(4.0);
        let mut d = ParamVector::zeros();
        d[0] = 1.0;
        d[1] = -2.0;
        let (lo, hi) = problem.feasible_interval(&x, &d);
        // d[0]: t in [-4, 6]; d[1]: t in [-3, 2]
        assert!((lo + 3.0).abs() < 1e-12);
        assert!((hi - 2.0).abs() < 1e-12);
    }

    #[test]
    fn monitor_sees_each_improvement() {
        #[derive(Default)]
        struct Recorder {
            values: Vec<f64>,
            progress: Vec<f64>,
        }
        impl FitMonitor for Recorder {
            fn on_improvement(&mut self, value: f64, _params: &ShapeParameters) {
                self.values.push(value);
            }
            fn on_progress(&mut self, fraction: f64) {
                self.progress.push(fraction);
            }
        }

        let mut recorder = Recorder::default();
        let mut f = |x: &ParamVector| -> Result<f64, FitError> { Ok(x[0]) };
        let bounds = unit_box(-10.0, 10.0);
        let mut problem =
            Problem::new(&mut f, &bounds, OptimizerOptions::default(), Some(&mut recorder));
        for v in [3.0, 5.0, 1.0, 1.0, -2.0] {
            problem.evaluate(&ParamVector::repeat(v)).unwrap();
        }
        problem.report_progress(1.7);
        drop(problem);

        assert_eq!(recorder.values, vec![3.0, 1.0, -2.0]);
        assert_eq!(recorder.progress, vec![1.0]);
    }
}

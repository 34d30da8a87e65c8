//! Single-plane shape optimization.
//!
//! `ShapeOptimizer` owns:
//! - the objective evaluator (with its scratch buffers)
//! - the search strategy selected by `OptimizationMethod`
//! - the validated bounds box
//!
//! One instance is reused across all slices of a run, so the sample count
//! fixed at construction stays constant for the run.

use log::{debug, trace};

use crate::domain::{
    Bounds, ImagePlane, Interpolation, ObjectiveKind, OptimizationMethod, OptimizerOptions,
};
use crate::error::{ConfigError, FitError};
use crate::fit::monitor::FitMonitor;
use crate::fit::objective::ObjectiveEvaluator;
use crate::fit::search::{DirectSearch, ParamVector, Problem, searcher, to_parameters, to_vector};
use crate::models::TwoCircleShape;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    pub method: OptimizationMethod,
    pub objective: ObjectiveKind,
    pub interpolation: Interpolation,
    pub sample_count: usize,
    pub bounds: Bounds,
    pub options: OptimizerOptions,
}

/// Outcome of one `optimize` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizeReport {
    /// Objective value at the returned shape.
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
}

pub struct ShapeOptimizer {
    config: OptimizerConfig,
    evaluator: ObjectiveEvaluator,
    search: Box<dyn DirectSearch>,
}

impl ShapeOptimizer {
    /// Validate the configuration and build the optimizer.
    pub fn new(config: OptimizerConfig) -> Result<Self, FitError> {
        config.bounds.validate()?;
        config.options.validate()?;
        let evaluator = ObjectiveEvaluator::new(config.objective, config.interpolation, config.sample_count)?;
        let search = searcher(config.method);
        debug!(
            "optimizer ready: method={} objective={} samples={}",
            search.name(),
            config.objective.display_name(),
            config.sample_count
        );
        Ok(Self {
            config,
            evaluator,
            search,
        })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Refine `shape` on `plane`, starting from its current parameters.
    ///
    /// On success `shape` holds the best point found (always inside the
    /// bounds). On an evaluation error `shape` is left untouched.
    pub fn optimize(
        &mut self,
        shape: &mut TwoCircleShape,
        plane: &ImagePlane,
        monitor: Option<&mut (dyn FitMonitor + '_)>,
    ) -> Result<OptimizeReport, FitError> {
        let start = shape.parameters();
        if let Some(index) = start.iter().position(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteStart { index }.into());
        }
        let projected = self.config.bounds.clamp(&start);
        if projected != start {
            debug!("start {start:.3?} projected into bounds as {projected:.3?}");
        }

        let evaluator = &mut self.evaluator;
        let mut trial = shape.clone();
        let mut objective = |x: &ParamVector| -> Result<f64, FitError> {
            trial.set_parameters(to_parameters(x));
            evaluator.evaluate(&trial, plane)
        };

        let mut problem = Problem::new(&mut objective, &self.config.bounds, self.config.options, monitor);
        let outcome = self.search.minimize(&mut problem, to_vector(&projected))?;
        problem.report_progress(1.0);
        let evaluations = problem.evaluations();

        shape.set_parameters(self.config.bounds.clamp(&to_parameters(&outcome.point)));
        trace!(
            "{}: value={:.6} iterations={} evaluations={} converged={}",
            self.search.name(),
            outcome.value,
            outcome.iterations,
            evaluations,
            outcome.converged
        );

        Ok(OptimizeReport {
            value: outcome.value,
            iterations: outcome.iterations,
            evaluations,
            converged: outcome.converged,
        })
    }
}

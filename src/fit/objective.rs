//! Boundary-sampling objective.
//!
//! For a shape hypothesis the evaluator:
//! 1. generates `sample_count` boundary points from the shape
//! 2. samples the plane at each point (see `math::interp` for conventions)
//! 3. reduces the samples with the configured `ObjectiveKind`
//!
//! The result is always a cost to minimize.

use crate::domain::{ImagePlane, Interpolation, ObjectiveKind};
use crate::error::{ConfigError, EvaluationError, FitError};
use crate::math::{reduce, sample};
use crate::models::TwoCircleShape;

#[derive(Debug, Clone)]
pub struct ObjectiveEvaluator {
    kind: ObjectiveKind,
    interpolation: Interpolation,
    sample_count: usize,
    // Scratch buffers reused across evaluations.
    points: Vec<[f64; 2]>,
    samples: Vec<f64>,
}

impl ObjectiveEvaluator {
    pub fn new(
        kind: ObjectiveKind,
        interpolation: Interpolation,
        sample_count: usize,
    ) -> Result<Self, ConfigError> {
        if sample_count == 0 {
            return Err(ConfigError::NonPositiveSampleCount);
        }
        Ok(Self {
            kind,
            interpolation,
            sample_count,
            points: Vec::with_capacity(sample_count),
            samples: Vec::with_capacity(sample_count),
        })
    }

    pub fn kind(&self) -> ObjectiveKind {
        self.kind
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Cost of `shape` on `plane`.
    pub fn evaluate(&mut self, shape: &TwoCircleShape, plane: &ImagePlane) -> Result<f64, FitError> {
        if plane.is_empty() {
            return Err(EvaluationError::EmptyPlane.into());
        }

        shape.boundary_points_into(self.sample_count, &mut self.points);
        self.samples.clear();
        self.samples.extend(
            self.points
                .iter()
                .map(|p| sample(plane, p[0], p[1], self.interpolation)),
        );

        let value = reduce(self.kind, &mut self.samples);
        if !value.is_finite() {
            return Err(EvaluationError::NonFiniteObjective.into());
        }
        Ok(value)
    }
}

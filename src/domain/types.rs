//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - selected from the CLI (`ValueEnum`)
//! - written to the JSON fit record and reloaded later

use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of free parameters of the two-circle model.
pub const N_PARAMS: usize = 6;

/// `{x1, y1, r1, x2, y2, r2}`: centers and radii of the two circles.
pub type ShapeParameters = [f64; N_PARAMS];

/// Indices of the radius parameters inside `ShapeParameters`.
pub const RADIUS_INDICES: [usize; 2] = [2, 5];

/// Aggregate statistic computed over the sampled boundary intensities.
///
/// The optimizer always minimizes. Kinds that look for a *bright* boundary
/// return the negated statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectiveKind {
    /// Maximize the mean boundary intensity (returns `-mean`).
    Mean,
    /// Minimize the mean boundary intensity (returns `mean`).
    MinusMean,
    /// Maximize the median boundary intensity (returns `-median`).
    Median,
    /// Minimize the boundary intensity variance (returns `variance`).
    Variance,
}

impl ObjectiveKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ObjectiveKind::Mean => "mean (bright boundary)",
            ObjectiveKind::MinusMean => "minus mean (dark boundary)",
            ObjectiveKind::Median => "median (bright boundary)",
            ObjectiveKind::Variance => "variance (uniform boundary)",
        }
    }
}

/// Direct-search strategy used by the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationMethod {
    /// Powell's conjugate direction search.
    ConjugateDirection,
    /// Cyclic line searches along the parameter axes.
    OrthogonalSearch,
    /// Nelder–Mead simplex with vertices clamped to the bounds.
    NelderMead,
}

impl OptimizationMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            OptimizationMethod::ConjugateDirection => "conjugate direction (Powell)",
            OptimizationMethod::OrthogonalSearch => "orthogonal search",
            OptimizationMethod::NelderMead => "Nelder-Mead simplex",
        }
    }
}

/// How the plane is sampled at sub-pixel boundary points.
///
/// Pixel `(i, j)` is centered on coordinate `(i, j)`. Coordinates outside the
/// plane are clamped to the nearest edge pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    Nearest,
    Bilinear,
}

/// What the slice fitter does when a slice cannot be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Leave the slot absent, log a warning, continue with the next slice.
    Skip,
    /// Stop the run and return the error.
    Abort,
}

/// Inclusive range of 1-based slice indices visited with a fixed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceRange {
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl SliceRange {
    pub fn new(start: usize, stop: usize, step: usize) -> Self {
        Self { start, stop, step }
    }

    /// A range that visits one slice.
    pub fn single(slice: usize) -> Self {
        Self::new(slice, slice, 1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step == 0 || self.start == 0 || self.start > self.stop {
            return Err(ConfigError::EmptySliceRange {
                start: self.start,
                stop: self.stop,
                step: self.step,
            });
        }
        Ok(())
    }

    /// Number of visited slices: `floor((stop - start) / step) + 1`.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (self.stop - self.start) / self.step + 1
    }

    pub fn is_empty(&self) -> bool {
        self.step == 0 || self.start > self.stop
    }

    /// Visited slice indices in increasing order.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        (self.start..=self.stop).step_by(self.step.max(1))
    }

    /// Normalized progress at `slice`: `(slice - start) / (stop - start)`.
    ///
    /// `None` for a single-slice range.
    pub fn progress(&self, slice: usize) -> Option<f64> {
        if self.stop == self.start {
            return None;
        }
        Some((slice - self.start) as f64 / (self.stop - self.start) as f64)
    }
}

impl Default for SliceRange {
    fn default() -> Self {
        Self::single(1)
    }
}

impl std::fmt::Display for SliceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.stop, self.step)
    }
}

/// Parses `start:stop[:step]` or a single slice index.
impl FromStr for SliceRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let parse = |p: &str| {
            p.parse::<usize>()
                .map_err(|_| format!("Invalid slice index '{p}' in range '{s}'."))
        };
        let range = match parts.as_slice() {
            [one] => SliceRange::single(parse(one)?),
            [start, stop] => SliceRange::new(parse(start)?, parse(stop)?, 1),
            [start, stop, step] => SliceRange::new(parse(start)?, parse(stop)?, parse(step)?),
            _ => return Err(format!("Invalid slice range '{s}' (expected start:stop[:step]).")),
        };
        range.validate().map_err(|e| e.to_string())?;
        Ok(range)
    }
}

/// Parse `x1,y1,r1,x2,y2,r2`.
pub fn parse_parameters(s: &str) -> Result<ShapeParameters, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid number '{}' in '{s}'.", p.trim()))
        })
        .collect::<Result<_, _>>()?;
    if values.len() != N_PARAMS {
        return Err(format!(
            "Expected {N_PARAMS} comma-separated values (x1,y1,r1,x2,y2,r2), got {}.",
            values.len()
        ));
    }
    let mut out = [0.0; N_PARAMS];
    out.copy_from_slice(&values);
    Ok(out)
}

/// Box constraints on the shape parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: ShapeParameters,
    pub upper: ShapeParameters,
}

impl Bounds {
    pub fn new(lower: ShapeParameters, upper: ShapeParameters) -> Self {
        Self { lower, upper }
    }

    /// Positions within the plane, radii up to `min(width, height)`.
    pub fn from_image_size(width: usize, height: usize) -> Self {
        let w = width as f64;
        let h = height as f64;
        let r = w.min(h);
        Self {
            lower: [0.0; N_PARAMS],
            upper: [w, h, r, w, h, r],
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for index in 0..N_PARAMS {
            let (lo, hi) = (self.lower[index], self.upper[index]);
            if !(lo.is_finite() && hi.is_finite()) {
                return Err(ConfigError::NonFiniteBound { index });
            }
            if lo > hi {
                return Err(ConfigError::InvalidBounds {
                    index,
                    lower: lo,
                    upper: hi,
                });
            }
        }
        for index in RADIUS_INDICES {
            if self.lower[index] < 0.0 {
                return Err(ConfigError::NegativeRadiusBound {
                    index,
                    lower: self.lower[index],
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, params: &ShapeParameters) -> bool {
        params
            .iter()
            .enumerate()
            .all(|(i, &p)| p >= self.lower[i] && p <= self.upper[i])
    }

    pub fn clamp(&self, params: &ShapeParameters) -> ShapeParameters {
        let mut out = *params;
        for (i, p) in out.iter_mut().enumerate() {
            *p = p.clamp(self.lower[i], self.upper[i]);
        }
        out
    }
}

/// Termination and step settings shared by all search methods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerOptions {
    /// Cap on outer iterations (direction sweeps / simplex steps).
    pub max_iterations: usize,
    /// Hard cap on objective evaluations per `optimize` call.
    pub max_evaluations: usize,
    /// Relative tolerance on the objective decrease per iteration.
    pub tolerance: f64,
    /// Absolute step tolerance (pixels) for line searches and simplex size.
    pub line_tolerance: f64,
    /// Initial step (pixels) used to bracket line minima and build the simplex.
    pub initial_step: f64,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            max_evaluations: 20_000,
            tolerance: 1e-6,
            line_tolerance: 1e-3,
            initial_step: 2.0,
        }
    }
}

impl OptimizerOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidOptimizerSetting(
                "max_iterations must be > 0".to_string(),
            ));
        }
        if self.max_evaluations == 0 {
            return Err(ConfigError::InvalidOptimizerSetting(
                "max_evaluations must be > 0".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::InvalidOptimizerSetting(format!(
                "tolerance must be finite and > 0 (got {})",
                self.tolerance
            )));
        }
        if !(self.line_tolerance.is_finite() && self.line_tolerance > 0.0) {
            return Err(ConfigError::InvalidOptimizerSetting(format!(
                "line_tolerance must be finite and > 0 (got {})",
                self.line_tolerance
            )));
        }
        if !(self.initial_step.is_finite() && self.initial_step > 0.0) {
            return Err(ConfigError::InvalidOptimizerSetting(format!(
                "initial_step must be finite and > 0 (got {})",
                self.initial_step
            )));
        }
        Ok(())
    }
}

/// A full run's configuration as understood by the slice fitter.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    pub objective: ObjectiveKind,
    pub method: OptimizationMethod,
    pub interpolation: Interpolation,
    /// Fixed boundary sample count. `None` means `floor(perimeter)` of the
    /// starting shape.
    pub sample_count: Option<usize>,
    /// Explicit bounds. `None` means `Bounds::from_image_size` of the stack.
    pub bounds: Option<Bounds>,
    pub options: OptimizerOptions,
    pub on_error: ErrorPolicy,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            objective: ObjectiveKind::Mean,
            method: OptimizationMethod::ConjugateDirection,
            interpolation: Interpolation::Bilinear,
            sample_count: None,
            bounds: None,
            options: OptimizerOptions::default(),
            on_error: ErrorPolicy::Skip,
        }
    }
}

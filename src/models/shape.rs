//! Two-circle shape model.
//!
//! The shape is two independent circles `(x1, y1, r1)` and `(x2, y2, r2)`.
//! The fitter only needs three primitive operations from it:
//! - the perimeter (to size the boundary sample count once per run)
//! - deterministic boundary points (to sample the image)
//! - get/set of the flat parameter vector (for the optimizer)

use std::f64::consts::TAU;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{N_PARAMS, ShapeParameters};

const PARAMETER_NAMES: [&str; N_PARAMS] = ["x1", "y1", "r1", "x2", "y2", "r2"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoCircleShape {
    params: ShapeParameters,
}

impl TwoCircleShape {
    pub fn new(x1: f64, y1: f64, r1: f64, x2: f64, y2: f64, r2: f64) -> Self {
        Self {
            params: [x1, y1, r1, x2, y2, r2],
        }
    }

    pub fn from_parameters(params: ShapeParameters) -> Self {
        Self { params }
    }

    pub fn parameters(&self) -> ShapeParameters {
        self.params
    }

    pub fn set_parameters(&mut self, params: ShapeParameters) {
        self.params = params;
    }

    /// Names matching the order of `parameters()`, for reports and exports.
    pub fn parameter_names() -> [&'static str; N_PARAMS] {
        PARAMETER_NAMES
    }

    /// Named parameter list, e.g. `[("x1", 25.0), ...]`.
    pub fn named_parameters(&self) -> Vec<(&'static str, f64)> {
        PARAMETER_NAMES.iter().copied().zip(self.params).collect()
    }

    /// `(cx, cy, r)` of circle 0 or 1.
    pub fn circle(&self, k: usize) -> (f64, f64, f64) {
        let o = 3 * k;
        (self.params[o], self.params[o + 1], self.params[o + 2])
    }

    /// Sum of both circumferences.
    pub fn perimeter(&self) -> f64 {
        TAU * (self.params[2].max(0.0) + self.params[5].max(0.0))
    }

    /// `n` boundary points, allocated to each circle proportionally to its
    /// circumference.
    pub fn boundary_points(&self, n: usize) -> Vec<[f64; 2]> {
        let mut out = Vec::with_capacity(n);
        self.boundary_points_into(n, &mut out);
        out
    }

    /// Same as [`boundary_points`](Self::boundary_points), reusing `out`.
    pub fn boundary_points_into(&self, n: usize, out: &mut Vec<[f64; 2]>) {
        out.clear();
        let (n1, n2) = self.split_samples(n);
        for (k, count) in [(0, n1), (1, n2)] {
            let (cx, cy, r) = self.circle(k);
            let r = r.max(0.0);
            for j in 0..count {
                let theta = TAU * j as f64 / count as f64;
                out.push([cx + r * theta.cos(), cy + r * theta.sin()]);
            }
        }
    }

    /// Number of samples on each circle. Always sums to `n`.
    fn split_samples(&self, n: usize) -> (usize, usize) {
        let r1 = self.params[2].max(0.0);
        let r2 = self.params[5].max(0.0);
        let total = r1 + r2;
        if !(total.is_finite() && total > 0.0) {
            // Both circles are degenerate: sample the two centers evenly.
            return (n / 2, n - n / 2);
        }
        let n1 = ((n as f64) * r1 / total).round() as usize;
        let n1 = n1.min(n);
        (n1, n - n1)
    }
}

impl fmt::Display for TwoCircleShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.params;
        write!(
            f,
            "TwoCircle[c1=({:.2}, {:.2}) r1={:.2} | c2=({:.2}, {:.2}) r2={:.2}]",
            p[0], p[1], p[2], p[3], p[4], p[5]
        )
    }
}

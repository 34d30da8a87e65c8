//! Synthetic two-circle stacks.
//!
//! Each circle is drawn as a bright rim with a Gaussian cross-section on a
//! uniform background:
//!
//! value(p) = background + amplitude * max_k exp(-(|p - c_k| - r_k)^2 / (2 sigma^2))
//!
//! The rim is what the boundary-mean objective responds to: it peaks exactly
//! on the circle. Optional per-pixel Gaussian noise is seeded per slice, so a
//! slice renders the same regardless of which other slices are rendered.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{ImagePlane, ImageStack};
use crate::error::{AppError, EXIT_INPUT};
use crate::models::TwoCircleShape;

/// Noise-free plane with both rims of `shape`.
pub fn render_rims(
    width: usize,
    height: usize,
    shape: &TwoCircleShape,
    sigma: f64,
    background: f64,
    amplitude: f64,
) -> ImagePlane {
    let circles = [shape.circle(0), shape.circle(1)];
    let two_s2 = 2.0 * sigma * sigma;
    ImagePlane::from_fn(width, height, |x, y| {
        let (px, py) = (x as f64, y as f64);
        let peak = circles
            .iter()
            .map(|&(cx, cy, r)| {
                let d = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt() - r;
                (-(d * d) / two_s2).exp()
            })
            .fold(0.0, f64::max);
        (background + amplitude * peak) as f32
    })
}

/// A stack whose shape translates by `drift` pixels per slice.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticStack {
    pub width: usize,
    pub height: usize,
    pub slices: usize,
    /// Shape on slice 1.
    pub shape: TwoCircleShape,
    /// `(dx, dy)` added to both centers per slice.
    pub drift: (f64, f64),
    pub sigma: f64,
    pub background: f64,
    pub amplitude: f64,
    /// Standard deviation of additive noise; 0 disables it.
    pub noise: f64,
    pub seed: u64,
}

impl SyntheticStack {
    pub fn new(width: usize, height: usize, slices: usize, shape: TwoCircleShape) -> Self {
        Self {
            width,
            height,
            slices,
            shape,
            drift: (0.0, 0.0),
            sigma: 2.5,
            background: 0.1,
            amplitude: 1.0,
            noise: 0.0,
            seed: 42,
        }
    }

    /// True shape on 1-based `slice`.
    pub fn shape_at(&self, slice: usize) -> TwoCircleShape {
        let k = slice.saturating_sub(1) as f64;
        let (dx, dy) = (self.drift.0 * k, self.drift.1 * k);
        let mut p = self.shape.parameters();
        p[0] += dx;
        p[1] += dy;
        p[3] += dx;
        p[4] += dy;
        TwoCircleShape::from_parameters(p)
    }

    /// `(slice, true shape)` for every slice.
    pub fn truth(&self) -> Vec<(usize, TwoCircleShape)> {
        (1..=self.slices).map(|s| (s, self.shape_at(s))).collect()
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.width == 0 || self.height == 0 {
            return Err(AppError::new(EXIT_INPUT, "Synthetic plane size must be > 0."));
        }
        if self.slices == 0 {
            return Err(AppError::new(EXIT_INPUT, "Synthetic slice count must be > 0."));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(AppError::new(EXIT_INPUT, "Rim width (sigma) must be finite and > 0."));
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(AppError::new(EXIT_INPUT, "Noise level must be finite and >= 0."));
        }
        Ok(())
    }

    /// Render 1-based `slice`.
    pub fn plane(&self, slice: usize) -> Result<ImagePlane, AppError> {
        self.validate()?;
        let mut plane = render_rims(
            self.width,
            self.height,
            &self.shape_at(slice),
            self.sigma,
            self.background,
            self.amplitude,
        );
        if self.noise > 0.0 {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(slice as u64));
            let normal = Normal::new(0.0, self.noise)
                .map_err(|e| AppError::new(EXIT_INPUT, format!("Noise distribution error: {e}")))?;
            let noisy: Vec<f32> = plane
                .pixels()
                .iter()
                .map(|&v| v + normal.sample(&mut rng) as f32)
                .collect();
            plane = ImagePlane::new(self.width, self.height, noisy)
                .map_err(|e| AppError::new(EXIT_INPUT, e.to_string()))?;
        }
        Ok(plane)
    }

    /// Render every slice.
    pub fn render(&self) -> Result<ImageStack, AppError> {
        let planes = (1..=self.slices)
            .map(|s| self.plane(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ImageStack::new(planes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlaneSource;

    fn shape() -> TwoCircleShape {
        TwoCircleShape::new(30.0, 30.0, 10.0, 70.0, 70.0, 8.0)
    }

    #[test]
    fn rims_peak_on_the_circles() {
        let plane = render_rims(100, 100, &shape(), 2.0, 0.1, 1.0);
        // (40, 30) lies on circle 1, (70, 62) on circle 2.
        assert!((plane.value(40, 30) - 1.1).abs() < 1e-5);
        assert!((plane.value(70, 62) - 1.1).abs() < 1e-5);
        // Centers and far corners are background.
        assert!((plane.value(30, 30) - 0.1).abs() < 1e-3);
        assert!((plane.value(0, 99) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn drift_moves_both_centers() {
        let mut stack = SyntheticStack::new(100, 100, 4, shape());
        stack.drift = (1.5, -0.5);
        let s3 = stack.shape_at(3);
        assert_eq!(s3.parameters(), [33.0, 29.0, 10.0, 73.0, 69.0, 8.0]);
        assert_eq!(stack.shape_at(1), shape());
        assert_eq!(stack.truth().len(), 4);
    }

    #[test]
    fn noise_is_reproducible_per_slice() {
        let mut stack = SyntheticStack::new(32, 32, 3, TwoCircleShape::new(10.0, 10.0, 5.0, 20.0, 20.0, 4.0));
        stack.noise = 0.05;
        let a = stack.render().unwrap();
        let b = stack.plane(2).unwrap();
        assert_eq!(a.plane(2).unwrap().as_ref(), &b);
        assert_ne!(a.plane(1).unwrap().pixels(), a.plane(2).unwrap().pixels());
    }

    #[test]
    fn invalid_settings_are_input_errors() {
        let mut stack = SyntheticStack::new(10, 10, 1, shape());
        stack.noise = -1.0;
        assert_eq!(stack.render().unwrap_err().exit_code(), EXIT_INPUT);
        stack.noise = 0.0;
        stack.slices = 0;
        assert!(stack.render().is_err());
    }
}

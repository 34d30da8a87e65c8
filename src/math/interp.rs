//! Sub-pixel sampling of image planes.
//!
//! Conventions:
//! - pixel `(i, j)` is centered on coordinate `(i, j)`
//! - coordinates outside the plane are clamped to `[0, w-1] x [0, h-1]`, so a
//!   boundary point that leaves the image reads the nearest edge pixel
//!
//! Callers must not pass an empty plane.

use crate::domain::{ImagePlane, Interpolation};

/// Sample `plane` at `(x, y)` with the given interpolation.
#[inline]
pub fn sample(plane: &ImagePlane, x: f64, y: f64, interp: Interpolation) -> f64 {
    match interp {
        Interpolation::Nearest => nearest(plane, x, y),
        Interpolation::Bilinear => bilinear(plane, x, y),
    }
}

/// Nearest-pixel sample with edge clamping.
#[inline]
pub fn nearest(plane: &ImagePlane, x: f64, y: f64) -> f64 {
    let (xc, yc) = clamp_coords(plane, x, y);
    plane.value(xc.round() as usize, yc.round() as usize) as f64
}

/// Bilinear sample with edge clamping.
#[inline]
pub fn bilinear(plane: &ImagePlane, x: f64, y: f64) -> f64 {
    let (xc, yc) = clamp_coords(plane, x, y);
    let x0 = xc.floor() as usize;
    let y0 = yc.floor() as usize;
    let x1 = (x0 + 1).min(plane.width() - 1);
    let y1 = (y0 + 1).min(plane.height() - 1);
    let fx = xc - x0 as f64;
    let fy = yc - y0 as f64;

    let p00 = plane.value(x0, y0) as f64;
    let p10 = plane.value(x1, y0) as f64;
    let p01 = plane.value(x0, y1) as f64;
    let p11 = plane.value(x1, y1) as f64;
    (1.0 - fx) * (1.0 - fy) * p00 + fx * (1.0 - fy) * p10 + (1.0 - fx) * fy * p01 + fx * fy * p11
}

/// Clamp into the pixel-center domain. NaN coordinates map to 0.
#[inline]
fn clamp_coords(plane: &ImagePlane, x: f64, y: f64) -> (f64, f64) {
    let max_x = (plane.width() - 1) as f64;
    let max_y = (plane.height() - 1) as f64;
    let xc = if x.is_nan() { 0.0 } else { x.clamp(0.0, max_x) };
    let yc = if y.is_nan() { 0.0 } else { y.clamp(0.0, max_y) };
    (xc, yc)
}

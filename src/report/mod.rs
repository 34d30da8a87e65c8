//! Reporting utilities: track statistics and formatted terminal output.

pub mod format;

pub use format::*;

use crate::models::TwoCircleShape;

/// How the fitted shape moved over the fitted slices.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub fitted: usize,
    pub first_frame: usize,
    pub last_frame: usize,
    /// Net `(dx, dy)` of each center between the first and last fitted frame.
    pub center_shift: [(f64, f64); 2],
    /// `(min, max)` of each radius over the fitted frames.
    pub radius_range: [(f64, f64); 2],
}

/// Summarize `(frame, shape)` rows given in frame order.
pub fn summarize_track(shapes: &[(usize, TwoCircleShape)]) -> Option<TrackSummary> {
    let (first_frame, first) = shapes.first()?;
    let (last_frame, last) = shapes.last()?;

    let mut radius_range = [(f64::INFINITY, f64::NEG_INFINITY); 2];
    for (_, shape) in shapes {
        for (k, range) in radius_range.iter_mut().enumerate() {
            let (_, _, r) = shape.circle(k);
            range.0 = range.0.min(r);
            range.1 = range.1.max(r);
        }
    }

    let shift = |k: usize| {
        let (x0, y0, _) = first.circle(k);
        let (x1, y1, _) = last.circle(k);
        (x1 - x0, y1 - y0)
    };

    Some(TrackSummary {
        fitted: shapes.len(),
        first_frame: *first_frame,
        last_frame: *last_frame,
        center_shift: [shift(0), shift(1)],
        radius_range,
    })
}

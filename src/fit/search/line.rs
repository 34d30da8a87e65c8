//! Bounded one-dimensional minimization along a direction.
//!
//! The step `t` is confined to the interval that keeps `x + t d` inside the
//! box. A minimum is bracketed by golden-ratio expansion and then refined by
//! golden-section search down to `line_tolerance` (in parameter units).

use super::{ParamVector, Problem, TINY};
use crate::error::FitError;

const GOLD: f64 = 1.618_033_988_749_895;
const INV_PHI: f64 = 0.618_033_988_749_895;

/// Best point found along a line.
#[derive(Debug, Clone, Copy)]
pub struct LineMinimum {
    pub t: f64,
    pub value: f64,
}

impl LineMinimum {
    fn offer(&mut self, t: f64, value: f64) {
        if value < self.value {
            self.t = t;
            self.value = value;
        }
    }
}

/// Minimize `f(x + t d)` over the feasible `t`, given `fx = f(x)`.
///
/// Never returns a point worse than `x` itself (`t = 0`).
pub fn line_minimize(
    problem: &mut Problem<'_, '_>,
    x: &ParamVector,
    d: &ParamVector,
    fx: f64,
) -> Result<LineMinimum, FitError> {
    let mut best = LineMinimum { t: 0.0, value: fx };
    let norm = d.norm();
    if norm <= TINY {
        return Ok(best);
    }

    let (t_lo, t_hi) = problem.feasible_interval(x, d);
    let tol = problem.options().line_tolerance / norm;
    if t_hi - t_lo <= tol {
        return Ok(best);
    }
    let h = problem.options().initial_step / norm;

    // Pick a downhill side.
    let mut a = 0.0;
    let forward = h.min(t_hi);
    let backward = (-h).max(t_lo);

    let f_fwd = if forward > 0.0 {
        Some(probe(problem, x, d, forward)?)
    } else {
        None
    };
    if let Some(f) = f_fwd {
        best.offer(forward, f);
    }

    let (mut b, mut fb) = match f_fwd {
        Some(f) if f < fx => (forward, f),
        _ => {
            let f_bwd = if backward < 0.0 {
                Some(probe(problem, x, d, backward)?)
            } else {
                None
            };
            if let Some(f) = f_bwd {
                best.offer(backward, f);
            }
            match f_bwd {
                Some(f) if f < fx => (backward, f),
                _ => {
                    // Neither side descends: the minimum lies between them.
                    let lo = if f_bwd.is_some() { backward } else { 0.0 };
                    let hi = if f_fwd.is_some() { forward } else { 0.0 };
                    golden_section(problem, x, d, (lo, hi), tol, &mut best)?;
                    return Ok(best);
                }
            }
        }
    };

    // Expand until the function turns up or the box stops us.
    loop {
        if problem.exhausted() {
            return Ok(best);
        }
        let c = (b + GOLD * (b - a)).clamp(t_lo, t_hi);
        if (c - b).abs() <= TINY {
            // Pinned at the bound while still descending.
            return Ok(best);
        }
        let fc = probe(problem, x, d, c)?;
        best.offer(c, fc);
        if fc >= fb {
            let (lo, hi) = if a < c { (a, c) } else { (c, a) };
            golden_section(problem, x, d, (lo, hi), tol, &mut best)?;
            return Ok(best);
        }
        a = b;
        b = c;
        fb = fc;
    }
}

fn probe(problem: &mut Problem<'_, '_>, x: &ParamVector, d: &ParamVector, t: f64) -> Result<f64, FitError> {
    problem.evaluate(&(x + d * t))
}

fn golden_section(
    problem: &mut Problem<'_, '_>,
    x: &ParamVector,
    d: &ParamVector,
    (mut lo, mut hi): (f64, f64),
    tol: f64,
    best: &mut LineMinimum,
) -> Result<(), FitError> {
    if hi - lo <= tol {
        return Ok(());
    }
    let mut c = hi - INV_PHI * (hi - lo);
    let mut e = lo + INV_PHI * (hi - lo);
    let mut fc = probe(problem, x, d, c)?;
    best.offer(c, fc);
    let mut fe = probe(problem, x, d, e)?;
    best.offer(e, fe);

    while hi - lo > tol && !problem.exhausted() {
        if fc < fe {
            hi = e;
            e = c;
            fe = fc;
            c = hi - INV_PHI * (hi - lo);
            fc = probe(problem, x, d, c)?;
            best.offer(c, fc);
        } else {
            lo = c;
            c = e;
            fc = fe;
            e = lo + INV_PHI * (hi - lo);
            fe = probe(problem, x, d, e)?;
            best.offer(e, fe);
        }
    }
    Ok(())
}

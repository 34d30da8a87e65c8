//! Powell-style direction-set search.
//!
//! Each iteration runs a bounded line search along every direction of the
//! set. With `update_directions` the set is updated with the net displacement
//! of the iteration (conjugate directions); without it the set stays the
//! coordinate axes (orthogonal search).

use nalgebra::SMatrix;

use super::line::line_minimize;
use super::{DirectSearch, ParamVector, Problem, SearchOutcome, TINY};
use crate::domain::N_PARAMS;
use crate::error::FitError;

#[derive(Debug, Clone, Copy)]
pub struct PowellSearch {
    pub update_directions: bool,
}

impl DirectSearch for PowellSearch {
    fn name(&self) -> &'static str {
        if self.update_directions {
            "conjugate-direction"
        } else {
            "orthogonal"
        }
    }

    fn minimize(&self, problem: &mut Problem<'_, '_>, start: ParamVector) -> Result<SearchOutcome, FitError> {
        let max_iterations = problem.options().max_iterations;
        let tol = problem.options().tolerance;

        let mut x = problem.project(&start);
        let mut fx = problem.evaluate(&x)?;
        let mut directions = SMatrix::<f64, N_PARAMS, N_PARAMS>::identity();
        let mut iterations = 0;
        let mut converged = false;

        while iterations < max_iterations && !problem.exhausted() {
            iterations += 1;
            let x_start = x;
            let f_start = fx;
            let mut largest_drop = 0.0;
            let mut largest_index = 0;

            for i in 0..N_PARAMS {
                let d = directions.column(i).into_owned();
                let m = line_minimize(problem, &x, &d, fx)?;
                if fx - m.value > largest_drop {
                    largest_drop = fx - m.value;
                    largest_index = i;
                }
                if m.value < fx {
                    x = problem.project(&(x + d * m.t));
                    fx = m.value;
                }
                if problem.exhausted() {
                    break;
                }
            }

            problem.report_progress(iterations as f64 / max_iterations as f64);

            if 2.0 * (f_start - fx) <= tol * (f_start.abs() + fx.abs()) + TINY {
                converged = true;
                break;
            }
            if !self.update_directions || problem.exhausted() {
                continue;
            }

            let delta = x - x_start;
            let step = delta.norm();
            if step <= TINY {
                continue;
            }
            let f_ext = problem.evaluate(&(x + delta))?;
            if f_ext >= f_start {
                continue;
            }
            let t = 2.0 * (f_start - 2.0 * fx + f_ext) * (f_start - fx - largest_drop).powi(2)
                - largest_drop * (f_start - f_ext).powi(2);
            if t < 0.0 {
                let d = delta / step;
                let m = line_minimize(problem, &x, &d, fx)?;
                if m.value < fx {
                    x = problem.project(&(x + d * m.t));
                    fx = m.value;
                }
                let last = directions.column(N_PARAMS - 1).into_owned();
                directions.set_column(largest_index, &last);
                directions.set_column(N_PARAMS - 1, &d);
            }
        }

        // The extrapolation probe may have beaten the line searches.
        let (point, value) = match problem.best() {
            Some((bx, bf)) if bf < fx => (bx, bf),
            _ => (x, fx),
        };
        Ok(SearchOutcome {
            point,
            value,
            iterations,
            converged,
        })
    }
}

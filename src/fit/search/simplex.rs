//! Nelder–Mead simplex search with vertices clamped into the box.

use super::{DirectSearch, ParamVector, Problem, SearchOutcome, TINY};
use crate::domain::N_PARAMS;
use crate::error::FitError;

#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    pub reflection: f64,
    pub expansion: f64,
    pub contraction: f64,
    pub shrink: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
        }
    }
}

type Vertex = (ParamVector, f64);

impl NelderMead {
    fn initial_simplex(&self, problem: &mut Problem<'_, '_>, x0: ParamVector) -> Result<Vec<Vertex>, FitError> {
        let step = problem.options().initial_step;
        let f0 = problem.evaluate(&x0)?;
        let mut simplex = Vec::with_capacity(N_PARAMS + 1);
        simplex.push((x0, f0));
        for i in 0..N_PARAMS {
            let mut v = x0;
            v[i] += step;
            let mut v = problem.project(&v);
            if (v[i] - x0[i]).abs() <= TINY {
                // Upper bound is active on this axis; step down instead.
                v[i] = x0[i] - step;
                v = problem.project(&v);
            }
            let f = problem.evaluate(&v)?;
            simplex.push((v, f));
        }
        Ok(simplex)
    }
}

impl DirectSearch for NelderMead {
    fn name(&self) -> &'static str {
        "nelder-mead"
    }

    fn minimize(&self, problem: &mut Problem<'_, '_>, start: ParamVector) -> Result<SearchOutcome, FitError> {
        let max_iterations = problem.options().max_iterations;
        let tol = problem.options().tolerance;
        let x_tol = problem.options().line_tolerance;

        let x0 = problem.project(&start);
        let mut simplex = self.initial_simplex(problem, x0)?;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < max_iterations && !problem.exhausted() {
            simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            let (best_x, best_f) = simplex[0];
            let (worst_x, worst_f) = simplex[N_PARAMS];
            let second_worst_f = simplex[N_PARAMS - 1].1;

            let spread = (worst_f - best_f).abs();
            let size = simplex[1..]
                .iter()
                .map(|(v, _)| (v - best_x).amax())
                .fold(0.0, f64::max);
            if spread <= tol * (best_f.abs() + worst_f.abs()) + TINY && size <= x_tol {
                converged = true;
                break;
            }
            iterations += 1;

            let centroid = simplex[..N_PARAMS]
                .iter()
                .fold(ParamVector::zeros(), |acc, (v, _)| acc + v)
                / N_PARAMS as f64;

            let xr = problem.project(&(centroid + (centroid - worst_x) * self.reflection));
            let fr = problem.evaluate(&xr)?;

            if fr < best_f {
                let xe = problem.project(&(centroid + (xr - centroid) * self.expansion));
                let fe = problem.evaluate(&xe)?;
                simplex[N_PARAMS] = if fe < fr { (xe, fe) } else { (xr, fr) };
            } else if fr < second_worst_f {
                simplex[N_PARAMS] = (xr, fr);
            } else {
                let (xc, fc, accept) = if fr < worst_f {
                    let xc = problem.project(&(centroid + (xr - centroid) * self.contraction));
                    let fc = problem.evaluate(&xc)?;
                    (xc, fc, fc <= fr)
                } else {
                    let xc = problem.project(&(centroid + (worst_x - centroid) * self.contraction));
                    let fc = problem.evaluate(&xc)?;
                    (xc, fc, fc < worst_f)
                };
                if accept {
                    simplex[N_PARAMS] = (xc, fc);
                } else {
                    for vertex in simplex.iter_mut().skip(1) {
                        let v = problem.project(&(best_x + (vertex.0 - best_x) * self.shrink));
                        let f = problem.evaluate(&v)?;
                        *vertex = (v, f);
                    }
                }
            }

            problem.report_progress(iterations as f64 / max_iterations as f64);
        }

        let (point, value) = simplex
            .iter()
            .copied()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((x0, f64::INFINITY));
        Ok(SearchOutcome {
            point,
            value,
            iterations,
            converged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bounds, OptimizerOptions};
    use crate::fit::search::tests::bowl;

    fn options() -> OptimizerOptions {
        OptimizerOptions {
            max_iterations: 5_000,
            ..OptimizerOptions::default()
        }
    }

    #[test]
    fn converges_on_a_bowl() {
        let center = [3.0, -2.0, 5.5, 0.5, 7.0, 2.0];
        let mut f = bowl(center);
        let bounds = Bounds::new([-20.0; N_PARAMS], [20.0; N_PARAMS]);
        let mut problem = Problem::new(&mut f, &bounds, options(), None);
        let out = NelderMead::default()
            .minimize(&mut problem, ParamVector::zeros())
            .unwrap();
        assert!(out.converged, "stopped after {} iterations", out.iterations);
        for (got, want) in out.point.iter().zip(center.iter()) {
            assert!((got - want).abs() < 1e-2, "{got} vs {want}");
        }
    }

    #[test]
    fn vertices_never_leave_the_box() {
        let mut center = [0.0; N_PARAMS];
        center[3] = -9.0;
        let mut inner = bowl(center);
        let mut outside = 0usize;
        let mut f = |x: &ParamVector| -> Result<f64, FitError> {
            if x.iter().any(|v| !(-2.0..=2.0).contains(v)) {
                outside += 1;
            }
            inner(x)
        };
        let bounds = Bounds::new([-2.0; N_PARAMS], [2.0; N_PARAMS]);
        let mut problem = Problem::new(&mut f, &bounds, options(), None);
        let out = NelderMead::default()
            .minimize(&mut problem, ParamVector::repeat(1.9))
            .unwrap();
        drop(problem);

        assert_eq!(outside, 0);
        assert!((out.point[3] + 2.0).abs() < 1e-2, "x3 = {}", out.point[3]);
    }
}

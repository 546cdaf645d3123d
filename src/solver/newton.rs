//! Newton-Raphson iteration over a compiled equation system.

use std::time::Instant;

use crate::error::{Error, Result};

use super::lu::LuSolver;
use super::system::Equations;
use super::{DEFAULT_ABS_TOLERANCE, DEFAULT_REL_TOLERANCE, MAX_ITERATIONS};

/// Newton-Raphson solver with all work buffers preallocated.
///
/// `solve` never allocates. The factorization of a linear system is kept
/// between calls; call [`NewtonSolver::invalidate`] before switching to
/// different equations.
#[derive(Debug, Clone)]
pub struct NewtonSolver {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute step tolerance
    pub abs_tolerance: f64,
    /// Step tolerance relative to the magnitude of each unknown
    pub rel_tolerance: f64,
    lu: LuSolver,
    jacobian: Vec<f64>,
    residual: Vec<f64>,
    dx: Vec<f64>,
    trial: Vec<f64>,
    temps: Vec<f64>,
}

impl NewtonSolver {
    /// Create a solver for `size` unknowns and tapes needing `scratch_len` temps.
    pub fn new(size: usize, scratch_len: usize) -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            abs_tolerance: DEFAULT_ABS_TOLERANCE,
            rel_tolerance: DEFAULT_REL_TOLERANCE,
            lu: LuSolver::new(size),
            jacobian: vec![0.0; size * size],
            residual: vec![0.0; size],
            dx: vec![0.0; size],
            trial: vec![0.0; size],
            temps: vec![0.0; scratch_len],
        }
    }

    /// Set iteration limit and tolerances.
    pub fn with_limits(mut self, max_iterations: usize, abs_tolerance: f64, rel_tolerance: f64) -> Self {
        self.max_iterations = max_iterations;
        self.abs_tolerance = abs_tolerance;
        self.rel_tolerance = rel_tolerance;
        self
    }

    /// Drop any cached factorization.
    pub fn invalidate(&mut self) {
        self.lu.invalidate();
    }

    /// Scratch buffer for evaluating other tapes of the same system.
    pub fn temps_mut(&mut self) -> &mut [f64] {
        &mut self.temps
    }

    /// Solve `F(x) = 0` starting from `x`.
    ///
    /// On success `x` holds the solution and the iteration count is returned.
    /// On failure `x` is left untouched.
    pub fn solve(
        &mut self,
        equations: &Equations,
        x: &mut [f64],
        params: &[f64],
        deadline: Option<Instant>,
    ) -> Result<usize> {
        if equations.size() == 0 {
            return Ok(0);
        }
        let linear = equations.is_linear();
        self.trial.copy_from_slice(x);

        for iter in 1..=self.max_iterations {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(Error::DeadlineExceeded {
                        iterations: iter - 1,
                    });
                }
            }

            equations.residuals(&self.trial, params, &mut self.temps, &mut self.residual);

            if !(linear && self.lu.is_factored()) {
                equations.jacobian(&self.trial, params, &mut self.temps, &mut self.jacobian);
                if self.lu.factor(&self.jacobian).is_err() {
                    return Err(Error::convergence_failure(iter, max_abs(&self.residual)));
                }
            }

            // J·dx = F, x ← x - dx
            self.lu.solve(&self.residual, &mut self.dx);

            let mut converged = true;
            for (xi, &step) in self.trial.iter_mut().zip(&self.dx) {
                if !step.is_finite() {
                    return Err(Error::convergence_failure(iter, max_abs(&self.residual)));
                }
                *xi -= step;
                if step.abs() > self.abs_tolerance + self.rel_tolerance * xi.abs() {
                    converged = false;
                }
            }

            // One solve is exact for a linear system.
            if converged || linear {
                x.copy_from_slice(&self.trial);
                return Ok(iter);
            }
        }

        equations.residuals(&self.trial, params, &mut self.temps, &mut self.residual);
        Err(Error::convergence_failure(
            self.max_iterations,
            max_abs(&self.residual),
        ))
    }
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Assembly, Equation};
    use crate::expr::{Expr, Symbol};
    use crate::solver::{EquationSystem, Integration};
    use approx::assert_relative_eq;

    fn system(residuals: Vec<Expr>, unknowns: &[&str]) -> EquationSystem {
        let assembly = Assembly {
            unknowns: unknowns.iter().map(|u| Symbol::new(*u)).collect(),
            equations: residuals
                .into_iter()
                .enumerate()
                .map(|(i, residual)| Equation {
                    label: format!("eq{i}"),
                    residual,
                })
                .collect(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        EquationSystem::compile(&assembly, 48000.0, Integration::Trapezoidal).unwrap()
    }

    fn x() -> Expr {
        Expr::unknown(Symbol::new("x"))
    }

    #[test]
    fn test_linear_solves_in_one_iteration() {
        let sys = system(vec![Expr::constant(2.0) * x() - Expr::constant(3.0)], &["x"]);
        let mut newton = NewtonSolver::new(sys.size(), sys.scratch_len());
        let mut state = [0.0];
        let iters = newton.solve(sys.transient(), &mut state, &[0.0], None).unwrap();
        assert_eq!(iters, 1);
        assert_relative_eq!(state[0], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_nonlinear_converges() {
        // x² - 2 = 0
        let sys = system(vec![x() * x() - Expr::constant(2.0)], &["x"]);
        let mut newton = NewtonSolver::new(sys.size(), sys.scratch_len());
        let mut state = [1.0];
        let iters = newton.solve(sys.transient(), &mut state, &[0.0], None).unwrap();
        assert!(iters > 1);
        assert_relative_eq!(state[0], 2.0f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_failure_leaves_state_untouched() {
        // x² + 1 = 0 has no real root
        let sys = system(vec![x() * x() + Expr::constant(1.0)], &["x"]);
        let mut newton = NewtonSolver::new(sys.size(), sys.scratch_len()).with_limits(5, 1e-12, 1e-12);
        let mut state = [0.5];
        let err = newton.solve(sys.transient(), &mut state, &[0.0], None).unwrap_err();
        assert!(err.is_step_failure());
        assert_eq!(state[0], 0.5);
    }

    #[test]
    fn test_expired_deadline() {
        let sys = system(vec![x() * x() - Expr::constant(2.0)], &["x"]);
        let mut newton = NewtonSolver::new(sys.size(), sys.scratch_len());
        let mut state = [1.0];
        let err = newton
            .solve(sys.transient(), &mut state, &[0.0], Some(Instant::now()))
            .unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded { iterations: 0 }));
    }
}

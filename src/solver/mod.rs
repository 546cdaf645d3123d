//! Numerical engine: discretization, compilation and the per-sample solve.
//!
//! A published circuit goes through three stages:
//!
//! 1. [`discretize`] replaces every `d/dt` marker by the companion model of
//!    the chosen [`Integration`] rule, introducing history knowns.
//! 2. [`EquationSystem`] compiles residuals, symbolic Jacobian entries,
//!    outputs and history updates into flat tapes.
//! 3. [`Simulator`] drives one [`NewtonSolver`] solve per sample and updates
//!    the history after each converged step.
//!
//! For each step with `h = 1/sample_rate` the solver finds `x` with
//!
//! ```text
//! F(x; t, in, hv, hd) = 0
//! ```
//!
//! where `in` are the audio inputs and `hv`/`hd` the history of the previous
//! step. Linear systems have a constant Jacobian and are factored once.

pub mod discretize;
pub mod lu;
mod newton;
mod simulator;
mod system;

pub use discretize::{discretize, steady_state, Integration};
pub use lu::LuSolver;
pub use newton::NewtonSolver;
pub use simulator::{FallbackPolicy, SimulationState, Simulator, SimulatorConfig};
pub use system::{EquationSystem, Equations, FlatOp, Operand, Tape};

/// Default absolute convergence tolerance for Newton-Raphson iteration.
pub const DEFAULT_ABS_TOLERANCE: f64 = 1e-9;

/// Default relative convergence tolerance for Newton-Raphson iteration.
pub const DEFAULT_REL_TOLERANCE: f64 = 1e-6;

/// Maximum Newton-Raphson iterations per time step.
pub const MAX_ITERATIONS: usize = 50;

/// Iteration limit for the DC operating point, which starts from zero.
pub const DC_MAX_ITERATIONS: usize = 200;

/// Minimum conductance to prevent singular matrix.
pub const MIN_CONDUCTANCE: f64 = 1e-12;

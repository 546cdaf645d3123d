//! Main simulator interface.

use std::time::{Duration, Instant};

use crate::circuit::Circuit;
use crate::diagnostics::{Diagnostic, Diagnostics, TracingDiagnostics};
use crate::error::{Error, Result};

use super::newton::NewtonSolver;
use super::system::{EquationSystem, TIME_SLOT};
use super::{Integration, DC_MAX_ITERATIONS, DEFAULT_ABS_TOLERANCE, DEFAULT_REL_TOLERANCE, MAX_ITERATIONS};

/// What a step emits when it has no solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Repeat the last good output frame
    #[default]
    HoldPrevious,
    /// Emit zeros
    Silence,
}

impl std::str::FromStr for FallbackPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hold" | "hold-previous" | "hold_previous" => Ok(FallbackPolicy::HoldPrevious),
            "silence" | "zero" => Ok(FallbackPolicy::Silence),
            other => Err(Error::InvalidSimulationParam {
                message: format!("unknown fallback policy '{other}'"),
            }),
        }
    }
}

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Maximum Newton-Raphson iterations per step.
    pub max_iterations: usize,
    /// Absolute convergence tolerance.
    pub abs_tolerance: f64,
    /// Convergence tolerance relative to each unknown's magnitude.
    pub rel_tolerance: f64,
    /// Integration rule for energy-storage elements.
    pub integration: Integration,
    /// Output of a step that fails to solve.
    pub fallback: FallbackPolicy,
    /// Wall-clock budget per step as a fraction of the sample period.
    /// `None` disables the deadline.
    pub deadline_margin: Option<f64>,
    /// Start from the DC operating point instead of the zero state.
    pub dc_initialize: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            abs_tolerance: DEFAULT_ABS_TOLERANCE,
            rel_tolerance: DEFAULT_REL_TOLERANCE,
            integration: Integration::default(),
            fallback: FallbackPolicy::default(),
            deadline_margin: None,
            dc_initialize: true,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum Newton-Raphson iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the absolute convergence tolerance.
    ///
    /// Higher tolerance = fewer iterations, less accuracy.
    /// - 1e-9 (default): precise, nonlinear stages may need more iterations
    /// - 1e-6: plenty for audio output
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.abs_tolerance = tolerance;
        self
    }

    pub fn with_rel_tolerance(mut self, tolerance: f64) -> Self {
        self.rel_tolerance = tolerance;
        self
    }

    pub fn with_integration(mut self, integration: Integration) -> Self {
        self.integration = integration;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Give each step `margin · h` of wall-clock time.
    pub fn with_deadline_margin(mut self, margin: f64) -> Self {
        self.deadline_margin = Some(margin);
        self
    }

    pub fn with_dc_initialize(mut self, enabled: bool) -> Self {
        self.dc_initialize = enabled;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidSimulationParam {
                message: "max_iterations must be at least 1".into(),
            });
        }
        if !(self.abs_tolerance > 0.0 && self.rel_tolerance >= 0.0) {
            return Err(Error::InvalidSimulationParam {
                message: format!(
                    "tolerances must be positive (abs {}, rel {})",
                    self.abs_tolerance, self.rel_tolerance
                ),
            });
        }
        if let Some(margin) = self.deadline_margin {
            if !(margin.is_finite() && margin > 0.0) {
                return Err(Error::InvalidSimulationParam {
                    message: format!("deadline margin must be positive, got {margin}"),
                });
            }
        }
        Ok(())
    }
}

/// Everything that changes from one step to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    /// Last solved unknowns, the initial guess of the next step
    pub solution: Vec<f64>,
    /// Previous value of each differentiated quantity
    pub history_value: Vec<f64>,
    /// Previous derivative of each differentiated quantity
    pub history_derivative: Vec<f64>,
    /// Completed steps, including failed ones
    pub step: u64,
    /// Last output frame produced by a converged step
    pub last_output: Vec<f64>,
}

impl SimulationState {
    fn zeroed(system: &EquationSystem) -> Self {
        Self {
            solution: vec![0.0; system.size()],
            history_value: vec![0.0; system.history_count()],
            history_derivative: vec![0.0; system.history_count()],
            step: 0,
            last_output: vec![0.0; system.output_count()],
        }
    }
}

/// The per-sample drive loop for one published equation system.
pub struct Simulator {
    system: EquationSystem,
    config: SimulatorConfig,
    state: SimulationState,
    /// State after initialization, restored by `reset`
    initial: SimulationState,
    newton: NewtonSolver,
    params: Vec<f64>,
    output_frame: Vec<f64>,
    diagnostics: Box<dyn Diagnostics>,
    /// Sample period
    h: f64,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("unknowns", &self.system.size())
            .field("sample_rate", &self.system.sample_rate())
            .field("step", &self.state.step)
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// Build a simulator for `circuit` with default configuration, reporting
    /// through `tracing`.
    pub fn new(circuit: &Circuit, sample_rate: f64) -> Result<Self> {
        Self::with_config(circuit, sample_rate, SimulatorConfig::default())
    }

    /// Build a simulator for `circuit`, reporting through `tracing`.
    pub fn with_config(circuit: &Circuit, sample_rate: f64, config: SimulatorConfig) -> Result<Self> {
        Self::build(circuit, sample_rate, config, Box::new(TracingDiagnostics))
    }

    /// Assemble, compile and initialize `circuit`.
    pub fn build(
        circuit: &Circuit,
        sample_rate: f64,
        config: SimulatorConfig,
        mut diagnostics: Box<dyn Diagnostics>,
    ) -> Result<Self> {
        config.validate()?;
        let system = EquationSystem::build(circuit, sample_rate, config.integration, diagnostics.as_mut())?;
        Self::from_system(system, config, diagnostics)
    }

    /// Initialize a simulator for an already compiled system.
    pub fn from_system(
        system: EquationSystem,
        config: SimulatorConfig,
        diagnostics: Box<dyn Diagnostics>,
    ) -> Result<Self> {
        config.validate()?;
        let newton = NewtonSolver::new(system.size(), system.scratch_len()).with_limits(
            config.max_iterations,
            config.abs_tolerance,
            config.rel_tolerance,
        );
        let state = SimulationState::zeroed(&system);
        let mut sim = Self {
            params: vec![0.0; system.param_count()],
            output_frame: vec![0.0; system.output_count()],
            h: 1.0 / system.sample_rate(),
            initial: state.clone(),
            state,
            newton,
            config,
            system,
            diagnostics,
        };
        sim.initialize();
        Ok(sim)
    }

    /// Find the starting state: the DC operating point, or zero.
    fn initialize(&mut self) {
        let mut state = SimulationState::zeroed(&self.system);
        if self.config.dc_initialize && !self.solve_operating_point(&mut state.solution) {
            self.diagnostics.report(Diagnostic::DcFallback);
            state.solution.fill(0.0);
        }
        self.params.fill(0.0);
        let temps = self.newton.temps_mut();
        for (k, tape) in self.system.history_values().iter().enumerate() {
            state.history_value[k] = tape.eval(&state.solution, &self.params, temps);
        }
        self.state = state;
        self.load_history();
        self.evaluate_outputs();
        self.state.last_output.copy_from_slice(&self.output_frame);
        self.initial = self.state.clone();
    }

    fn solve_operating_point(&mut self, solution: &mut [f64]) -> bool {
        self.params.fill(0.0);
        self.newton.invalidate();
        self.newton.max_iterations = DC_MAX_ITERATIONS.max(self.config.max_iterations);
        let solved = self
            .newton
            .solve(self.system.steady(), solution, &self.params, None)
            .is_ok();
        self.newton.max_iterations = self.config.max_iterations;
        self.newton.invalidate();
        solved
    }

    fn load_history(&mut self) {
        for k in 0..self.system.history_count() {
            self.params[self.system.history_value_slot(k)] = self.state.history_value[k];
            self.params[self.system.history_derivative_slot(k)] = self.state.history_derivative[k];
        }
    }

    fn evaluate_outputs(&mut self) {
        let temps = self.newton.temps_mut();
        for (out, tape) in self.output_frame.iter_mut().zip(self.system.outputs()) {
            *out = tape.eval(&self.state.solution, &self.params, temps);
        }
    }

    /// Advance one sample with the inputs already in `params`. The result is
    /// left in `output_frame`.
    fn advance(&mut self) -> Result<usize> {
        let n = self.state.step;
        self.state.step += 1;
        self.params[TIME_SLOT] = (n + 1) as f64 * self.h;
        self.load_history();

        let deadline = self
            .config
            .deadline_margin
            .map(|margin| Instant::now() + Duration::from_secs_f64(margin * self.h));

        match self
            .newton
            .solve(self.system.transient(), &mut self.state.solution, &self.params, deadline)
        {
            Ok(iterations) => {
                self.evaluate_outputs();
                self.update_history();
                self.state.last_output.copy_from_slice(&self.output_frame);
                Ok(iterations)
            }
            Err(err) => {
                match self.config.fallback {
                    FallbackPolicy::HoldPrevious => self.output_frame.copy_from_slice(&self.state.last_output),
                    FallbackPolicy::Silence => self.output_frame.fill(0.0),
                }
                match err {
                    Error::ConvergenceFailure { iterations, residual } => {
                        self.diagnostics.report(Diagnostic::ConvergenceFailure {
                            step: n,
                            iterations,
                            residual,
                        });
                    }
                    Error::DeadlineExceeded { iterations } => {
                        self.diagnostics
                            .report(Diagnostic::DeadlineExceeded { step: n, iterations });
                    }
                    _ => {}
                }
                Err(err)
            }
        }
    }

    /// `hd[k] ← companion(x)`, then `hv[k] ← e(x)`.
    fn update_history(&mut self) {
        let temps = self.newton.temps_mut();
        let x = &self.state.solution;
        for k in 0..self.system.history_count() {
            let derivative = self.system.history_derivatives()[k].eval(x, &self.params, temps);
            let value = self.system.history_values()[k].eval(x, &self.params, temps);
            self.state.history_derivative[k] = derivative;
            self.state.history_value[k] = value;
        }
    }

    /// Step the simulation by one sample.
    ///
    /// Inputs are read in port-number order (missing channels are 0); outputs
    /// are written in port-number order (extra channels are zeroed). An output
    /// frame is produced even when the step fails: the error is returned after
    /// the fallback output has been written.
    pub fn step(&mut self, input: &[f64], output: &mut [f64]) -> Result<usize> {
        for i in 0..self.system.input_count() {
            self.params[self.system.input_slot(i)] = input.get(i).copied().unwrap_or(0.0);
        }
        let result = self.advance();
        self.write_frame(output);
        result
    }

    fn write_frame(&self, output: &mut [f64]) {
        for (i, out) in output.iter_mut().enumerate() {
            *out = self.output_frame.get(i).copied().unwrap_or(0.0);
        }
    }

    /// Process a block of mono samples: first input port in, first output
    /// port out. Failed steps emit their fallback sample.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        let has_input = self.system.input_count() > 0;
        for (sample, out) in input.iter().zip(output.iter_mut()) {
            if has_input {
                self.params[self.system.input_slot(0)] = f64::from(*sample);
            }
            let _ = self.advance();
            *out = self.output_frame.first().copied().unwrap_or(0.0) as f32;
        }
    }

    /// Process interleaved frames with one channel per input and output port.
    pub fn process_interleaved(&mut self, input: &[f32], output: &mut [f32]) {
        let (inputs, outputs) = (self.system.input_count(), self.system.output_count());
        self.process_frames(input, inputs, output, outputs);
    }

    /// Process interleaved frames with explicit channel counts. Channels are
    /// mapped to ports in port-number order.
    pub fn process_frames(&mut self, input: &[f32], in_channels: usize, output: &mut [f32], out_channels: usize) {
        let frames = if in_channels > 0 {
            input.len() / in_channels
        } else {
            output.len() / out_channels.max(1)
        };
        let used_inputs = in_channels.min(self.system.input_count());
        for frame in 0..frames {
            for i in 0..self.system.input_count() {
                let value = if i < used_inputs {
                    f64::from(input[frame * in_channels + i])
                } else {
                    0.0
                };
                self.params[self.system.input_slot(i)] = value;
            }
            let _ = self.advance();
            if out_channels == 0 {
                continue;
            }
            let Some(dst) = output.get_mut(frame * out_channels..(frame + 1) * out_channels) else {
                break;
            };
            for (c, out) in dst.iter_mut().enumerate() {
                *out = self.output_frame.get(c).copied().unwrap_or(0.0) as f32;
            }
        }
    }

    /// Return to the state right after initialization.
    pub fn reset(&mut self) {
        self.state.clone_from(&self.initial);
        self.output_frame.copy_from_slice(&self.initial.last_output);
    }

    /// Current value of an unknown by name, e.g. `V[out]` or `I[L1]`.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.system
            .unknown_index(name)
            .map(|i| self.state.solution[i])
    }

    /// Voltage of a top-level node.
    pub fn node_voltage(&self, node: &str) -> Option<f64> {
        self.value(&format!("V[{node}]"))
    }

    pub fn sample_rate(&self) -> f64 {
        self.system.sample_rate()
    }

    pub fn sample_period(&self) -> f64 {
        self.h
    }

    pub fn input_count(&self) -> usize {
        self.system.input_count()
    }

    pub fn output_count(&self) -> usize {
        self.system.output_count()
    }

    pub fn system(&self) -> &EquationSystem {
        &self.system
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Replace the diagnostics sink.
    pub fn set_diagnostics(&mut self, diagnostics: Box<dyn Diagnostics>) {
        self.diagnostics = diagnostics;
    }
}

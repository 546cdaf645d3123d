//! Compiled, immutable equation systems.
//!
//! Publishing a circuit compiles its assembled symbolic system into flat
//! evaluation tapes: one per residual, one per structurally non-zero Jacobian
//! entry (from symbolic derivatives), one per output and two per history
//! slot. Tapes read unknowns from the solution vector and everything known
//! before a step from a parameter vector laid out as
//!
//! ```text
//! [ t | in[0..m] | hv[0..k] | hd[0..k] ]
//! ```
//!
//! Evaluation only writes into a caller-provided scratch buffer, so it never
//! allocates.

use std::collections::HashMap;

use crate::analysis::{assemble, Assembly};
use crate::circuit::{Circuit, ScopeId};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::expr::{Expr, Func, Symbol};

use super::discretize::{discretize, history_derivative, history_value, steady_state, Integration};
use super::lu::LuSolver;

/// Where a flat operation reads a value from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Unknown(usize),
    Param(usize),
    Immediate(f64),
    Temp(usize),
}

/// One flattened operation. Its result goes to the temp slot of its index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlatOp {
    Add(Operand, Operand),
    Sub(Operand, Operand),
    Mul(Operand, Operand),
    Div(Operand, Operand),
    Neg(Operand),
    Call(Func, Operand),
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Tape {
    ops: Vec<FlatOp>,
    result: Operand,
}

/// Symbol to slot mapping used while compiling.
struct SlotMap {
    unknowns: HashMap<Symbol, usize>,
    params: HashMap<Symbol, usize>,
}

impl SlotMap {
    fn unknown(&self, symbol: &Symbol) -> Result<Operand> {
        self.unknowns
            .get(symbol)
            .map(|&i| Operand::Unknown(i))
            .ok_or_else(|| Error::structural(format!("'{symbol}' is not an unknown of this system")))
    }

    fn known(&self, symbol: &Symbol) -> Result<Operand> {
        self.params
            .get(symbol)
            .map(|&i| Operand::Param(i))
            .ok_or_else(|| Error::structural(format!("'{symbol}' is not a known of this system")))
    }
}

/// Parameter slot of the simulation time.
pub const TIME_SLOT: usize = 0;

impl Tape {
    fn compile(expr: &Expr, slots: &SlotMap) -> Result<Self> {
        let mut ops = Vec::new();
        let result = Self::emit(expr, slots, &mut ops)?;
        Ok(Self { ops, result })
    }

    fn push(ops: &mut Vec<FlatOp>, op: FlatOp) -> Operand {
        ops.push(op);
        Operand::Temp(ops.len() - 1)
    }

    fn emit(expr: &Expr, slots: &SlotMap, ops: &mut Vec<FlatOp>) -> Result<Operand> {
        match expr {
            Expr::Const(v) => Ok(Operand::Immediate(*v)),
            Expr::Time => Ok(Operand::Param(TIME_SLOT)),
            Expr::Unknown(s) => slots.unknown(s),
            Expr::Known(s) => slots.known(s),
            Expr::Add(terms) => {
                let mut acc: Option<Operand> = None;
                for term in terms {
                    acc = Some(match (acc, term) {
                        (None, t) => Self::emit(t, slots, ops)?,
                        (Some(a), Expr::Neg(inner)) => {
                            let b = Self::emit(inner, slots, ops)?;
                            Self::push(ops, FlatOp::Sub(a, b))
                        }
                        (Some(a), t) => {
                            let b = Self::emit(t, slots, ops)?;
                            Self::push(ops, FlatOp::Add(a, b))
                        }
                    });
                }
                Ok(acc.unwrap_or(Operand::Immediate(0.0)))
            }
            Expr::Mul(factors) => {
                let mut acc: Option<Operand> = None;
                for factor in factors {
                    let b = Self::emit(factor, slots, ops)?;
                    acc = Some(match acc {
                        None => b,
                        Some(a) => Self::push(ops, FlatOp::Mul(a, b)),
                    });
                }
                Ok(acc.unwrap_or(Operand::Immediate(1.0)))
            }
            Expr::Div(a, b) => {
                let a = Self::emit(a, slots, ops)?;
                let b = Self::emit(b, slots, ops)?;
                Ok(Self::push(ops, FlatOp::Div(a, b)))
            }
            Expr::Neg(a) => {
                let a = Self::emit(a, slots, ops)?;
                Ok(Self::push(ops, FlatOp::Neg(a)))
            }
            Expr::Call(func, a) => {
                let a = Self::emit(a, slots, ops)?;
                Ok(Self::push(ops, FlatOp::Call(*func, a)))
            }
            Expr::Ddt(_) => Err(Error::structural(format!(
                "time derivative '{expr}' left after discretization"
            ))),
            Expr::ValueOf(probe, _) => Err(Error::unresolved(
                probe.to_string(),
                "reference left after resolution",
            )),
        }
    }

    /// Number of temp slots needed to evaluate this tape.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Evaluate with unknowns `x`, parameters `p` and a scratch buffer of at
    /// least [`Tape::len`] slots.
    #[inline]
    pub fn eval(&self, x: &[f64], p: &[f64], temps: &mut [f64]) -> f64 {
        #[inline(always)]
        fn read(op: Operand, x: &[f64], p: &[f64], temps: &[f64]) -> f64 {
            match op {
                Operand::Unknown(i) => x[i],
                Operand::Param(i) => p[i],
                Operand::Immediate(v) => v,
                Operand::Temp(i) => temps[i],
            }
        }

        for (i, op) in self.ops.iter().enumerate() {
            temps[i] = match *op {
                FlatOp::Add(a, b) => read(a, x, p, temps) + read(b, x, p, temps),
                FlatOp::Sub(a, b) => read(a, x, p, temps) - read(b, x, p, temps),
                FlatOp::Mul(a, b) => read(a, x, p, temps) * read(b, x, p, temps),
                FlatOp::Div(a, b) => read(a, x, p, temps) / read(b, x, p, temps),
                FlatOp::Neg(a) => -read(a, x, p, temps),
                FlatOp::Call(f, a) => f.apply(read(a, x, p, temps)),
            };
        }
        read(self.result, x, p, temps)
    }
}

/// A structurally non-zero entry of the Jacobian.
#[derive(Debug, Clone, PartialEq)]
pub struct JacobianEntry {
    pub row: usize,
    pub col: usize,
    tape: Tape,
}

/// Residuals and Jacobian of one square system `F(x) = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equations {
    residuals: Vec<Tape>,
    jacobian: Vec<JacobianEntry>,
    linear: bool,
}

impl Equations {
    fn compile(residuals: &[Expr], slots: &SlotMap) -> Result<Self> {
        let mut tapes = Vec::with_capacity(residuals.len());
        let mut jacobian = Vec::new();
        let mut linear = true;
        for (row, residual) in residuals.iter().enumerate() {
            tapes.push(Tape::compile(residual, slots)?);
            for symbol in residual.unknowns() {
                let col = slots.unknowns[symbol];
                let derivative = residual.derivative(symbol);
                if derivative.is_zero() {
                    continue;
                }
                linear &= derivative.is_constant();
                jacobian.push(JacobianEntry {
                    row,
                    col,
                    tape: Tape::compile(&derivative, slots)?,
                });
            }
        }
        jacobian.sort_by_key(|e| (e.row, e.col));
        Ok(Self {
            residuals: tapes,
            jacobian,
            linear,
        })
    }

    pub fn size(&self) -> usize {
        self.residuals.len()
    }

    /// Whether the Jacobian is constant, so one factorization serves every step.
    pub fn is_linear(&self) -> bool {
        self.linear
    }

    fn max_tape_len(&self) -> usize {
        self.residuals
            .iter()
            .map(Tape::len)
            .chain(self.jacobian.iter().map(|e| e.tape.len()))
            .max()
            .unwrap_or(0)
    }

    /// Evaluate `F(x)` into `out`.
    pub fn residuals(&self, x: &[f64], p: &[f64], temps: &mut [f64], out: &mut [f64]) {
        for (r, tape) in out.iter_mut().zip(&self.residuals) {
            *r = tape.eval(x, p, temps);
        }
    }

    /// Evaluate the row-major Jacobian `∂F/∂x` into `out`.
    pub fn jacobian(&self, x: &[f64], p: &[f64], temps: &mut [f64], out: &mut [f64]) {
        let n = self.size();
        out.fill(0.0);
        for entry in &self.jacobian {
            out[entry.row * n + entry.col] = entry.tape.eval(x, p, temps);
        }
    }
}

/// The compiled, immutable form of a circuit for one sample rate.
#[derive(Debug, Clone)]
pub struct EquationSystem {
    origin: Option<(ScopeId, u64)>,
    unknowns: Vec<Symbol>,
    labels: Vec<String>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    transient: Equations,
    steady: Equations,
    outputs: Vec<Tape>,
    history_values: Vec<Tape>,
    history_derivatives: Vec<Tape>,
    integration: Integration,
    sample_rate: f64,
    scratch_len: usize,
}

impl EquationSystem {
    /// Assemble, discretize and compile `circuit`.
    pub fn build(
        circuit: &Circuit,
        sample_rate: f64,
        integration: Integration,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Self> {
        let assembly = assemble(circuit, diagnostics)?;
        let mut system = Self::compile(&assembly, sample_rate, integration)?;
        system.origin = Some((circuit.scope(), circuit.revision()));
        diagnostics.report(Diagnostic::Published {
            unknowns: system.size(),
            linear: system.is_linear(),
        });
        Ok(system)
    }

    /// Discretize and compile an assembled system.
    pub fn compile(assembly: &Assembly, sample_rate: f64, integration: Integration) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::InvalidSimulationParam {
                message: format!("sample rate must be positive, got {sample_rate}"),
            });
        }
        let h = 1.0 / sample_rate;

        let residuals: Vec<Expr> = assembly.equations.iter().map(|e| e.residual.clone()).collect();
        let outputs: Vec<Expr> = assembly.outputs.iter().map(|o| o.expr.clone()).collect();
        let discrete = discretize(&residuals, &outputs, integration, h);

        let m = assembly.inputs.len();
        let k = discrete.slots.len();
        let mut params = HashMap::with_capacity(1 + m + 2 * k);
        for (i, input) in assembly.inputs.iter().enumerate() {
            params.insert(input.symbol.clone(), 1 + i);
        }
        for slot in 0..k {
            params.insert(history_value(slot), 1 + m + slot);
            params.insert(history_derivative(slot), 1 + m + k + slot);
        }
        let slots = SlotMap {
            unknowns: assembly
                .unknowns
                .iter()
                .enumerate()
                .map(|(i, s)| (s.clone(), i))
                .collect(),
            params,
        };

        let transient = Equations::compile(&discrete.residuals, &slots)?;
        let steady_residuals: Vec<Expr> = residuals.iter().map(steady_state).collect();
        let steady = Equations::compile(&steady_residuals, &slots)?;
        let outputs = discrete
            .outputs
            .iter()
            .map(|e| Tape::compile(e, &slots))
            .collect::<Result<Vec<_>>>()?;
        let history_values = discrete
            .slots
            .iter()
            .map(|s| Tape::compile(&s.value, &slots))
            .collect::<Result<Vec<_>>>()?;
        let history_derivatives = discrete
            .slots
            .iter()
            .map(|s| Tape::compile(&s.derivative, &slots))
            .collect::<Result<Vec<_>>>()?;

        let scratch_len = [
            transient.max_tape_len(),
            steady.max_tape_len(),
            outputs.iter().map(Tape::len).max().unwrap_or(0),
            history_values.iter().map(Tape::len).max().unwrap_or(0),
            history_derivatives.iter().map(Tape::len).max().unwrap_or(0),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);

        let system = Self {
            origin: None,
            unknowns: assembly.unknowns.clone(),
            labels: assembly.equations.iter().map(|e| e.label.clone()).collect(),
            input_names: assembly.inputs.iter().map(|i| i.name.clone()).collect(),
            output_names: assembly.outputs.iter().map(|o| o.name.clone()).collect(),
            transient,
            steady,
            outputs,
            history_values,
            history_derivatives,
            integration,
            sample_rate,
            scratch_len,
        };
        system.check_numeric()?;
        Ok(system)
    }

    /// A linear system must have a non-singular (constant) Jacobian.
    fn check_numeric(&self) -> Result<()> {
        if !self.transient.is_linear() || self.size() == 0 {
            return Ok(());
        }
        let n = self.size();
        let x = vec![0.0; n];
        let p = vec![0.0; self.param_count()];
        let mut temps = vec![0.0; self.scratch_len];
        let mut j = vec![0.0; n * n];
        self.transient.jacobian(&x, &p, &mut temps, &mut j);
        LuSolver::new(n).factor(&j).map_err(|e| {
            Error::singular(format!(
                "system matrix is singular at unknown '{}'",
                self.unknowns[e.column]
            ))
        })
    }

    /// Whether `circuit` changed (or is another circuit) since this system was built.
    pub fn is_stale(&self, circuit: &Circuit) -> bool {
        self.origin != Some((circuit.scope(), circuit.revision()))
    }

    pub fn size(&self) -> usize {
        self.unknowns.len()
    }

    pub fn unknowns(&self) -> &[Symbol] {
        &self.unknowns
    }

    /// Position of an unknown by name, e.g. `V[out]`.
    pub fn unknown_index(&self, name: &str) -> Option<usize> {
        self.unknowns.iter().position(|s| s.as_str() == name)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    pub fn input_count(&self) -> usize {
        self.input_names.len()
    }

    pub fn output_count(&self) -> usize {
        self.output_names.len()
    }

    pub fn history_count(&self) -> usize {
        self.history_values.len()
    }

    pub fn is_linear(&self) -> bool {
        self.transient.is_linear()
    }

    pub fn integration(&self) -> Integration {
        self.integration
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Length of the parameter vector.
    pub fn param_count(&self) -> usize {
        1 + self.input_count() + 2 * self.history_count()
    }

    /// Scratch slots needed by any tape of this system.
    pub fn scratch_len(&self) -> usize {
        self.scratch_len
    }

    pub fn input_slot(&self, i: usize) -> usize {
        1 + i
    }

    pub fn history_value_slot(&self, k: usize) -> usize {
        1 + self.input_count() + k
    }

    pub fn history_derivative_slot(&self, k: usize) -> usize {
        1 + self.input_count() + self.history_count() + k
    }

    /// Equations of one transient step.
    pub fn transient(&self) -> &Equations {
        &self.transient
    }

    /// Equations of the DC operating point (all derivatives zero).
    pub fn steady(&self) -> &Equations {
        &self.steady
    }

    pub(crate) fn outputs(&self) -> &[Tape] {
        &self.outputs
    }

    pub(crate) fn history_values(&self) -> &[Tape] {
        &self.history_values
    }

    pub(crate) fn history_derivatives(&self) -> &[Tape] {
        &self.history_derivatives
    }
}

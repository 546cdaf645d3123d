//! Voltage and current sources, independent and dependent.

use std::f64::consts::TAU;

use super::{finite, terminals};
use crate::analysis::Stamp;
use crate::circuit::Terminal;
use crate::error::Result;
use crate::expr::{Expr, Probe, Quantity};

/// Time dependence of an independent source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Dc(f64),
    /// `offset + amplitude * sin(2π·frequency·t)`
    Sine {
        offset: f64,
        amplitude: f64,
        frequency: f64,
    },
}

impl Waveform {
    /// Source value as an expression of simulation time.
    pub fn expr(&self) -> Expr {
        match *self {
            Waveform::Dc(v) => Expr::constant(v),
            Waveform::Sine {
                offset,
                amplitude,
                frequency,
            } => {
                let phase = Expr::constant(TAU * frequency) * Expr::Time;
                Expr::constant(offset) + Expr::constant(amplitude) * phase.sin()
            }
        }
    }

    /// Source value at time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        match *self {
            Waveform::Dc(v) => v,
            Waveform::Sine {
                offset,
                amplitude,
                frequency,
            } => offset + amplitude * (TAU * frequency * t).sin(),
        }
    }

    fn check(&self, component: &str) -> Result<()> {
        match *self {
            Waveform::Dc(v) => finite(component, "value", v).map(drop),
            Waveform::Sine {
                offset,
                amplitude,
                frequency,
            } => {
                finite(component, "offset", offset)?;
                finite(component, "amplitude", amplitude)?;
                finite(component, "frequency", frequency)?;
                Ok(())
            }
        }
    }
}

/// A voltage source component.
///
/// Voltage sources add a branch-current unknown. The source enforces:
/// V+ - V- = V_source
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub name: String,
    pub waveform: Waveform,
    pub(crate) terminals: [Terminal; 2],
}

impl VoltageSource {
    pub fn new(name: impl Into<String>, waveform: Waveform) -> Self {
        Self {
            name: name.into(),
            waveform,
            terminals: terminals(["p", "n"]),
        }
    }

    /// A constant voltage source.
    pub fn dc(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, Waveform::Dc(value))
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        self.waveform.check(&self.name)?;
        let i = s.branch_current()?;
        let v = s.across(0, 1);
        s.equation(v - self.waveform.expr());
        s.through(i.clone());
        s.define_two_terminal(i);
        Ok(())
    }
}

/// A current source component. Current flows from + to - through the source.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub name: String,
    pub waveform: Waveform,
    pub(crate) terminals: [Terminal; 2],
}

impl CurrentSource {
    pub fn new(name: impl Into<String>, waveform: Waveform) -> Self {
        Self {
            name: name.into(),
            waveform,
            terminals: terminals(["p", "n"]),
        }
    }

    /// A constant current source.
    pub fn dc(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, Waveform::Dc(value))
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        self.waveform.check(&self.name)?;
        let i = self.waveform.expr();
        s.through(i.clone());
        s.define_two_terminal(i);
        Ok(())
    }
}

/// A voltage source controlled by another component's voltage or current:
/// `V+ - V- = gain * control`.
#[derive(Debug, Clone)]
pub struct DependentVoltageSource {
    pub name: String,
    pub control: Probe,
    pub gain: f64,
    pub(crate) terminals: [Terminal; 2],
}

impl DependentVoltageSource {
    pub fn new(name: impl Into<String>, control: Probe, gain: f64) -> Self {
        Self {
            name: name.into(),
            control,
            gain,
            terminals: terminals(["p", "n"]),
        }
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        let gain = finite(&self.name, "gain", self.gain)?;
        let i = s.branch_current()?;
        let v = s.across(0, 1);
        let control = s.reference(&self.control);
        s.equation(v - Expr::constant(gain) * control);
        s.through(i.clone());
        s.define_two_terminal(i);
        Ok(())
    }
}

/// A current source controlled by another component's voltage or current:
/// `i = gain * control`.
#[derive(Debug, Clone)]
pub struct DependentCurrentSource {
    pub name: String,
    pub control: Probe,
    pub gain: f64,
    pub(crate) terminals: [Terminal; 2],
}

impl DependentCurrentSource {
    pub fn new(name: impl Into<String>, control: Probe, gain: f64) -> Self {
        Self {
            name: name.into(),
            control,
            gain,
            terminals: terminals(["p", "n"]),
        }
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        let gain = finite(&self.name, "gain", self.gain)?;
        let i = Expr::constant(gain) * s.reference(&self.control);
        s.through(i.clone());
        let v = s.across(0, 1);
        s.define(Quantity::Voltage, v);
        s.define(Quantity::Current, i);
        Ok(())
    }
}

//! Linear passive components: Resistor, Capacitor, Inductor.

use super::{positive, terminals};
use crate::analysis::Stamp;
use crate::circuit::Terminal;
use crate::error::Result;
use crate::expr::{Expr, Quantity};

/// A resistor: `i = (v_p - v_n) / R`.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub name: String,
    pub resistance: f64,
    pub(crate) terminals: [Terminal; 2],
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(name: impl Into<String>, resistance: f64) -> Self {
        Self {
            name: name.into(),
            resistance,
            terminals: terminals(["p", "n"]),
        }
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        let r = positive(&self.name, "resistance", self.resistance)?;
        let i = s.across(0, 1) / Expr::constant(r);
        s.through(i.clone());
        s.define_two_terminal(i);
        Ok(())
    }
}

/// A capacitor: `i = C * d(v_p - v_n)/dt`.
///
/// The time derivative is left symbolic; discretization turns it into the
/// companion model of the configured integration rule.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub name: String,
    pub capacitance: f64,
    pub(crate) terminals: [Terminal; 2],
}

impl Capacitor {
    /// Create a new capacitor.
    pub fn new(name: impl Into<String>, capacitance: f64) -> Self {
        Self {
            name: name.into(),
            capacitance,
            terminals: terminals(["p", "n"]),
        }
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        let c = positive(&self.name, "capacitance", self.capacitance)?;
        let i = Expr::constant(c) * s.across(0, 1).ddt();
        s.through(i.clone());
        s.define_two_terminal(i);
        Ok(())
    }
}

/// An inductor: `v_p - v_n = L * di/dt`, with its current as a branch unknown.
#[derive(Debug, Clone)]
pub struct Inductor {
    pub name: String,
    pub inductance: f64,
    pub(crate) terminals: [Terminal; 2],
}

impl Inductor {
    /// Create a new inductor.
    pub fn new(name: impl Into<String>, inductance: f64) -> Self {
        Self {
            name: name.into(),
            inductance,
            terminals: terminals(["p", "n"]),
        }
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        let l = positive(&self.name, "inductance", self.inductance)?;
        let i = s.branch_current()?;
        let v = s.across(0, 1);
        s.equation(v.clone() - Expr::constant(l) * i.clone().ddt());
        s.through(i.clone());
        s.define(Quantity::Voltage, v);
        s.define(Quantity::Current, i);
        Ok(())
    }
}

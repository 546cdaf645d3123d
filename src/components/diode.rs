//! Diode model.
//!
//! Uses the Shockley diode equation:
//!   I = Is * (exp(V / (n * Vt)) - 1)
//!
//! plus a minimum conductance across the junction. The exponential is the
//! guarded [`Func::Exp`](crate::expr::Func::Exp), which continues linearly
//! far in forward bias so Newton iterates stay finite.

use super::{positive, terminals};
use crate::analysis::Stamp;
use crate::circuit::Terminal;
use crate::error::Result;
use crate::expr::{Expr, Func};
use crate::solver::MIN_CONDUCTANCE;
use crate::THERMAL_VOLTAGE;

/// Parameters for a diode model.
#[derive(Debug, Clone, PartialEq)]
pub struct DiodeParams {
    /// Saturation current (Is), typically 1e-14 to 1e-12 A
    pub is: f64,
    /// Ideality factor (n), typically 1.0 to 2.0
    pub n: f64,
}

impl Default for DiodeParams {
    fn default() -> Self {
        Self { is: 1e-14, n: 1.0 }
    }
}

impl DiodeParams {
    /// Create parameters for a germanium diode (lower forward voltage).
    pub fn germanium() -> Self {
        Self { is: 1e-9, n: 1.5 }
    }

    /// Create parameters for an LED.
    pub fn led() -> Self {
        Self { is: 1e-18, n: 2.0 }
    }

    /// Thermal voltage times ideality factor.
    pub fn n_vt(&self) -> f64 {
        self.n * THERMAL_VOLTAGE
    }
}

/// A diode component.
#[derive(Debug, Clone)]
pub struct Diode {
    pub name: String,
    pub params: DiodeParams,
    pub(crate) terminals: [Terminal; 2],
}

impl Diode {
    /// Create a new diode. Terminals are anode and cathode.
    pub fn new(name: impl Into<String>, params: DiodeParams) -> Self {
        Self {
            name: name.into(),
            params,
            terminals: terminals(["anode", "cathode"]),
        }
    }

    /// Junction current as an expression of the anode-cathode voltage.
    pub fn current_expr(&self, v: Expr) -> Expr {
        let is = Expr::constant(self.params.is);
        let arg = v.clone() / Expr::constant(self.params.n_vt());
        is * (arg.exp() - Expr::constant(1.0)) + Expr::constant(MIN_CONDUCTANCE) * v
    }

    /// Calculate the diode current at a given voltage.
    pub fn current(&self, v: f64) -> f64 {
        self.params.is * (Func::Exp.apply(v / self.params.n_vt()) - 1.0) + MIN_CONDUCTANCE * v
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        positive(&self.name, "is", self.params.is)?;
        positive(&self.name, "n", self.params.n)?;
        let v = s.across(0, 1);
        let i = self.current_expr(v);
        s.through(i.clone());
        s.define_two_terminal(i);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diode_forward_bias() {
        let d = Diode::new("D1", DiodeParams::default());

        // At 0V, current should be approximately 0
        assert!(d.current(0.0).abs() < 1e-10);

        // At forward bias, current should increase exponentially
        let i_small = d.current(0.3);
        let i_large = d.current(0.6);
        assert!(i_large > i_small * 100.0);
    }

    #[test]
    fn test_diode_reverse_bias() {
        let d = Diode::new("D1", DiodeParams::default());

        // In reverse bias, current should approach -Is (plus the leakage conductance)
        let i_rev = d.current(-1.0);
        assert!(i_rev < 0.0);
        assert!(i_rev > -2.0 * MIN_CONDUCTANCE);
    }

    #[test]
    fn test_current_stays_finite_far_forward() {
        let d = Diode::new("D1", DiodeParams::default());
        assert!(d.current(100.0).is_finite());
    }

    #[test]
    fn test_germanium_conducts_earlier() {
        let si = Diode::new("D1", DiodeParams::default());
        let ge = Diode::new("D2", DiodeParams::germanium());
        assert!(ge.current(0.3) > si.current(0.3));
    }
}

//! BJT (Bipolar Junction Transistor) model.
//!
//! Uses the Ebers-Moll transport model for NPN and PNP transistors: two
//! junction diodes plus a transport current between collector and emitter,
//! with an optional Early-effect factor.

use super::{positive, terminals};
use crate::analysis::Stamp;
use crate::circuit::Terminal;
use crate::error::{Error, Result};
use crate::expr::{Expr, Quantity};
use crate::solver::MIN_CONDUCTANCE;
use crate::THERMAL_VOLTAGE;

/// BJT type (NPN or PNP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BjtType {
    Npn,
    Pnp,
}

impl BjtType {
    fn sign(self) -> f64 {
        match self {
            BjtType::Npn => 1.0,
            BjtType::Pnp => -1.0,
        }
    }
}

impl std::str::FromStr for BjtType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "npn" => Ok(BjtType::Npn),
            "pnp" => Ok(BjtType::Pnp),
            other => Err(Error::invalid_parameter(
                "bjt",
                "type",
                format!("expected NPN or PNP, got '{other}'"),
            )),
        }
    }
}

impl std::fmt::Display for BjtType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BjtType::Npn => f.write_str("npn"),
            BjtType::Pnp => f.write_str("pnp"),
        }
    }
}

/// Parameters for a BJT model.
#[derive(Debug, Clone, PartialEq)]
pub struct BjtParams {
    /// Forward current gain (β_F)
    pub beta_f: f64,
    /// Reverse current gain (β_R)
    pub beta_r: f64,
    /// Base-emitter saturation current
    pub is_be: f64,
    /// Base-collector saturation current
    pub is_bc: f64,
    /// Ideality factor
    pub n: f64,
    /// Early voltage (for output resistance), 0 = infinite
    pub va: f64,
}

impl Default for BjtParams {
    fn default() -> Self {
        Self {
            beta_f: 100.0,
            beta_r: 1.0,
            is_be: 1e-14,
            is_bc: 1e-14,
            n: 1.0,
            va: 100.0,
        }
    }
}

impl BjtParams {
    /// Thermal voltage times ideality factor.
    pub fn n_vt(&self) -> f64 {
        self.n * THERMAL_VOLTAGE
    }

    fn check(&self, name: &str) -> Result<()> {
        positive(name, "bf", self.beta_f)?;
        positive(name, "br", self.beta_r)?;
        positive(name, "is_be", self.is_be)?;
        positive(name, "is_bc", self.is_bc)?;
        positive(name, "n", self.n)?;
        if !(self.va.is_finite() && self.va >= 0.0) {
            return Err(Error::invalid_parameter(name, "va", "must be zero or positive"));
        }
        Ok(())
    }
}

/// A BJT component. Terminals are collector, base, emitter.
#[derive(Debug, Clone)]
pub struct Bjt {
    pub name: String,
    pub bjt_type: BjtType,
    pub params: BjtParams,
    pub(crate) terminals: [Terminal; 3],
}

impl Bjt {
    /// Create a new BJT.
    pub fn new(name: impl Into<String>, bjt_type: BjtType, params: BjtParams) -> Self {
        Self {
            name: name.into(),
            bjt_type,
            params,
            terminals: terminals(["c", "b", "e"]),
        }
    }

    /// An NPN transistor with default parameters.
    pub fn npn(name: impl Into<String>) -> Self {
        Self::new(name, BjtType::Npn, BjtParams::default())
    }

    /// A PNP transistor with default parameters.
    pub fn pnp(name: impl Into<String>) -> Self {
        Self::new(name, BjtType::Pnp, BjtParams::default())
    }

    /// Collector and base currents (into the device) for junction voltages
    /// given in the NPN sense.
    fn currents(&self, vbe: Expr, vbc: Expr) -> (Expr, Expr) {
        let p = &self.params;
        let n_vt = Expr::constant(p.n_vt());
        let gmin = Expr::constant(MIN_CONDUCTANCE);
        let one = Expr::constant(1.0);

        let i_f = Expr::constant(p.is_be) * ((vbe.clone() / n_vt.clone()).exp() - one.clone())
            + gmin.clone() * vbe;
        let i_r = Expr::constant(p.is_bc) * ((vbc.clone() / n_vt).exp() - one.clone())
            + gmin * vbc.clone();

        let mut transport = i_f.clone() - i_r.clone();
        if p.va > 0.0 {
            transport = transport * (one - vbc / Expr::constant(p.va));
        }

        let ic = transport - i_r.clone() / Expr::constant(p.beta_r);
        let ib = i_f / Expr::constant(p.beta_f) + i_r / Expr::constant(p.beta_r);
        (ic, ib)
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        self.params.check(&self.name)?;
        let sign = Expr::constant(self.bjt_type.sign());
        let vbe = sign.clone() * s.across(1, 2);
        let vbc = sign.clone() * s.across(1, 0);
        let (ic, ib) = self.currents(vbe, vbc);

        let ic = sign.clone() * ic;
        let ib = sign * ib;
        s.current_into(0, ic.clone());
        s.current_into(1, ib.clone());
        s.current_into(2, -(ic.clone() + ib));
        let v = s.across(1, 2);
        s.define(Quantity::Voltage, v);
        s.define(Quantity::Current, ic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_parsing() {
        assert_eq!("NPN".parse::<BjtType>().unwrap(), BjtType::Npn);
        assert_eq!("pnp".parse::<BjtType>().unwrap(), BjtType::Pnp);
        assert!("nmos".parse::<BjtType>().is_err());
    }

    #[test]
    fn test_terminal_order() {
        let q = Bjt::pnp("Q1");
        let names: Vec<_> = q.terminals.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "e"]);
    }

    #[test]
    fn test_negative_gain_rejected() {
        let mut params = BjtParams::default();
        params.beta_f = -1.0;
        assert!(params.check("Q1").is_err());
    }
}

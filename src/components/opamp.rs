//! Operational Amplifier model.
//!
//! A voltage-controlled source behind an output resistance:
//!   Voc = A * (V+ - V-),  I_out = (Vout - Voc) / R_out
//! with an input resistance between the inputs. When rails are configured the
//! open-circuit output is soft-clipped with `tanh` to the rails minus a fixed
//! headroom, which keeps the model smooth for Newton iteration.

use super::{positive, terminals};
use crate::analysis::Stamp;
use crate::circuit::Terminal;
use crate::error::{Error, Result};
use crate::expr::{Expr, Quantity};

/// Output swing lost to each rail.
pub const RAIL_HEADROOM: f64 = 0.5;

/// Parameters for an op-amp model.
#[derive(Debug, Clone, PartialEq)]
pub struct OpAmpParams {
    /// Open-loop DC gain (A_OL)
    pub gain: f64,
    /// Output resistance (R_out)
    pub r_out: f64,
    /// Input resistance (R_in)
    pub r_in: f64,
    /// Supply rails (negative, positive); `None` for an unbounded linear output
    pub rails: Option<(f64, f64)>,
}

impl Default for OpAmpParams {
    fn default() -> Self {
        Self::ideal()
    }
}

impl OpAmpParams {
    /// Create parameters for an ideal op-amp.
    pub fn ideal() -> Self {
        Self {
            gain: 1e9, // Very high but finite for numerical stability
            r_out: 0.1,
            r_in: 1e12,
            rails: Some((-15.0, 15.0)),
        }
    }

    /// Create parameters for a typical 741-style op-amp.
    pub fn ua741() -> Self {
        Self {
            gain: 2e5, // 200,000 open-loop gain
            r_out: 75.0,
            r_in: 2e6,
            rails: Some((-15.0, 15.0)),
        }
    }

    /// Create parameters for a TL072-style JFET op-amp.
    pub fn tl072() -> Self {
        Self {
            gain: 2e5,
            r_out: 100.0,
            r_in: 1e12,
            rails: Some((-15.0, 15.0)),
        }
    }

    /// The same parameters without output limiting.
    pub fn linear(mut self) -> Self {
        self.rails = None;
        self
    }

    /// Check if this is effectively an ideal op-amp.
    pub fn is_ideal(&self) -> bool {
        self.gain > 1e6
    }

    fn check(&self, name: &str) -> Result<()> {
        positive(name, "gain", self.gain)?;
        positive(name, "rout", self.r_out)?;
        positive(name, "rin", self.r_in)?;
        if let Some((neg, pos)) = self.rails {
            if !(neg.is_finite() && pos.is_finite() && pos - neg > 2.0 * RAIL_HEADROOM) {
                return Err(Error::invalid_parameter(
                    name,
                    "rails",
                    format!("rails ({neg}, {pos}) leave no output swing"),
                ));
            }
        }
        Ok(())
    }
}

/// An operational amplifier component. Terminals are output, non-inverting
/// and inverting input.
#[derive(Debug, Clone)]
pub struct OpAmp {
    pub name: String,
    pub params: OpAmpParams,
    pub(crate) terminals: [Terminal; 3],
}

impl OpAmp {
    /// Create a new op-amp.
    pub fn new(name: impl Into<String>, params: OpAmpParams) -> Self {
        Self {
            name: name.into(),
            params,
            terminals: terminals(["out", "in+", "in-"]),
        }
    }

    /// Open-circuit output voltage for a differential input.
    pub fn open_circuit_output(&self, vd: f64) -> f64 {
        let v = self.params.gain * vd;
        match self.params.rails {
            Some((neg, pos)) => {
                let (center, half) = swing(neg, pos);
                center + half * ((v - center) / half).tanh()
            }
            None => v,
        }
    }

    fn open_circuit_expr(&self, vd: Expr) -> Expr {
        let v = Expr::constant(self.params.gain) * vd;
        match self.params.rails {
            Some((neg, pos)) => {
                let (center, half) = swing(neg, pos);
                let center = Expr::constant(center);
                let half = Expr::constant(half);
                center.clone() + half.clone() * ((v - center) / half).tanh()
            }
            None => v,
        }
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        self.params.check(&self.name)?;
        let vd = s.across(1, 2);
        let vout = s.voltage(0);

        let i_in = vd.clone() / Expr::constant(self.params.r_in);
        s.current_into(1, i_in.clone());
        s.current_into(2, -i_in);

        let voc = self.open_circuit_expr(vd);
        let i_out = (vout.clone() - voc) / Expr::constant(self.params.r_out);
        s.current_into(0, i_out.clone());

        s.define(Quantity::Voltage, vout);
        s.define(Quantity::Current, i_out);
        Ok(())
    }
}

/// Midpoint and half-width of the usable output swing.
fn swing(neg: f64, pos: f64) -> (f64, f64) {
    let lo = neg + RAIL_HEADROOM;
    let hi = pos - RAIL_HEADROOM;
    ((hi + lo) / 2.0, (hi - lo) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_region() {
        let u = OpAmp::new("U1", OpAmpParams::ua741());
        assert_relative_eq!(u.open_circuit_output(1e-7), 0.02, epsilon = 1e-6);
    }

    #[test]
    fn test_output_limited_to_rails() {
        let u = OpAmp::new("U1", OpAmpParams::ua741());
        assert_relative_eq!(u.open_circuit_output(1.0), 14.5, epsilon = 1e-9);
        assert_relative_eq!(u.open_circuit_output(-1.0), -14.5, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_preset_is_unbounded() {
        let u = OpAmp::new("U1", OpAmpParams::tl072().linear());
        assert_relative_eq!(u.open_circuit_output(1.0), 2e5);
    }

    #[test]
    fn test_inverted_rails_rejected() {
        let mut p = OpAmpParams::ua741();
        p.rails = Some((5.0, -5.0));
        assert!(p.check("U1").is_err());
    }
}

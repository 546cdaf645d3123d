//! User-facing controls: a three-terminal potentiometer and a two-state switch.

use super::{positive, terminals};
use crate::analysis::Stamp;
use crate::circuit::Terminal;
use crate::error::{Error, Result};
use crate::expr::{Expr, Quantity};

/// Travel limits of the wiper, keeping both halves of the track non-zero.
const WIPER_MIN: f64 = 0.001;
const WIPER_MAX: f64 = 0.999;

/// Smallest resistance either half of the track is allowed to reach.
const TRACK_FLOOR: f64 = 0.1;

/// Potentiometer as a split resistive track.
///
///   1 ---[position * R]--- wiper ---[(1 - position) * R]--- 2
#[derive(Debug, Clone)]
pub struct Potentiometer {
    pub name: String,
    pub total_resistance: f64,
    /// Wiper travel, 0 at terminal 1 and 1 at terminal 2
    pub position: f64,
    pub(crate) terminals: [Terminal; 3],
}

impl Potentiometer {
    /// `position` is clamped to the wiper's travel.
    pub fn new(name: impl Into<String>, total_resistance: f64, position: f64) -> Self {
        Self {
            name: name.into(),
            total_resistance,
            position: position.clamp(WIPER_MIN, WIPER_MAX),
            terminals: terminals(["1", "wiper", "2"]),
        }
    }

    /// Track resistance between terminal 1 and the wiper.
    pub fn r1(&self) -> f64 {
        (self.position * self.total_resistance).max(TRACK_FLOOR)
    }

    /// Track resistance between the wiper and terminal 2.
    pub fn r2(&self) -> f64 {
        ((1.0 - self.position) * self.total_resistance).max(TRACK_FLOOR)
    }

    pub fn set_position(&mut self, position: f64) {
        self.position = position.clamp(WIPER_MIN, WIPER_MAX);
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        positive(&self.name, "resistance", self.total_resistance)?;
        if !self.position.is_finite() {
            return Err(Error::invalid_parameter(&self.name, "position", "must be finite"));
        }
        let i1 = s.across(0, 1) / Expr::constant(self.r1());
        let i2 = s.across(1, 2) / Expr::constant(self.r2());
        s.current_into(0, i1.clone());
        s.current_into(1, i2.clone() - i1.clone());
        s.current_into(2, -i2);

        let v = s.across(0, 2);
        s.define(Quantity::Voltage, v);
        s.define(Quantity::Current, i1);
        Ok(())
    }
}

/// Two-state switch, stamped as a resistor whose value depends on `closed`.
#[derive(Debug, Clone)]
pub struct Switch {
    pub name: String,
    pub closed: bool,
    pub(crate) terminals: [Terminal; 2],
}

impl Switch {
    /// On resistance.
    pub const R_CLOSED: f64 = 0.01;
    /// Off resistance.
    pub const R_OPEN: f64 = 1e9;

    pub fn new(name: impl Into<String>, closed: bool) -> Self {
        Self {
            name: name.into(),
            closed,
            terminals: terminals(["p", "n"]),
        }
    }

    pub fn resistance(&self) -> f64 {
        match self.closed {
            true => Self::R_CLOSED,
            false => Self::R_OPEN,
        }
    }

    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    /// Flip between open and closed.
    pub fn toggle(&mut self) {
        self.closed = !self.closed;
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        let i = s.across(0, 1) / Expr::constant(self.resistance());
        s.through(i.clone());
        s.define_two_terminal(i);
        Ok(())
    }
}

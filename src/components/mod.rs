//! Component models for circuit simulation.
//!
//! This module provides models for all supported circuit components:
//! - Linear: Resistor, Capacitor, Inductor
//! - Sources: Voltage Source, Current Source, dependent sources
//! - Nonlinear: Diode, BJT, Op-Amp
//! - Controls: Potentiometer, Switch
//! - Boundary: Ground, Port
//! - Composite: Subcircuit
//!
//! Components hold parameters and terminals only. Each one stamps its
//! behavior into the equation system as symbolic expressions; simulation state
//! lives with the solver.

mod bjt;
mod controls;
mod diode;
mod linear;
mod meta;
mod opamp;
mod ports;
mod sources;
mod subcircuit;

pub use bjt::{Bjt, BjtParams, BjtType};
pub use controls::{Potentiometer, Switch};
pub use diode::{Diode, DiodeParams};
pub use linear::{Capacitor, Inductor, Resistor};
pub use meta::{Category, ComponentMeta, Layout, TerminalPosition};
pub use opamp::{OpAmp, OpAmpParams};
pub use ports::{Ground, Port, PortDirection};
pub use sources::{CurrentSource, DependentCurrentSource, DependentVoltageSource, VoltageSource, Waveform};
pub use subcircuit::Subcircuit;

use crate::analysis::Stamp;
use crate::circuit::Terminal;
use crate::error::{Error, Result};

/// A circuit component.
#[derive(Debug, Clone)]
pub enum Component {
    Resistor(Resistor),
    Capacitor(Capacitor),
    Inductor(Inductor),
    VoltageSource(VoltageSource),
    CurrentSource(CurrentSource),
    DependentVoltageSource(DependentVoltageSource),
    DependentCurrentSource(DependentCurrentSource),
    Diode(Diode),
    Bjt(Bjt),
    OpAmp(OpAmp),
    Potentiometer(Potentiometer),
    Switch(Switch),
    Ground(Ground),
    Port(Port),
    Subcircuit(Subcircuit),
}

macro_rules! dispatch {
    ($component:expr, $c:ident => $body:expr) => {
        match $component {
            Component::Resistor($c) => $body,
            Component::Capacitor($c) => $body,
            Component::Inductor($c) => $body,
            Component::VoltageSource($c) => $body,
            Component::CurrentSource($c) => $body,
            Component::DependentVoltageSource($c) => $body,
            Component::DependentCurrentSource($c) => $body,
            Component::Diode($c) => $body,
            Component::Bjt($c) => $body,
            Component::OpAmp($c) => $body,
            Component::Potentiometer($c) => $body,
            Component::Switch($c) => $body,
            Component::Ground($c) => $body,
            Component::Port($c) => $body,
            Component::Subcircuit($c) => $body,
        }
    };
}

impl Component {
    /// Get the component name.
    pub fn name(&self) -> &str {
        dispatch!(self, c => &c.name)
    }

    /// Terminals in their fixed order.
    pub fn terminals(&self) -> &[Terminal] {
        dispatch!(self, c => &c.terminals[..])
    }

    pub fn terminals_mut(&mut self) -> &mut [Terminal] {
        dispatch!(self, c => &mut c.terminals[..])
    }

    /// Terminal names in their fixed order.
    pub fn terminal_names(&self) -> Vec<String> {
        self.terminals().iter().map(|t| t.name.clone()).collect()
    }

    /// Type tag used by the persistence descriptor.
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Resistor(_) => "resistor",
            Component::Capacitor(_) => "capacitor",
            Component::Inductor(_) => "inductor",
            Component::VoltageSource(_) => "voltage_source",
            Component::CurrentSource(_) => "current_source",
            Component::DependentVoltageSource(_) => "dependent_voltage_source",
            Component::DependentCurrentSource(_) => "dependent_current_source",
            Component::Diode(_) => "diode",
            Component::Bjt(_) => "bjt",
            Component::OpAmp(_) => "opamp",
            Component::Potentiometer(_) => "potentiometer",
            Component::Switch(_) => "switch",
            Component::Ground(_) => "ground",
            Component::Port(_) => "port",
            Component::Subcircuit(_) => "subcircuit",
        }
    }

    /// Check if this component is nonlinear (requires Newton-Raphson iteration).
    pub fn is_nonlinear(&self) -> bool {
        match self {
            Component::Diode(_) | Component::Bjt(_) => true,
            Component::OpAmp(o) => o.params.rails.is_some(),
            Component::Subcircuit(s) => s.circuit().components().iter().any(Component::is_nonlinear),
            _ => false,
        }
    }

    /// Contribute unknowns, equations, terminal currents and probe definitions.
    pub fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        dispatch!(self, c => c.stamp(s))
    }

    /// Editor metadata: display name, description and palette category.
    pub fn metadata(&self) -> ComponentMeta {
        meta::metadata(self.kind())
    }

    /// Editor layout on a unit grid.
    pub fn layout(&self) -> Layout {
        meta::layout(self.kind(), self.terminals())
    }
}

macro_rules! impl_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Component {
                fn from(c: $variant) -> Self {
                    Component::$variant(c)
                }
            }
        )*
    };
}

impl_from!(
    Resistor,
    Capacitor,
    Inductor,
    VoltageSource,
    CurrentSource,
    DependentVoltageSource,
    DependentCurrentSource,
    Diode,
    Bjt,
    OpAmp,
    Potentiometer,
    Switch,
    Ground,
    Port,
    Subcircuit,
);

/// Fresh, unconnected terminals with the given names.
pub(crate) fn terminals<const N: usize>(names: [&str; N]) -> [Terminal; N] {
    names.map(Terminal::new)
}

/// Check that a parameter is finite and strictly positive.
pub(crate) fn positive(component: &str, param: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::invalid_parameter(
            component,
            param,
            format!("must be positive and finite, got {value}"),
        ))
    }
}

/// Check that a parameter is finite.
pub(crate) fn finite(component: &str, param: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::invalid_parameter(
            component,
            param,
            format!("must be finite, got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_names() {
        let q: Component = Bjt::npn("Q1").into();
        assert_eq!(q.terminal_names(), vec!["c", "b", "e"]);
        let u: Component = OpAmp::new("U1", OpAmpParams::ua741()).into();
        assert_eq!(u.terminal_names(), vec!["out", "in+", "in-"]);
    }

    #[test]
    fn test_nonlinear_classification() {
        assert!(Component::from(Diode::new("D1", DiodeParams::default())).is_nonlinear());
        assert!(!Component::from(Resistor::new("R1", 1e3)).is_nonlinear());
        assert!(!Component::from(Switch::new("S1", true)).is_nonlinear());
    }

    #[test]
    fn test_positive_rejects_zero() {
        assert!(positive("R1", "resistance", 0.0).is_err());
        assert!(positive("R1", "resistance", f64::NAN).is_err());
        assert_eq!(positive("R1", "resistance", 2.0).unwrap(), 2.0);
    }
}

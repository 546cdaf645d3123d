//! Composite component holding a nested circuit.

use crate::analysis::Stamp;
use crate::circuit::{Circuit, Terminal};
use crate::error::Result;

/// A nested circuit used as one component.
///
/// Its terminals are the nested circuit's ports in port-number order. The
/// nested circuit is owned and cannot be edited through the subcircuit, so
/// the terminal list always matches its ports.
#[derive(Debug, Clone)]
pub struct Subcircuit {
    pub name: String,
    circuit: Circuit,
    pub(crate) terminals: Vec<Terminal>,
}

impl Subcircuit {
    /// Wrap `circuit`. Fails if its port numbers are not unique.
    pub fn new(name: impl Into<String>, circuit: Circuit) -> Result<Self> {
        let terminals = circuit.external_terminals()?;
        Ok(Self {
            name: name.into(),
            circuit,
            terminals,
        })
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        s.subcircuit(&self.circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Port, PortDirection, Resistor};

    #[test]
    fn test_terminals_follow_ports() {
        let mut inner = Circuit::new("inner");
        inner.add(Port::new("B", 2, PortDirection::Bidirectional).into()).unwrap();
        inner.add(Port::new("A", 1, PortDirection::Bidirectional).into()).unwrap();
        inner.add(Resistor::new("R1", 1e3).into()).unwrap();
        let x = Subcircuit::new("X1", inner).unwrap();
        let names: Vec<_> = x.terminals.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(x.circuit().components().len(), 3);
    }
}

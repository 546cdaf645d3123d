//! Circuit validation.

use crate::components::Component;
use crate::error::{Error, Result};

use super::Circuit;

/// Validate a circuit before assembly.
///
/// Checks, recursively through subcircuits:
/// - the circuit has at least one component
/// - every terminal is connected to a node
/// - port numbers are unique per circuit
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    validate_scope(circuit, "")
}

fn validate_scope(circuit: &Circuit, prefix: &str) -> Result<()> {
    if circuit.components().is_empty() {
        return Err(Error::structural(format!(
            "circuit '{}' has no components",
            circuit.name()
        )));
    }

    circuit.ports()?;

    for component in circuit.components() {
        for terminal in component.terminals() {
            if !terminal.is_connected() {
                return Err(Error::structural(format!(
                    "terminal '{prefix}{}.{}' is not connected",
                    component.name(),
                    terminal.name
                )));
            }
        }
        if let Component::Subcircuit(sub) = component {
            validate_scope(sub.circuit(), &format!("{prefix}{}.", sub.name))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Ground, Port, PortDirection, Resistor, Subcircuit};

    #[test]
    fn test_empty_circuit_rejected() {
        let c = Circuit::new("empty");
        assert!(matches!(
            validate_circuit(&c),
            Err(Error::StructuralError { .. })
        ));
    }

    #[test]
    fn test_floating_terminal_rejected() {
        let mut c = Circuit::new("floating");
        c.add(Resistor::new("R1", 1e3).into()).unwrap();
        c.connect_named("R1", "p", "a").unwrap();
        let err = validate_circuit(&c).unwrap_err();
        assert!(err.to_string().contains("R1.n"));
    }

    #[test]
    fn test_floating_terminal_inside_subcircuit() {
        let mut inner = Circuit::new("inner");
        inner.add(Port::new("A", 1, PortDirection::Bidirectional).into()).unwrap();
        inner.add(Resistor::new("R1", 1e3).into()).unwrap();
        inner.connect_all("A", &["x"]).unwrap();
        inner.connect_named("R1", "p", "x").unwrap();

        let mut outer = Circuit::new("outer");
        outer.add(Subcircuit::new("X1", inner).unwrap().into()).unwrap();
        outer.add(Ground::new("GND").into()).unwrap();
        outer.connect_all("X1", &["0"]).unwrap();
        outer.connect_all("GND", &["0"]).unwrap();

        let err = validate_circuit(&outer).unwrap_err();
        assert!(err.to_string().contains("X1.R1.n"));
    }
}

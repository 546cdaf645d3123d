//! Equation assembly.
//!
//! An [`Analysis`] walks a circuit (recursively into subcircuits) and collects
//! a square system of residual equations `f(x) = 0`:
//!
//! - one KCL equation per non-ground node,
//! - the constitutive equations components add through their [`Stamp`],
//! - one equation per resolved dependent-variable reference.
//!
//! Unknowns are node voltages `V[node]`, branch currents `I[component]` and
//! resolved references `V(component)` / `I(component)`, kept in insertion
//! order. Names inside a subcircuit are qualified with its path (`X1.R1`).

mod resolve;
mod structure;

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::circuit::{validate_circuit, Circuit, NodeId};
use crate::components::Component;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::expr::matching::is_time;
use crate::expr::{Expr, Probe, Quantity, Symbol};

/// A residual equation `residual = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    /// Origin of the equation, for diagnostics
    pub label: String,
    pub residual: Expr,
}

/// A top-level audio input: a per-step known driving a port node.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInput {
    pub number: usize,
    pub name: String,
    pub symbol: Symbol,
}

/// A top-level audio output: an expression evaluated after each step.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioOutput {
    pub number: usize,
    pub name: String,
    pub expr: Expr,
}

/// The assembled, square equation system of a circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub unknowns: Vec<Symbol>,
    pub equations: Vec<Equation>,
    /// Audio inputs in port-number order
    pub inputs: Vec<AudioInput>,
    /// Audio outputs in port-number order
    pub outputs: Vec<AudioOutput>,
}

impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "unknowns ({}):", self.unknowns.len())?;
        for (i, u) in self.unknowns.iter().enumerate() {
            writeln!(f, "  x{i} = {u}")?;
        }
        writeln!(f, "equations ({}):", self.equations.len())?;
        for eq in &self.equations {
            writeln!(f, "  [{}] {} = 0", eq.label, eq.residual)?;
        }
        for input in &self.inputs {
            writeln!(f, "input {} '{}' -> {}", input.number, input.name, input.symbol)?;
        }
        for output in &self.outputs {
            writeln!(f, "output {} '{}' = {}", output.number, output.name, output.expr)?;
        }
        Ok(())
    }
}

/// Validate and assemble a circuit with a fresh analysis context.
pub fn assemble(circuit: &Circuit, diagnostics: &mut dyn Diagnostics) -> Result<Assembly> {
    Analysis::new().assemble(circuit, diagnostics)
}

/// Port name to the qualified parent node bound to it (`None` = ground).
type Bindings = HashMap<String, Option<String>>;

#[derive(Debug)]
struct KclRow {
    node: String,
    terms: Vec<Expr>,
}

/// Assembly context.
#[derive(Debug, Default)]
pub struct Analysis {
    unknowns: Vec<Symbol>,
    unknown_set: HashSet<Symbol>,
    equations: Vec<Equation>,
    kcl: Vec<KclRow>,
    kcl_index: HashMap<String, usize>,
    definitions: HashMap<Probe, Expr>,
    inputs: Vec<AudioInput>,
    outputs: Vec<AudioOutput>,
    warnings: Vec<String>,
}

impl Analysis {
    /// A fresh context with no unknowns or equations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `circuit` and produce its square equation system.
    pub fn assemble(mut self, circuit: &Circuit, diagnostics: &mut dyn Diagnostics) -> Result<Assembly> {
        validate_circuit(circuit)?;
        self.visit(circuit, "", None)?;

        for row in std::mem::take(&mut self.kcl) {
            self.equations.push(Equation {
                label: format!("KCL {}", row.node),
                residual: Expr::sum(row.terms),
            });
        }

        resolve::resolve_references(
            &mut self.unknowns,
            &mut self.equations,
            &mut self.outputs,
            &self.definitions,
        )?;

        for warning in self.warnings.drain(..) {
            diagnostics.report(Diagnostic::Warning(warning));
        }

        if self.unknowns.len() != self.equations.len() {
            return Err(Error::singular(format!(
                "{} unknowns but {} equations",
                self.unknowns.len(),
                self.equations.len()
            )));
        }
        structure::check_structural_rank(&self.unknowns, &self.equations)?;

        self.inputs.sort_by_key(|p| p.number);
        self.outputs.sort_by_key(|p| p.number);

        diagnostics.report(Diagnostic::Assembled {
            unknowns: self.unknowns.len(),
            equations: self.equations.len(),
        });

        Ok(Assembly {
            unknowns: self.unknowns,
            equations: self.equations,
            inputs: self.inputs,
            outputs: self.outputs,
        })
    }

    fn visit(&mut self, circuit: &Circuit, prefix: &str, bindings: Option<&Bindings>) -> Result<()> {
        let grounds: HashSet<NodeId> = circuit
            .components()
            .iter()
            .filter(|c| matches!(c, Component::Ground(_)))
            .flat_map(|c| c.terminals().iter().filter_map(|t| t.node))
            .collect();

        for component in circuit.components() {
            let qualified = format!("{prefix}{}", component.name());
            let mut nodes = Vec::with_capacity(component.terminals().len());
            for terminal in component.terminals() {
                let node = terminal.node.ok_or_else(|| {
                    Error::structural(format!(
                        "terminal '{qualified}.{}' is not connected",
                        terminal.name
                    ))
                })?;
                if grounds.contains(&node) {
                    nodes.push(None);
                    continue;
                }
                let name = circuit.node_name(node).ok_or_else(|| {
                    Error::structural(format!(
                        "terminal '{qualified}.{}' references node {node} of another circuit",
                        terminal.name
                    ))
                })?;
                let node = Some(format!("{prefix}{name}"));
                self.node_voltage(&node)?;
                nodes.push(node);
            }

            let mut stamp = Stamp {
                analysis: self,
                prefix,
                component: qualified,
                nodes,
                bindings,
            };
            component.stamp(&mut stamp)?;
        }
        Ok(())
    }

    fn add_unknown(&mut self, symbol: Symbol) -> Result<Expr> {
        if !self.unknown_set.insert(symbol.clone()) {
            return Err(Error::structural(format!("unknown '{symbol}' introduced twice")));
        }
        self.unknowns.push(symbol.clone());
        Ok(Expr::unknown(symbol))
    }

    /// Voltage of a qualified node, registering its unknown and KCL row on
    /// first use. Ground is constant zero.
    fn node_voltage(&mut self, node: &Option<String>) -> Result<Expr> {
        let Some(name) = node else {
            return Ok(Expr::zero());
        };
        if !self.kcl_index.contains_key(name) {
            self.add_unknown(Symbol::node_voltage(name))?;
            self.kcl_index.insert(name.clone(), self.kcl.len());
            self.kcl.push(KclRow {
                node: name.clone(),
                terms: Vec::new(),
            });
        }
        Ok(Expr::unknown(Symbol::node_voltage(name)))
    }

    /// Add a current leaving `node` into a component terminal.
    fn add_current(&mut self, node: &Option<String>, current: Expr) {
        if let Some(name) = node {
            if let Some(&row) = self.kcl_index.get(name) {
                self.kcl[row].terms.push(current);
            }
        }
    }
}

/// A component's view of the analysis context while it stamps.
///
/// Terminal indices refer to the component's terminal order.
pub struct Stamp<'a> {
    analysis: &'a mut Analysis,
    prefix: &'a str,
    component: String,
    nodes: Vec<Option<String>>,
    bindings: Option<&'a Bindings>,
}

impl Stamp<'_> {
    /// Qualified name of the stamping component.
    pub fn name(&self) -> &str {
        &self.component
    }

    /// Whether the terminal is tied to ground.
    pub fn is_grounded(&self, terminal: usize) -> bool {
        self.nodes[terminal].is_none()
    }

    /// Voltage of the node a terminal is connected to.
    pub fn voltage(&mut self, terminal: usize) -> Expr {
        match &self.nodes[terminal] {
            Some(name) => Expr::unknown(Symbol::node_voltage(name)),
            None => Expr::zero(),
        }
    }

    /// Voltage of terminal `a` relative to terminal `b`.
    pub fn across(&mut self, a: usize, b: usize) -> Expr {
        self.voltage(a) - self.voltage(b)
    }

    /// Current flowing from the terminal's node into the component.
    pub fn current_into(&mut self, terminal: usize, current: Expr) {
        let node = self.nodes[terminal].clone();
        self.analysis.add_current(&node, current);
    }

    /// Current entering terminal 0 and leaving terminal 1.
    pub fn through(&mut self, current: Expr) {
        self.current_into(0, current.clone());
        self.current_into(1, -current);
    }

    /// Introduce the branch-current unknown `I[component]`.
    pub fn branch_current(&mut self) -> Result<Expr> {
        self.analysis.add_unknown(Symbol::branch_current(&self.component))
    }

    /// Add a constitutive equation `residual = 0`.
    pub fn equation(&mut self, residual: Expr) {
        self.analysis.equations.push(Equation {
            label: self.component.clone(),
            residual,
        });
    }

    /// Define what a reference to this component's `quantity` means.
    pub fn define(&mut self, quantity: Quantity, expr: Expr) {
        let probe = Probe {
            name: self.component.clone(),
            quantity,
        };
        self.analysis.definitions.insert(probe, expr);
    }

    /// Define voltage across terminals 0/1 and the given current through them.
    pub fn define_two_terminal(&mut self, current: Expr) {
        let v = self.across(0, 1);
        self.define(Quantity::Voltage, v);
        self.define(Quantity::Current, current);
    }

    /// Dependent-variable marker for a component in the same circuit scope.
    /// The time variable is a primitive, not a marker.
    pub fn reference(&self, probe: &Probe) -> Expr {
        if is_time(probe) {
            return Expr::Time;
        }
        Expr::value_of(Probe {
            name: format!("{}{}", self.prefix, probe.name),
            quantity: probe.quantity,
        })
    }

    /// Whether this component lives inside a subcircuit.
    pub fn is_nested(&self) -> bool {
        self.bindings.is_some()
    }

    /// Record a non-fatal finding.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.analysis.warnings.push(message.into());
    }

    /// Tie the port terminal to the parent node bound to `port` with a
    /// zero-volt link.
    pub fn link_to_parent(&mut self, port: &str) -> Result<()> {
        let parent = self
            .bindings
            .and_then(|b| b.get(port))
            .cloned()
            .ok_or_else(|| Error::structural(format!("port '{}' is not bound", self.component)))?;
        if parent.is_none() && self.is_grounded(0) {
            self.define(Quantity::Voltage, Expr::zero());
            return Ok(());
        }

        let current = self.branch_current()?;
        let inner = self.voltage(0);
        let outer = self.analysis.node_voltage(&parent)?;
        self.equation(inner.clone() - outer);
        self.current_into(0, -current.clone());
        self.analysis.add_current(&parent, current.clone());
        self.define(Quantity::Voltage, inner);
        self.define(Quantity::Current, current);
        Ok(())
    }

    /// Drive the port node from audio input `number`.
    pub fn audio_input(&mut self, number: usize, name: &str) -> Result<()> {
        let symbol = Symbol::input(number);
        if self.is_grounded(0) {
            // The channel keeps its slot so later ports stay on their numbers.
            self.warn(format!("input port '{}' is grounded and ignored", self.component));
            self.define(Quantity::Voltage, Expr::zero());
            self.analysis.inputs.push(AudioInput {
                number,
                name: name.to_string(),
                symbol,
            });
            return Ok(());
        }
        let current = self.branch_current()?;
        let v = self.voltage(0);
        self.equation(v.clone() - Expr::known(symbol.clone()));
        self.current_into(0, current.clone());
        self.define(Quantity::Voltage, v);
        self.define(Quantity::Current, current);
        self.analysis.inputs.push(AudioInput {
            number,
            name: name.to_string(),
            symbol,
        });
        Ok(())
    }

    /// Emit the port node voltage as audio output `number`.
    pub fn audio_output(&mut self, number: usize, name: &str) {
        let v = self.voltage(0);
        self.define(Quantity::Voltage, v.clone());
        self.analysis.outputs.push(AudioOutput {
            number,
            name: name.to_string(),
            expr: v,
        });
    }

    /// Assemble a nested circuit whose ports bind to this component's
    /// terminals in port-number order.
    pub fn subcircuit(&mut self, circuit: &Circuit) -> Result<()> {
        let ports = circuit.ports()?;
        if ports.len() != self.nodes.len() {
            return Err(Error::structural(format!(
                "subcircuit '{}' has {} terminals but its circuit has {} ports",
                self.component,
                self.nodes.len(),
                ports.len()
            )));
        }
        let bindings: Bindings = ports
            .iter()
            .zip(&self.nodes)
            .map(|(port, node)| (port.name.clone(), node.clone()))
            .collect();
        let prefix = format!("{}.", self.component);
        self.analysis.visit(circuit, &prefix, Some(&bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        Capacitor, CurrentSource, DependentCurrentSource, Ground, Port, PortDirection, Resistor,
        Subcircuit, VoltageSource,
    };

    fn divider() -> Circuit {
        let mut c = Circuit::new("divider");
        c.add(VoltageSource::dc("V1", 2.0).into()).unwrap();
        c.add(Resistor::new("R1", 1e3).into()).unwrap();
        c.add(Resistor::new("R2", 1e3).into()).unwrap();
        c.add(Ground::new("GND").into()).unwrap();
        c.add(Port::new("OUT", 1, PortDirection::Output).into()).unwrap();
        c.connect_all("V1", &["in", "0"]).unwrap();
        c.connect_all("R1", &["in", "out"]).unwrap();
        c.connect_all("R2", &["out", "0"]).unwrap();
        c.connect_all("GND", &["0"]).unwrap();
        c.connect_all("OUT", &["out"]).unwrap();
        c
    }

    #[test]
    fn test_square_system() {
        let a = assemble(&divider(), &mut Vec::<Diagnostic>::new()).unwrap();
        // V[in], I[V1], V[out]
        assert_eq!(a.unknowns.len(), 3);
        assert_eq!(a.equations.len(), a.unknowns.len());
        assert_eq!(a.outputs.len(), 1);
        assert_eq!(a.outputs[0].expr, Expr::unknown(Symbol::node_voltage("out")));
    }

    #[test]
    fn test_ground_has_no_kcl_row() {
        let a = assemble(&divider(), &mut Vec::<Diagnostic>::new()).unwrap();
        assert!(a.equations.iter().all(|e| e.label != "KCL 0"));
        assert!(!a.unknowns.contains(&Symbol::node_voltage("0")));
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let c = divider();
        let a = assemble(&c, &mut Vec::<Diagnostic>::new()).unwrap();
        let b = assemble(&c, &mut Vec::<Diagnostic>::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reports_summary() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        assemble(&divider(), &mut sink).unwrap();
        assert_eq!(
            sink.last(),
            Some(&Diagnostic::Assembled {
                unknowns: 3,
                equations: 3
            })
        );
    }

    #[test]
    fn test_floating_node_is_singular() {
        // A current source into a node with nothing else attached
        let mut c = Circuit::new("floating");
        c.add(CurrentSource::dc("I1", 1e-3).into()).unwrap();
        c.add(Capacitor::new("C1", 1e-6).into()).unwrap();
        c.add(Ground::new("GND").into()).unwrap();
        c.connect_all("I1", &["0", "a"]).unwrap();
        c.connect_all("C1", &["b", "0"]).unwrap();
        c.connect_all("GND", &["0"]).unwrap();
        c.add(Port::new("OUT", 1, PortDirection::Output).into()).unwrap();
        c.connect_all("OUT", &["c"]).unwrap();
        let err = assemble(&c, &mut Vec::<Diagnostic>::new()).unwrap_err();
        assert!(matches!(err, Error::SingularSystemError { .. }));
    }

    #[test]
    fn test_dependent_reference_adds_unknown() {
        let mut c = divider();
        c.add(DependentCurrentSource::new("G1", Probe::voltage("R2"), 1e-3).into())
            .unwrap();
        c.add(Resistor::new("R3", 1e3).into()).unwrap();
        c.connect_all("G1", &["0", "x"]).unwrap();
        c.connect_all("R3", &["x", "0"]).unwrap();
        let a = assemble(&c, &mut Vec::<Diagnostic>::new()).unwrap();
        assert!(a.unknowns.contains(&Symbol::new("V(R2)")));
        assert_eq!(a.unknowns.len(), a.equations.len());
    }

    #[test]
    fn test_cyclic_references_rejected() {
        let mut c = Circuit::new("cycle");
        c.add(DependentCurrentSource::new("G1", Probe::current("G2"), 2.0).into())
            .unwrap();
        c.add(DependentCurrentSource::new("G2", Probe::current("G1"), 2.0).into())
            .unwrap();
        c.add(Resistor::new("R1", 1e3).into()).unwrap();
        c.add(Ground::new("GND").into()).unwrap();
        c.connect_all("G1", &["a", "0"]).unwrap();
        c.connect_all("G2", &["a", "0"]).unwrap();
        c.connect_all("R1", &["a", "0"]).unwrap();
        c.connect_all("GND", &["0"]).unwrap();
        let err = assemble(&c, &mut Vec::<Diagnostic>::new()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedDependencyError { .. }));
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let mut c = divider();
        c.add(DependentCurrentSource::new("G1", Probe::voltage("R9"), 1e-3).into())
            .unwrap();
        c.connect_all("G1", &["out", "0"]).unwrap();
        match assemble(&c, &mut Vec::<Diagnostic>::new()).unwrap_err() {
            Error::UnresolvedDependencyError { name, .. } => assert_eq!(name, "V(R9)"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_subcircuit_names_are_qualified() {
        let mut inner = Circuit::new("half");
        inner.add(Port::new("A", 1, PortDirection::Bidirectional).into()).unwrap();
        inner.add(Port::new("B", 2, PortDirection::Bidirectional).into()).unwrap();
        inner.add(Resistor::new("R1", 1e3).into()).unwrap();
        inner.connect_all("A", &["a"]).unwrap();
        inner.connect_all("B", &["b"]).unwrap();
        inner.connect_all("R1", &["a", "b"]).unwrap();

        let mut c = divider();
        c.add(Subcircuit::new("X1", inner).unwrap().into()).unwrap();
        c.connect_all("X1", &["out", "0"]).unwrap();
        let a = assemble(&c, &mut Vec::<Diagnostic>::new()).unwrap();
        assert!(a.unknowns.contains(&Symbol::node_voltage("X1.a")));
        assert!(a.unknowns.contains(&Symbol::branch_current("X1.A")));
        assert_eq!(a.unknowns.len(), a.equations.len());
    }

    #[test]
    fn test_input_port_is_a_known() {
        let mut c = Circuit::new("buffer");
        c.add(Port::new("IN", 1, PortDirection::Input).into()).unwrap();
        c.add(Port::new("OUT", 2, PortDirection::Output).into()).unwrap();
        c.connect_all("IN", &["a"]).unwrap();
        c.connect_all("OUT", &["a"]).unwrap();
        let a = assemble(&c, &mut Vec::<Diagnostic>::new()).unwrap();
        assert_eq!(a.inputs.len(), 1);
        assert_eq!(a.inputs[0].symbol, Symbol::input(1));
        assert_eq!(a.unknowns.len(), 2);
    }

    #[test]
    fn test_grounded_input_reserves_its_slot() {
        let mut c = Circuit::new("buffer");
        c.add(Port::new("IN1", 1, PortDirection::Input).into()).unwrap();
        c.add(Port::new("IN2", 2, PortDirection::Input).into()).unwrap();
        c.add(Port::new("OUT", 3, PortDirection::Output).into()).unwrap();
        c.add(Resistor::new("R1", 1e3).into()).unwrap();
        c.add(Ground::new("GND").into()).unwrap();
        c.connect_all("IN1", &["0"]).unwrap();
        c.connect_all("IN2", &["a"]).unwrap();
        c.connect_all("R1", &["a", "0"]).unwrap();
        c.connect_all("OUT", &["a"]).unwrap();
        c.connect_all("GND", &["0"]).unwrap();

        let mut sink: Vec<Diagnostic> = Vec::new();
        let a = assemble(&c, &mut sink).unwrap();
        let numbers: Vec<usize> = a.inputs.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(sink.iter().any(|d| matches!(d, Diagnostic::Warning(w) if w.contains("IN1"))));
        assert_eq!(a.unknowns.len(), a.equations.len());
    }
}

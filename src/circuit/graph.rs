//! Circuit graph structure.

use std::collections::HashMap;

use super::types::{NodeId, ScopeId, Terminal};
use crate::components::{Component, Port};
use crate::error::{Error, Result};

/// A circuit: named nodes and the components connected to them.
///
/// A circuit is one scope. Its nodes can only be connected to terminals of
/// components owned by the same circuit; a [`crate::components::Subcircuit`]
/// owns a nested circuit with a scope of its own.
#[derive(Debug)]
pub struct Circuit {
    name: String,
    scope: ScopeId,
    /// Node names, indexed by `NodeId::index`
    node_names: Vec<String>,
    /// Mapping from node names to node IDs
    node_map: HashMap<String, NodeId>,
    /// All components in insertion order
    components: Vec<Component>,
    /// Bumped on every structural change
    revision: u64,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: ScopeId::fresh(),
            node_names: Vec::new(),
            node_map: HashMap::new(),
            components: Vec::new(),
            revision: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Structural revision. Any equation system built from an older revision
    /// is stale.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Add a node, or return the existing node with this name.
    pub fn add_node(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.node_map.get(name) {
            return id;
        }
        let id = NodeId {
            scope: self.scope,
            index: self.node_names.len(),
        };
        self.node_names.push(name.to_string());
        self.node_map.insert(name.to_string(), id);
        self.touch();
        id
    }

    /// Find a node ID by name.
    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.node_map.get(name).copied()
    }

    /// Get the name of a node of this circuit.
    pub fn node_name(&self, node: NodeId) -> Option<&str> {
        if node.scope != self.scope {
            return None;
        }
        self.node_names.get(node.index).map(String::as_str)
    }

    /// All node names in creation order.
    pub fn node_names(&self) -> &[String] {
        &self.node_names
    }

    /// All components in insertion order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name() == name)
    }

    /// Mutable access to a component, e.g. to change a parameter.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        let idx = self.components.iter().position(|c| c.name() == name)?;
        self.touch();
        self.components.get_mut(idx)
    }

    /// Add a component. Its name must be unique in this circuit and any
    /// pre-connected terminal must reference a node of this circuit.
    pub fn add(&mut self, component: Component) -> Result<()> {
        if self.component(component.name()).is_some() {
            return Err(Error::structural(format!(
                "duplicate component name '{}' in circuit '{}'",
                component.name(),
                self.name
            )));
        }
        for terminal in component.terminals() {
            if let Some(node) = terminal.node {
                self.check_scope(component.name(), &terminal.name, node)?;
            }
        }
        self.components.push(component);
        self.touch();
        Ok(())
    }

    /// Remove a component by name.
    pub fn remove(&mut self, name: &str) -> Result<Component> {
        let idx = self
            .components
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| Error::structural(format!("no component named '{name}'")))?;
        self.touch();
        Ok(self.components.remove(idx))
    }

    /// Connect a component terminal to a node of this circuit.
    pub fn connect(&mut self, component: &str, terminal: &str, node: NodeId) -> Result<()> {
        self.check_scope(component, terminal, node)?;
        let slot = self.terminal_mut(component, terminal)?;
        slot.node = Some(node);
        self.touch();
        Ok(())
    }

    /// Connect a component terminal to a node by name, creating the node.
    pub fn connect_named(&mut self, component: &str, terminal: &str, node: &str) -> Result<NodeId> {
        // Resolve the terminal first so a bad name doesn't leave a stray node.
        self.terminal_mut(component, terminal)?;
        let id = self.add_node(node);
        self.connect(component, terminal, id)?;
        Ok(id)
    }

    /// Connect a component's terminals to nodes in terminal order.
    pub fn connect_all(&mut self, component: &str, nodes: &[&str]) -> Result<()> {
        let names = self
            .component(component)
            .ok_or_else(|| Error::structural(format!("no component named '{component}'")))?
            .terminal_names();
        if names.len() != nodes.len() {
            return Err(Error::structural(format!(
                "component '{component}' has {} terminals, {} nodes given",
                names.len(),
                nodes.len()
            )));
        }
        for (terminal, node) in names.iter().zip(nodes) {
            self.connect_named(component, terminal, node)?;
        }
        Ok(())
    }

    /// Detach a component terminal from its node.
    pub fn disconnect(&mut self, component: &str, terminal: &str) -> Result<()> {
        let slot = self.terminal_mut(component, terminal)?;
        slot.node = None;
        self.touch();
        Ok(())
    }

    /// Ports of this circuit ordered by port number.
    pub fn ports(&self) -> Result<Vec<&Port>> {
        let mut ports: Vec<&Port> = self
            .components
            .iter()
            .filter_map(|c| match c {
                Component::Port(p) => Some(p),
                _ => None,
            })
            .collect();
        ports.sort_by_key(|p| p.number);
        for pair in ports.windows(2) {
            if pair[0].number == pair[1].number {
                return Err(Error::structural(format!(
                    "ports '{}' and '{}' share number {} in circuit '{}'",
                    pair[0].name, pair[1].name, pair[0].number, self.name
                )));
            }
        }
        Ok(ports)
    }

    /// External terminals of this circuit when used as a composite: one
    /// unconnected terminal per port, named after the port, in port-number order.
    pub fn external_terminals(&self) -> Result<Vec<Terminal>> {
        Ok(self
            .ports()?
            .into_iter()
            .map(|p| Terminal::new(p.name.clone()))
            .collect())
    }

    /// Whether a node is tied to a ground reference.
    pub fn is_ground(&self, node: NodeId) -> bool {
        self.components.iter().any(|c| {
            matches!(c, Component::Ground(_)) && c.terminals().iter().any(|t| t.node == Some(node))
        })
    }

    fn check_scope(&self, component: &str, terminal: &str, node: NodeId) -> Result<()> {
        if node.scope != self.scope || node.index >= self.node_names.len() {
            return Err(Error::structural(format!(
                "terminal '{component}.{terminal}' cannot connect to node {node}: it belongs to another circuit"
            )));
        }
        Ok(())
    }

    fn terminal_mut(&mut self, component: &str, terminal: &str) -> Result<&mut Terminal> {
        let comp = self
            .components
            .iter_mut()
            .find(|c| c.name() == component)
            .ok_or_else(|| Error::structural(format!("no component named '{component}'")))?;
        comp.terminals_mut()
            .iter_mut()
            .find(|t| t.name == terminal)
            .ok_or_else(|| {
                Error::structural(format!("component '{component}' has no terminal '{terminal}'"))
            })
    }
}

/// Cloning gives the copy a fresh scope so that the two circuits can never
/// share nodes. Nested subcircuits are re-scoped recursively.
impl Clone for Circuit {
    fn clone(&self) -> Self {
        let scope = ScopeId::fresh();
        let mut components = self.components.clone();
        for component in &mut components {
            for terminal in component.terminals_mut() {
                if let Some(node) = terminal.node.as_mut() {
                    if node.scope == self.scope {
                        node.scope = scope;
                    }
                }
            }
        }
        Self {
            name: self.name.clone(),
            scope,
            node_names: self.node_names.clone(),
            node_map: self
                .node_map
                .iter()
                .map(|(name, id)| (name.clone(), NodeId { scope, index: id.index }))
                .collect(),
            components,
            revision: self.revision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Ground, PortDirection, Resistor};

    fn divider() -> Circuit {
        let mut c = Circuit::new("divider");
        c.add(Resistor::new("R1", 1e3).into()).unwrap();
        c.add(Resistor::new("R2", 1e3).into()).unwrap();
        c.add(Ground::new("GND").into()).unwrap();
        c.connect_all("R1", &["in", "out"]).unwrap();
        c.connect_all("R2", &["out", "gnd"]).unwrap();
        c.connect_all("GND", &["gnd"]).unwrap();
        c
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let mut c = divider();
        let err = c.add(Resistor::new("R1", 10.0).into()).unwrap_err();
        assert!(matches!(err, Error::StructuralError { .. }));
    }

    #[test]
    fn test_cross_scope_connection_rejected() {
        let mut a = divider();
        let mut b = Circuit::new("other");
        let foreign = b.add_node("x");
        let err = a.connect("R1", "p", foreign).unwrap_err();
        assert!(matches!(err, Error::StructuralError { .. }));
    }

    #[test]
    fn test_unknown_terminal_rejected() {
        let mut c = divider();
        assert!(c.connect_named("R1", "gate", "out").is_err());
        assert!(c.node("gate").is_none());
    }

    #[test]
    fn test_structural_changes_bump_revision() {
        let mut c = divider();
        let before = c.revision();
        c.disconnect("R2", "n").unwrap();
        assert!(c.revision() > before);
        let r = c.revision();
        c.remove("R2").unwrap();
        assert!(c.revision() > r);
    }

    #[test]
    fn test_clone_gets_fresh_scope() {
        let c = divider();
        let copy = c.clone();
        assert_ne!(c.scope(), copy.scope());
        let node = copy.component("R1").unwrap().terminals()[0].node.unwrap();
        assert_eq!(node.scope, copy.scope());
        assert_eq!(copy.node_name(node), Some("in"));
        assert!(copy.is_ground(copy.node("gnd").unwrap()));
    }

    #[test]
    fn test_external_terminals_follow_port_numbers() {
        let mut c = Circuit::new("stage");
        c.add(Port::new("OUT", 2, PortDirection::Output).into()).unwrap();
        c.add(Port::new("IN", 1, PortDirection::Input).into()).unwrap();
        let names: Vec<_> = c
            .external_terminals()
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["IN", "OUT"]);

        c.add(Port::new("AUX", 2, PortDirection::Bidirectional).into()).unwrap();
        assert!(c.external_terminals().is_err());
    }
}

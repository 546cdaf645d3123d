//! Serde persistence model for circuits.
//!
//! A [`CircuitDescriptor`] is a flat, editor-friendly form of a [`Circuit`]:
//! node names, components with named numeric `params` and text `options`, and
//! a connection table. Subcircuits nest a descriptor of their own.
//!
//! ```json
//! {
//!   "name": "rc",
//!   "nodes": ["in", "out", "0"],
//!   "components": [
//!     { "kind": "port", "name": "IN", "params": { "number": 1 }, "options": { "direction": "input" } },
//!     { "kind": "resistor", "name": "R1", "params": { "resistance": 1000 } },
//!     { "kind": "capacitor", "name": "C1", "params": { "capacitance": 1e-6 } },
//!     { "kind": "ground", "name": "GND" }
//!   ],
//!   "connections": [
//!     { "component": "R1", "terminal": "p", "node": "in" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Circuit;
use crate::components::{
    Bjt, BjtParams, BjtType, Capacitor, Component, CurrentSource, DependentCurrentSource,
    DependentVoltageSource, Diode, DiodeParams, Ground, Inductor, OpAmp, OpAmpParams, Port,
    PortDirection, Potentiometer, Resistor, Subcircuit, Switch, VoltageSource, Waveform,
};
use crate::error::{Error, Result};
use crate::expr::{Probe, Quantity};

/// Persistent form of a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitDescriptor {
    pub name: String,
    /// Node names in creation order
    #[serde(default)]
    pub nodes: Vec<String>,
    pub components: Vec<ComponentDescriptor>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// Persistent form of one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Type tag, see [`Component::kind`]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
    /// Nested circuit of a `subcircuit` component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcircuit: Option<Box<CircuitDescriptor>>,
}

/// One terminal-to-node connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub component: String,
    pub terminal: String,
    pub node: String,
}

impl CircuitDescriptor {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a descriptor from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::FileReadError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

impl ComponentDescriptor {
    fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            params: BTreeMap::new(),
            options: BTreeMap::new(),
            subcircuit: None,
        }
    }

    fn param(mut self, key: &str, value: f64) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    fn option(mut self, key: &str, value: impl ToString) -> Self {
        self.options.insert(key.to_string(), value.to_string());
        self
    }
}

impl Circuit {
    /// Convert to the persistence model.
    pub fn to_descriptor(&self) -> CircuitDescriptor {
        let mut connections = Vec::new();
        for component in self.components() {
            for terminal in component.terminals() {
                if let Some(node) = terminal.node.and_then(|n| self.node_name(n)) {
                    connections.push(Connection {
                        component: component.name().to_string(),
                        terminal: terminal.name.clone(),
                        node: node.to_string(),
                    });
                }
            }
        }
        CircuitDescriptor {
            name: self.name().to_string(),
            nodes: self.node_names().to_vec(),
            components: self.components().iter().map(describe).collect(),
            connections,
        }
    }

    /// Build a circuit from the persistence model.
    pub fn from_descriptor(descriptor: &CircuitDescriptor) -> Result<Self> {
        let mut circuit = Circuit::new(descriptor.name.clone());
        for node in &descriptor.nodes {
            circuit.add_node(node);
        }
        for component in &descriptor.components {
            circuit.add(build(component)?)?;
        }
        for c in &descriptor.connections {
            circuit.connect_named(&c.component, &c.terminal, &c.node)?;
        }
        Ok(circuit)
    }

    /// Parse a JSON descriptor.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_descriptor(&CircuitDescriptor::from_json(json)?)
    }

    /// Serialize to a JSON descriptor.
    pub fn to_json(&self) -> Result<String> {
        self.to_descriptor().to_json()
    }
}

fn describe(component: &Component) -> ComponentDescriptor {
    let d = ComponentDescriptor::new(component.kind(), component.name());
    match component {
        Component::Resistor(r) => d.param("resistance", r.resistance),
        Component::Capacitor(c) => d.param("capacitance", c.capacitance),
        Component::Inductor(l) => d.param("inductance", l.inductance),
        Component::VoltageSource(v) => describe_waveform(d, &v.waveform),
        Component::CurrentSource(i) => describe_waveform(d, &i.waveform),
        Component::DependentVoltageSource(e) => describe_control(d, &e.control, e.gain),
        Component::DependentCurrentSource(g) => describe_control(d, &g.control, g.gain),
        Component::Diode(diode) => d.param("is", diode.params.is).param("n", diode.params.n),
        Component::Bjt(q) => d
            .option("type", q.bjt_type)
            .param("beta_f", q.params.beta_f)
            .param("beta_r", q.params.beta_r)
            .param("is_be", q.params.is_be)
            .param("is_bc", q.params.is_bc)
            .param("n", q.params.n)
            .param("va", q.params.va),
        Component::OpAmp(u) => {
            let d = d
                .param("gain", u.params.gain)
                .param("r_out", u.params.r_out)
                .param("r_in", u.params.r_in);
            match u.params.rails {
                Some((neg, pos)) => d.param("rail_neg", neg).param("rail_pos", pos),
                None => d.option("rails", "none"),
            }
        }
        Component::Potentiometer(p) => d
            .param("resistance", p.total_resistance)
            .param("position", p.position),
        Component::Switch(s) => d.option("state", if s.closed { "closed" } else { "open" }),
        Component::Ground(_) => d,
        Component::Port(p) => d.param("number", p.number as f64).option("direction", p.direction),
        Component::Subcircuit(x) => ComponentDescriptor {
            subcircuit: Some(Box::new(x.circuit().to_descriptor())),
            ..d
        },
    }
}

fn describe_waveform(d: ComponentDescriptor, waveform: &Waveform) -> ComponentDescriptor {
    match *waveform {
        Waveform::Dc(v) => d.param("value", v),
        Waveform::Sine {
            offset,
            amplitude,
            frequency,
        } => d
            .option("waveform", "sine")
            .param("offset", offset)
            .param("amplitude", amplitude)
            .param("frequency", frequency),
    }
}

fn describe_control(d: ComponentDescriptor, control: &Probe, gain: f64) -> ComponentDescriptor {
    let quantity = match control.quantity {
        Quantity::Voltage => "voltage",
        Quantity::Current => "current",
    };
    d.param("gain", gain)
        .option("control", &control.name)
        .option("quantity", quantity)
}

/// Typed access to a component descriptor's fields. Keys not read by the
/// builder are rejected.
struct Fields<'a> {
    desc: &'a ComponentDescriptor,
    params: Vec<&'a str>,
    options: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    fn new(desc: &'a ComponentDescriptor) -> Self {
        Self {
            desc,
            params: Vec::new(),
            options: Vec::new(),
        }
    }

    fn param(&mut self, key: &'a str, default: Option<f64>) -> Result<f64> {
        self.params.push(key);
        self.desc
            .params
            .get(key)
            .copied()
            .or(default)
            .ok_or_else(|| Error::invalid_parameter(&self.desc.name, key, "missing"))
    }

    fn option(&mut self, key: &'a str) -> Option<&'a str> {
        self.options.push(key);
        self.desc.options.get(key).map(String::as_str)
    }

    fn finish(self, component: Component) -> Result<Component> {
        let unknown_param = self.desc.params.keys().find(|k| !self.params.contains(&k.as_str()));
        let unknown_option = self.desc.options.keys().find(|k| !self.options.contains(&k.as_str()));
        if let Some(key) = unknown_param.or(unknown_option) {
            return Err(Error::invalid_parameter(
                &self.desc.name,
                key,
                format!("not a parameter of a {}", self.desc.kind),
            ));
        }
        Ok(component)
    }
}

fn build(desc: &ComponentDescriptor) -> Result<Component> {
    let name = desc.name.as_str();
    let mut f = Fields::new(desc);
    let component: Component = match desc.kind.as_str() {
        "resistor" => Resistor::new(name, f.param("resistance", None)?).into(),
        "capacitor" => Capacitor::new(name, f.param("capacitance", None)?).into(),
        "inductor" => Inductor::new(name, f.param("inductance", None)?).into(),
        "voltage_source" => VoltageSource::new(name, build_waveform(&mut f)?).into(),
        "current_source" => CurrentSource::new(name, build_waveform(&mut f)?).into(),
        "dependent_voltage_source" => {
            let (control, gain) = build_control(&mut f)?;
            DependentVoltageSource::new(name, control, gain).into()
        }
        "dependent_current_source" => {
            let (control, gain) = build_control(&mut f)?;
            DependentCurrentSource::new(name, control, gain).into()
        }
        "diode" => {
            let base = match f.option("model").unwrap_or("silicon") {
                "silicon" => DiodeParams::default(),
                "germanium" => DiodeParams::germanium(),
                "led" => DiodeParams::led(),
                other => {
                    return Err(Error::invalid_parameter(name, "model", format!("unknown diode model '{other}'")))
                }
            };
            let params = DiodeParams {
                is: f.param("is", Some(base.is))?,
                n: f.param("n", Some(base.n))?,
            };
            Diode::new(name, params).into()
        }
        "bjt" => {
            let bjt_type: BjtType = f.option("type").unwrap_or("npn").parse()?;
            let base = BjtParams::default();
            let params = BjtParams {
                beta_f: f.param("beta_f", Some(base.beta_f))?,
                beta_r: f.param("beta_r", Some(base.beta_r))?,
                is_be: f.param("is_be", Some(base.is_be))?,
                is_bc: f.param("is_bc", Some(base.is_bc))?,
                n: f.param("n", Some(base.n))?,
                va: f.param("va", Some(base.va))?,
            };
            Bjt::new(name, bjt_type, params).into()
        }
        "opamp" => {
            let base = match f.option("model").unwrap_or("ideal") {
                "ideal" => OpAmpParams::ideal(),
                "ua741" | "741" => OpAmpParams::ua741(),
                "tl072" => OpAmpParams::tl072(),
                other => {
                    return Err(Error::invalid_parameter(name, "model", format!("unknown op-amp model '{other}'")))
                }
            };
            let default_rails = base.rails.unwrap_or((-15.0, 15.0));
            let rails = match f.option("rails") {
                Some("none") => None,
                _ => Some((
                    f.param("rail_neg", Some(default_rails.0))?,
                    f.param("rail_pos", Some(default_rails.1))?,
                )),
            };
            let params = OpAmpParams {
                gain: f.param("gain", Some(base.gain))?,
                r_out: f.param("r_out", Some(base.r_out))?,
                r_in: f.param("r_in", Some(base.r_in))?,
                rails,
            };
            OpAmp::new(name, params).into()
        }
        "potentiometer" => Potentiometer::new(
            name,
            f.param("resistance", None)?,
            f.param("position", Some(0.5))?,
        )
        .into(),
        "switch" => {
            let closed = match f.option("state").unwrap_or("closed") {
                "closed" | "on" => true,
                "open" | "off" => false,
                other => {
                    return Err(Error::invalid_parameter(name, "state", format!("expected open or closed, got '{other}'")))
                }
            };
            Switch::new(name, closed).into()
        }
        "ground" => Ground::new(name).into(),
        "port" => {
            let number = f.param("number", None)?;
            if !(number.fract() == 0.0 && number >= 0.0 && number <= u32::MAX as f64) {
                return Err(Error::invalid_parameter(name, "number", "must be a non-negative integer"));
            }
            let direction: PortDirection = f.option("direction").unwrap_or("bidirectional").parse()?;
            Port::new(name, number as usize, direction).into()
        }
        "subcircuit" => {
            let nested = desc
                .subcircuit
                .as_deref()
                .ok_or_else(|| Error::invalid_parameter(name, "subcircuit", "missing nested circuit"))?;
            Subcircuit::new(name, Circuit::from_descriptor(nested)?)?.into()
        }
        other => {
            return Err(Error::structural(format!(
                "component '{name}' has unknown kind '{other}'"
            )))
        }
    };
    if desc.subcircuit.is_some() && desc.kind != "subcircuit" {
        return Err(Error::invalid_parameter(
            name,
            "subcircuit",
            format!("a {} has no nested circuit", desc.kind),
        ));
    }
    f.finish(component)
}

fn build_waveform(f: &mut Fields<'_>) -> Result<Waveform> {
    match f.option("waveform").unwrap_or("dc") {
        "dc" => Ok(Waveform::Dc(f.param("value", Some(0.0))?)),
        "sine" => Ok(Waveform::Sine {
            offset: f.param("offset", Some(0.0))?,
            amplitude: f.param("amplitude", None)?,
            frequency: f.param("frequency", None)?,
        }),
        other => Err(Error::invalid_parameter(
            &f.desc.name,
            "waveform",
            format!("expected dc or sine, got '{other}'"),
        )),
    }
}

fn build_control(f: &mut Fields<'_>) -> Result<(Probe, f64)> {
    let gain = f.param("gain", None)?;
    let control = f
        .option("control")
        .ok_or_else(|| Error::invalid_parameter(&f.desc.name, "control", "missing"))?;
    let probe = match f.option("quantity").unwrap_or("voltage") {
        "voltage" => Probe::voltage(control),
        "current" => Probe::current(control),
        other => {
            return Err(Error::invalid_parameter(
                &f.desc.name,
                "quantity",
                format!("expected voltage or current, got '{other}'"),
            ))
        }
    };
    Ok((probe, gain))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn divider() -> Circuit {
        let mut c = Circuit::new("divider");
        c.add(VoltageSource::dc("V1", 9.0).into()).unwrap();
        c.add(Resistor::new("R1", 10e3).into()).unwrap();
        c.add(Resistor::new("R2", 10e3).into()).unwrap();
        c.add(Ground::new("GND").into()).unwrap();
        c.add(Port::new("OUT", 1, PortDirection::Output).into()).unwrap();
        c.connect_all("V1", &["vcc", "0"]).unwrap();
        c.connect_all("R1", &["vcc", "mid"]).unwrap();
        c.connect_all("R2", &["mid", "0"]).unwrap();
        c.connect_all("GND", &["0"]).unwrap();
        c.connect_all("OUT", &["mid"]).unwrap();
        c
    }

    #[test]
    fn test_descriptor_round_trip() {
        let original = divider().to_descriptor();
        let json = original.to_json().unwrap();
        let restored = CircuitDescriptor::from_json(&json).unwrap();
        assert_eq!(restored, original);
        let rebuilt = Circuit::from_descriptor(&restored).unwrap();
        assert_eq!(rebuilt.to_descriptor(), original);
    }

    #[test]
    fn test_unknown_kind() {
        let json = r#"{"name": "x", "components": [{"kind": "flux_capacitor", "name": "F1"}]}"#;
        assert!(matches!(Circuit::from_json(json), Err(Error::StructuralError { .. })));
    }

    #[test]
    fn test_unknown_param_rejected() {
        let json = r#"{"name": "x", "components": [
            {"kind": "resistor", "name": "R1", "params": {"resistance": 1000, "tolerance": 0.05}}
        ]}"#;
        let err = Circuit::from_json(json).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref param, .. } if param == "tolerance"));
    }

    #[test]
    fn test_defaults_from_presets() {
        let json = r#"{"name": "x", "components": [
            {"kind": "diode", "name": "D1", "options": {"model": "germanium"}},
            {"kind": "opamp", "name": "U1", "options": {"model": "tl072", "rails": "none"}}
        ]}"#;
        let c = Circuit::from_json(json).unwrap();
        match c.component("D1") {
            Some(Component::Diode(d)) => assert_eq!(d.params, DiodeParams::germanium()),
            other => panic!("unexpected {other:?}"),
        }
        match c.component("U1") {
            Some(Component::OpAmp(u)) => assert_eq!(u.params, OpAmpParams::tl072().linear()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Circuit::from_json("{not json"),
            Err(Error::Serialization { .. })
        ));
    }

    #[test]
    fn test_subcircuit_nests() {
        let mut inner = Circuit::new("buffer");
        inner.add(Port::new("A", 1, PortDirection::Bidirectional).into()).unwrap();
        inner.add(Resistor::new("R1", 1e3).into()).unwrap();
        inner.connect_all("A", &["a"]).unwrap();
        inner.connect_all("R1", &["a", "a"]).unwrap();
        let mut outer = Circuit::new("outer");
        outer.add(Subcircuit::new("X1", inner).unwrap().into()).unwrap();
        outer.connect_all("X1", &["n"]).unwrap();

        let d = outer.to_descriptor();
        let nested = d.components[0].subcircuit.as_deref().unwrap();
        assert_eq!(nested.name, "buffer");
        let rebuilt = Circuit::from_descriptor(&d).unwrap();
        assert_eq!(rebuilt.to_descriptor(), d);
    }
}

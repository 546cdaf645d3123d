//! Import of an already-parsed, SPICE-style netlist.
//!
//! A netlist front end hands over a [`Netlist`]: element entries, `.model`
//! cards, subcircuit definitions and the `.input`/`.output` node lists. The
//! element type comes from the first letter of the name (R, C, L, D, Q, V, I,
//! E, G, X), or from the keywords OP, POT and SW. Nodes `0` and `GND` are
//! ground.
//!
//! | Type | Nodes | Value | Model | Params |
//! |------|-------|-------|-------|--------|
//! | R, C, L | n+ n- | R/C/L | | |
//! | D | anode cathode | | `.model` D or `silicon`/`germanium`/`led` | `is`, `n` |
//! | Q | c b e | | `.model` NPN/PNP or `NPN`/`PNP` | |
//! | V, I | n+ n- | DC value | | `offset`, `amplitude`, `frequency` |
//! | E, G | n+ n- | gain | control: `X`, `V(X)` or `I(X)` | |
//! | X | one per port | | subcircuit name | |
//! | OP | out in+ in- | | `.model` OP or `ideal`/`ua741`/`tl072` | |
//! | POT | n1 wiper n2 | total R | | `position` |
//! | SW | n1 n2 | | | `closed` (0 or 1) |

use std::collections::BTreeMap;
use std::fmt;

use super::Circuit;
use crate::components::{
    Bjt, BjtParams, BjtType, Capacitor, Component, CurrentSource, DependentCurrentSource,
    DependentVoltageSource, Diode, DiodeParams, Ground, Inductor, OpAmp, OpAmpParams, Port,
    PortDirection, Potentiometer, Resistor, Subcircuit, Switch, VoltageSource, Waveform,
};
use crate::error::{Error, Result};
use crate::expr::Probe;

/// Subcircuit instances nested deeper than this are rejected.
pub const MAX_SUBCIRCUIT_DEPTH: usize = 32;

/// Name of the node every ground alias maps to.
pub const GROUND_NODE: &str = "0";

/// Element type of a netlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Resistor,
    Capacitor,
    Inductor,
    Diode,
    Bjt,
    VoltageSource,
    CurrentSource,
    /// E: voltage source controlled by a component quantity
    DependentVoltageSource,
    /// G: current source controlled by a component quantity
    DependentCurrentSource,
    Subcircuit,
    OpAmp,
    Potentiometer,
    Switch,
}

impl ElementKind {
    /// Element type from an entry name. Keywords are checked before single
    /// letters so that `POT1` is not read as an unknown `P`.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        if upper.starts_with("POT") {
            return Some(Self::Potentiometer);
        }
        if upper.starts_with("SW") {
            return Some(Self::Switch);
        }
        if upper.starts_with("OP") {
            return Some(Self::OpAmp);
        }
        match upper.chars().next()? {
            'R' => Some(Self::Resistor),
            'C' => Some(Self::Capacitor),
            'L' => Some(Self::Inductor),
            'D' => Some(Self::Diode),
            'Q' => Some(Self::Bjt),
            'V' => Some(Self::VoltageSource),
            'I' => Some(Self::CurrentSource),
            'E' => Some(Self::DependentVoltageSource),
            'G' => Some(Self::DependentCurrentSource),
            'X' => Some(Self::Subcircuit),
            _ => None,
        }
    }

    /// Element type from a leading keyword (`OP U1 ...`).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "OP" | "OPAMP" => Some(Self::OpAmp),
            "POT" => Some(Self::Potentiometer),
            "SW" | "SWITCH" => Some(Self::Switch),
            _ => None,
        }
    }

    /// Number of nodes, `None` for subcircuit instances.
    pub fn node_count(self) -> Option<usize> {
        match self {
            Self::Bjt | Self::OpAmp | Self::Potentiometer => Some(3),
            Self::Subcircuit => None,
            _ => Some(2),
        }
    }
}

/// One element of a netlist.
#[derive(Debug, Clone, PartialEq)]
pub struct NetlistEntry {
    pub name: String,
    pub nodes: Vec<String>,
    pub value: Option<f64>,
    /// Model, subcircuit or control reference
    pub model: Option<String>,
    pub params: BTreeMap<String, f64>,
    /// Set when the front end typed the entry by keyword
    pub keyword: Option<ElementKind>,
}

impl NetlistEntry {
    pub fn new<S: Into<String>>(name: impl Into<String>, nodes: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            nodes: nodes.into_iter().map(Into::into).collect(),
            value: None,
            model: None,
            params: BTreeMap::new(),
            keyword: None,
        }
    }

    /// An entry typed by keyword, e.g. `OP U1 out p n`.
    pub fn keyword<S: Into<String>>(
        kind: ElementKind,
        name: impl Into<String>,
        nodes: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            keyword: Some(kind),
            ..Self::new(name, nodes)
        }
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into().to_ascii_lowercase(), value);
        self
    }

    pub fn kind(&self) -> Result<ElementKind> {
        self.keyword
            .or_else(|| ElementKind::from_name(&self.name))
            .ok_or_else(|| Error::netlist(&self.name, "unknown component type"))
    }

    fn require_value(&self, what: &str) -> Result<f64> {
        self.value
            .ok_or_else(|| Error::netlist(&self.name, format!("missing {what}")))
    }
}

/// Device family of a `.model` card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Diode,
    Npn,
    Pnp,
    OpAmp,
}

impl std::str::FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "D" | "DIODE" => Ok(Self::Diode),
            "NPN" => Ok(Self::Npn),
            "PNP" => Ok(Self::Pnp),
            "OP" | "OPAMP" => Ok(Self::OpAmp),
            other => Err(Error::netlist(other, "unknown model type")),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Diode => "D",
            Self::Npn => "NPN",
            Self::Pnp => "PNP",
            Self::OpAmp => "OP",
        })
    }
}

/// A `.model` card.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDef {
    pub name: String,
    pub kind: ModelKind,
    pub params: BTreeMap<String, f64>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into().to_ascii_lowercase(), value);
        self
    }
}

/// A `.subckt` definition. Ports are numbered in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct SubcircuitDef {
    pub name: String,
    pub ports: Vec<String>,
    pub entries: Vec<NetlistEntry>,
}

impl SubcircuitDef {
    pub fn new<S: Into<String>>(name: impl Into<String>, ports: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            ports: ports.into_iter().map(Into::into).collect(),
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, entry: NetlistEntry) -> Self {
        self.entries.push(entry);
        self
    }
}

/// A parsed netlist. Models and subcircuit definitions are global and looked
/// up case-insensitively.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Netlist {
    pub title: Option<String>,
    pub entries: Vec<NetlistEntry>,
    pub models: BTreeMap<String, ModelDef>,
    pub subcircuits: BTreeMap<String, SubcircuitDef>,
    /// Audio input nodes, numbered from 1
    pub inputs: Vec<String>,
    /// Audio output nodes, numbered after the inputs
    pub outputs: Vec<String>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: NetlistEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn model_def(mut self, model: ModelDef) -> Self {
        self.models.insert(model.name.to_ascii_uppercase(), model);
        self
    }

    pub fn subcircuit(mut self, def: SubcircuitDef) -> Self {
        self.subcircuits.insert(def.name.to_ascii_uppercase(), def);
        self
    }

    pub fn input(mut self, node: impl Into<String>) -> Self {
        self.inputs.push(node.into());
        self
    }

    pub fn output(mut self, node: impl Into<String>) -> Self {
        self.outputs.push(node.into());
        self
    }

    fn find_model(&self, name: &str) -> Option<&ModelDef> {
        self.models
            .get(&name.to_ascii_uppercase())
            .or_else(|| self.models.values().find(|m| m.name.eq_ignore_ascii_case(name)))
    }

    fn find_subcircuit(&self, name: &str) -> Option<&SubcircuitDef> {
        self.subcircuits
            .get(&name.to_ascii_uppercase())
            .or_else(|| self.subcircuits.values().find(|d| d.name.eq_ignore_ascii_case(name)))
    }
}

fn is_ground(node: &str) -> bool {
    node == GROUND_NODE || node.eq_ignore_ascii_case("gnd")
}

fn node_name(node: &str) -> &str {
    if is_ground(node) {
        GROUND_NODE
    } else {
        node
    }
}

impl Circuit {
    /// Build a circuit from a parsed netlist.
    ///
    /// Each `.input` node gets an input port and each `.output` node an output
    /// port, named `IN:<node>` / `OUT:<node>`. A ground component named `0` is
    /// added to every (sub)circuit that uses the ground node.
    pub fn from_netlist(netlist: &Netlist) -> Result<Self> {
        let name = netlist.title.clone().unwrap_or_else(|| "netlist".to_string());
        let mut circuit = Builder { netlist }.circuit(name, &netlist.entries, 0)?;

        let ports = netlist
            .inputs
            .iter()
            .map(|n| (n, PortDirection::Input, "IN"))
            .chain(netlist.outputs.iter().map(|n| (n, PortDirection::Output, "OUT")));
        for (i, (node, direction, tag)) in ports.enumerate() {
            let port = format!("{tag}:{node}");
            circuit.add(Port::new(port.clone(), i + 1, direction).into())?;
            circuit.connect_named(&port, "int", node_name(node))?;
        }
        tracing::debug!(
            circuit = circuit.name(),
            components = circuit.components().len(),
            "netlist imported"
        );
        Ok(circuit)
    }
}

struct Builder<'a> {
    netlist: &'a Netlist,
}

impl Builder<'_> {
    fn circuit(&self, name: String, entries: &[NetlistEntry], depth: usize) -> Result<Circuit> {
        if depth > MAX_SUBCIRCUIT_DEPTH {
            return Err(Error::structural(format!(
                "subcircuit '{name}' is nested more than {MAX_SUBCIRCUIT_DEPTH} levels deep (recursive definition?)"
            )));
        }
        let mut circuit = Circuit::new(name);
        for entry in entries {
            let kind = entry.kind()?;
            if let Some(count) = kind.node_count() {
                if entry.nodes.len() != count {
                    return Err(Error::netlist(
                        &entry.name,
                        format!("expected {count} nodes, got {}", entry.nodes.len()),
                    ));
                }
            }
            circuit.add(self.component(entry, kind, depth)?)?;
            let nodes: Vec<&str> = entry.nodes.iter().map(|n| node_name(n)).collect();
            circuit.connect_all(&entry.name, &nodes)?;
        }
        if circuit.node(GROUND_NODE).is_some() {
            circuit.add(Ground::new(GROUND_NODE).into())?;
            circuit.connect_named(GROUND_NODE, "g", GROUND_NODE)?;
        }
        Ok(circuit)
    }

    /// The `.model` card an entry names, if it names one of `kinds`.
    fn model(&self, entry: &NetlistEntry, kinds: &[ModelKind]) -> Result<Option<&ModelDef>> {
        let Some(name) = entry.model.as_deref() else {
            return Ok(None);
        };
        match self.netlist.find_model(name) {
            Some(model) if kinds.contains(&model.kind) => Ok(Some(model)),
            Some(model) => Err(Error::netlist(
                &entry.name,
                format!("model '{}' is a {} model", model.name, model.kind),
            )),
            None => Ok(None),
        }
    }

    fn component(&self, entry: &NetlistEntry, kind: ElementKind, depth: usize) -> Result<Component> {
        let name = entry.name.as_str();
        let component: Component = match kind {
            ElementKind::Resistor => Resistor::new(name, entry.require_value("resistance")?).into(),
            ElementKind::Capacitor => Capacitor::new(name, entry.require_value("capacitance")?).into(),
            ElementKind::Inductor => Inductor::new(name, entry.require_value("inductance")?).into(),
            ElementKind::VoltageSource => VoltageSource::new(name, waveform(entry)).into(),
            ElementKind::CurrentSource => CurrentSource::new(name, waveform(entry)).into(),
            ElementKind::DependentVoltageSource => {
                DependentVoltageSource::new(name, control(entry)?, entry.require_value("gain")?).into()
            }
            ElementKind::DependentCurrentSource => {
                DependentCurrentSource::new(name, control(entry)?, entry.require_value("gain")?).into()
            }
            ElementKind::Diode => {
                let mut params = match self.model(entry, &[ModelKind::Diode])? {
                    Some(model) => diode_params(model),
                    None => match entry.model.as_deref().map(str::to_ascii_lowercase).as_deref() {
                        None | Some("silicon") => DiodeParams::default(),
                        Some("germanium") => DiodeParams::germanium(),
                        Some("led") => DiodeParams::led(),
                        Some(other) => return Err(unknown_model(entry, other)),
                    },
                };
                if let Some(&is) = entry.params.get("is") {
                    params.is = is;
                }
                if let Some(&n) = entry.params.get("n") {
                    params.n = n;
                }
                Diode::new(name, params).into()
            }
            ElementKind::Bjt => match self.model(entry, &[ModelKind::Npn, ModelKind::Pnp])? {
                Some(model) => {
                    let bjt_type = if model.kind == ModelKind::Pnp {
                        BjtType::Pnp
                    } else {
                        BjtType::Npn
                    };
                    Bjt::new(name, bjt_type, bjt_params(model)).into()
                }
                None => match entry.model.as_deref() {
                    None => Bjt::npn(name).into(),
                    Some(m) => {
                        let bjt_type: BjtType = m.parse().map_err(|_| unknown_model(entry, m))?;
                        Bjt::new(name, bjt_type, BjtParams::default()).into()
                    }
                },
            },
            ElementKind::OpAmp => {
                let params = match self.model(entry, &[ModelKind::OpAmp])? {
                    Some(model) => opamp_params(model),
                    None => match entry.model.as_deref().map(str::to_ascii_lowercase).as_deref() {
                        None | Some("ideal") => OpAmpParams::ideal(),
                        Some("ua741") | Some("741") => OpAmpParams::ua741(),
                        Some("tl072") => OpAmpParams::tl072(),
                        Some(other) => return Err(unknown_model(entry, other)),
                    },
                };
                OpAmp::new(name, params).into()
            }
            ElementKind::Potentiometer => Potentiometer::new(
                name,
                entry.require_value("resistance")?,
                entry.params.get("position").copied().unwrap_or(0.5),
            )
            .into(),
            ElementKind::Switch => {
                Switch::new(name, entry.params.get("closed").map_or(true, |&c| c != 0.0)).into()
            }
            ElementKind::Subcircuit => self.instance(entry, depth)?.into(),
        };
        Ok(component)
    }

    fn instance(&self, entry: &NetlistEntry, depth: usize) -> Result<Subcircuit> {
        let target = entry
            .model
            .as_deref()
            .ok_or_else(|| Error::netlist(&entry.name, "missing subcircuit name"))?;
        let def = self
            .netlist
            .find_subcircuit(target)
            .ok_or_else(|| Error::netlist(&entry.name, format!("unknown subcircuit '{target}'")))?;
        if def.ports.len() != entry.nodes.len() {
            return Err(Error::netlist(
                &entry.name,
                format!(
                    "subcircuit '{}' has {} ports, {} nodes given",
                    def.name,
                    def.ports.len(),
                    entry.nodes.len()
                ),
            ));
        }
        if let Some(port) = def.ports.iter().find(|p| is_ground(p)) {
            return Err(Error::netlist(
                &def.name,
                format!("ground node '{port}' cannot be a subcircuit port"),
            ));
        }

        let mut inner = self.circuit(def.name.clone(), &def.entries, depth + 1)?;
        for (i, port) in def.ports.iter().enumerate() {
            inner.add(Port::new(port.clone(), i + 1, PortDirection::Bidirectional).into())?;
            inner.connect_named(port, "int", port)?;
        }
        Subcircuit::new(entry.name.as_str(), inner)
    }
}

fn unknown_model(entry: &NetlistEntry, model: &str) -> Error {
    Error::netlist(&entry.name, format!("unknown model '{model}'"))
}

fn waveform(entry: &NetlistEntry) -> Waveform {
    let p = &entry.params;
    if p.contains_key("amplitude") || p.contains_key("frequency") {
        Waveform::Sine {
            offset: p.get("offset").copied().unwrap_or(0.0),
            amplitude: p.get("amplitude").copied().unwrap_or(0.0),
            frequency: p.get("frequency").copied().unwrap_or(0.0),
        }
    } else {
        Waveform::Dc(entry.value.unwrap_or(0.0))
    }
}

/// Control reference of a dependent source: `X`, `V(X)` or `I(X)`.
fn control(entry: &NetlistEntry) -> Result<Probe> {
    let target = entry
        .model
        .as_deref()
        .ok_or_else(|| Error::netlist(&entry.name, "missing control component"))?;
    let wrapped = |prefix: &str| {
        let head = target.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        target[prefix.len()..].strip_suffix(')').map(str::trim)
    };
    let probe = if let Some(name) = wrapped("I(") {
        Probe::current(name)
    } else if let Some(name) = wrapped("V(") {
        Probe::voltage(name)
    } else {
        Probe::voltage(target)
    };
    Ok(probe)
}

fn ignored(model: &ModelDef, key: &str) {
    tracing::warn!(model = %model.name, param = key, "unsupported model parameter ignored");
}

fn diode_params(model: &ModelDef) -> DiodeParams {
    let mut params = DiodeParams::default();
    for (key, &value) in &model.params {
        match key.as_str() {
            "is" => params.is = value,
            "n" => params.n = value,
            other => ignored(model, other),
        }
    }
    params
}

fn bjt_params(model: &ModelDef) -> BjtParams {
    let mut params = BjtParams::default();
    for (key, &value) in &model.params {
        match key.as_str() {
            "bf" => params.beta_f = value,
            "br" => params.beta_r = value,
            "is" => {
                params.is_be = value;
                params.is_bc = value;
            }
            "nf" | "n" => params.n = value,
            "vaf" | "va" => params.va = value,
            other => ignored(model, other),
        }
    }
    params
}

fn opamp_params(model: &ModelDef) -> OpAmpParams {
    let mut params = OpAmpParams::ideal();
    let mut rails = params.rails;
    for (key, &value) in &model.params {
        match key.as_str() {
            "gain" | "a" => params.gain = value,
            "rout" => params.r_out = value,
            "rin" => params.r_in = value,
            "vneg" => rails = Some((value, rails.map_or(15.0, |r| r.1))),
            "vpos" => rails = Some((rails.map_or(-15.0, |r| r.0), value)),
            other => ignored(model, other),
        }
    }
    params.rails = rails;
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(ElementKind::from_name("R1"), Some(ElementKind::Resistor));
        assert_eq!(ElementKind::from_name("pot2"), Some(ElementKind::Potentiometer));
        assert_eq!(ElementKind::from_name("SW1"), Some(ElementKind::Switch));
        assert_eq!(ElementKind::from_name("OP1"), Some(ElementKind::OpAmp));
        assert_eq!(ElementKind::from_name("Z1"), None);
        assert_eq!(ElementKind::from_keyword("pot"), Some(ElementKind::Potentiometer));
    }

    #[test]
    fn test_keyword_entry() {
        let netlist = Netlist::new()
            .entry(NetlistEntry::keyword(ElementKind::OpAmp, "U1", ["out", "p", "GND"]).model("tl072"))
            .entry(NetlistEntry::new("R1", ["out", "p"]).value(10e3));
        let c = Circuit::from_netlist(&netlist).unwrap();
        match c.component("U1") {
            Some(Component::OpAmp(u)) => assert_eq!(u.params, OpAmpParams::tl072()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(c.node("GND").is_none());
        assert!(c.component(GROUND_NODE).is_some());
    }

    #[test]
    fn test_model_card() {
        let netlist = Netlist::new()
            .model_def(ModelDef::new("BC109", ModelKind::Npn).param("bf", 300.0).param("rb", 10.0))
            .entry(NetlistEntry::new("Q1", ["c", "b", "0"]).model("bc109"));
        let c = Circuit::from_netlist(&netlist).unwrap();
        match c.component("Q1") {
            Some(Component::Bjt(q)) => {
                assert_eq!(q.bjt_type, BjtType::Npn);
                assert_eq!(q.params.beta_f, 300.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_sources() {
        let netlist = Netlist::new()
            .entry(
                NetlistEntry::new("V1", ["a", "0"])
                    .param("amplitude", 1.0)
                    .param("frequency", 440.0),
            )
            .entry(NetlistEntry::new("R1", ["a", "0"]).value(1e3))
            .entry(NetlistEntry::new("E1", ["b", "0"]).model("I(R1)").value(100.0))
            .entry(NetlistEntry::new("R2", ["b", "0"]).value(1e3));
        let c = Circuit::from_netlist(&netlist).unwrap();
        match c.component("V1") {
            Some(Component::VoltageSource(v)) => assert_eq!(
                v.waveform,
                Waveform::Sine {
                    offset: 0.0,
                    amplitude: 1.0,
                    frequency: 440.0
                }
            ),
            other => panic!("unexpected {other:?}"),
        }
        match c.component("E1") {
            Some(Component::DependentVoltageSource(e)) => {
                assert_eq!(e.control, Probe::current("R1"));
                assert_eq!(e.gain, 100.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_subcircuit_instance_and_ports() {
        let clip = SubcircuitDef::new("CLIP", ["in", "out"])
            .entry(NetlistEntry::new("R1", ["in", "out"]).value(1e3))
            .entry(NetlistEntry::new("D1", ["out", "0"]))
            .entry(NetlistEntry::new("D2", ["0", "out"]));
        let netlist = Netlist::new()
            .subcircuit(clip)
            .input("a")
            .output("b")
            .entry(NetlistEntry::new("X1", ["a", "b"]).model("clip"));
        let c = Circuit::from_netlist(&netlist).unwrap();
        let Some(Component::Subcircuit(x)) = c.component("X1") else {
            panic!("X1 missing");
        };
        assert_eq!(x.circuit().external_terminals().unwrap().len(), 2);
        let ports = c.ports().unwrap();
        assert_eq!(ports[0].name, "IN:a");
        assert_eq!(ports[1].name, "OUT:b");
        assert_eq!(ports[1].number, 2);
    }

    #[test]
    fn test_recursive_subcircuit_rejected() {
        let netlist = Netlist::new()
            .subcircuit(SubcircuitDef::new("LOOP", ["a"]).entry(NetlistEntry::new("X1", ["a"]).model("LOOP")))
            .entry(NetlistEntry::new("X1", ["n"]).model("LOOP"));
        let err = Circuit::from_netlist(&netlist).unwrap_err();
        assert!(matches!(err, Error::StructuralError { .. }));
    }

    #[test]
    fn test_entry_errors() {
        let bad_kind = Netlist::new().entry(NetlistEntry::new("Z1", ["a", "b"]).value(5.0));
        assert!(matches!(
            Circuit::from_netlist(&bad_kind),
            Err(Error::NetlistError { entry, .. }) if entry == "Z1"
        ));

        let missing_value = Netlist::new().entry(NetlistEntry::new("R1", ["a", "b"]));
        assert!(matches!(
            Circuit::from_netlist(&missing_value),
            Err(Error::NetlistError { .. })
        ));

        let wrong_model = Netlist::new()
            .model_def(ModelDef::new("M1", ModelKind::Npn))
            .entry(NetlistEntry::new("D1", ["a", "0"]).model("M1"));
        assert!(matches!(
            Circuit::from_netlist(&wrong_model),
            Err(Error::NetlistError { entry, .. }) if entry == "D1"
        ));

        let node_count = Netlist::new().entry(NetlistEntry::new("Q1", ["c", "b"]));
        assert!(Circuit::from_netlist(&node_count).is_err());
    }
}

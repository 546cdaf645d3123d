//! Editor metadata and layout for components.

use serde::Serialize;

use crate::circuit::Terminal;

/// Palette category of a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Passive,
    Source,
    Semiconductor,
    Amplifier,
    Control,
    Boundary,
    Composite,
}

/// Static description of a component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentMeta {
    pub type_name: &'static str,
    pub description: &'static str,
    pub category: Category,
}

/// Position of a terminal on the component's grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalPosition {
    pub name: String,
    pub x: i32,
    pub y: i32,
}

/// Bounding box and terminal positions on a unit grid, origin top-left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub width: i32,
    pub height: i32,
    pub terminals: Vec<TerminalPosition>,
}

pub(super) fn metadata(kind: &str) -> ComponentMeta {
    let (type_name, description, category) = match kind {
        "resistor" => ("Resistor", "Linear resistance", Category::Passive),
        "capacitor" => ("Capacitor", "Linear capacitance", Category::Passive),
        "inductor" => ("Inductor", "Linear inductance", Category::Passive),
        "voltage_source" => ("Voltage Source", "Independent DC or sine voltage", Category::Source),
        "current_source" => ("Current Source", "Independent DC or sine current", Category::Source),
        "dependent_voltage_source" => (
            "Dependent Voltage Source",
            "Voltage proportional to another component's voltage or current",
            Category::Source,
        ),
        "dependent_current_source" => (
            "Dependent Current Source",
            "Current proportional to another component's voltage or current",
            Category::Source,
        ),
        "diode" => ("Diode", "Shockley junction diode", Category::Semiconductor),
        "bjt" => ("BJT", "Ebers-Moll bipolar transistor", Category::Semiconductor),
        "opamp" => ("Op-Amp", "Finite-gain operational amplifier", Category::Amplifier),
        "potentiometer" => ("Potentiometer", "Three-terminal variable resistor", Category::Control),
        "switch" => ("Switch", "Open or closed contact", Category::Control),
        "ground" => ("Ground", "Zero-volt reference", Category::Boundary),
        "port" => ("Port", "Audio or subcircuit boundary terminal", Category::Boundary),
        _ => ("Subcircuit", "Nested circuit", Category::Composite),
    };
    ComponentMeta {
        type_name,
        description,
        category,
    }
}

pub(super) fn layout(kind: &str, terminals: &[Terminal]) -> Layout {
    let (width, height, positions): (i32, i32, Vec<(i32, i32)>) = match (kind, terminals.len()) {
        ("bjt", _) => (4, 4, vec![(4, 0), (0, 2), (4, 4)]),
        ("opamp", _) => (6, 4, vec![(6, 2), (0, 3), (0, 1)]),
        ("potentiometer", _) => (4, 2, vec![(0, 2), (2, 0), (4, 2)]),
        (_, 1) => (2, 2, vec![(1, 0)]),
        (_, 2) => (4, 2, vec![(0, 1), (4, 1)]),
        (_, n) => {
            // Composite: first half on the left edge, the rest on the right
            let left = n.div_ceil(2);
            let rows = i32::try_from(left).unwrap_or(i32::MAX);
            let positions = (0..n)
                .map(|i| {
                    let (x, row) = if i < left { (0, i) } else { (4, i - left) };
                    (x, 2 * i32::try_from(row).unwrap_or(0) + 1)
                })
                .collect();
            (4, 2 * rows, positions)
        }
    };
    Layout {
        width,
        height,
        terminals: terminals
            .iter()
            .zip(positions)
            .map(|(t, (x, y))| TerminalPosition {
                name: t.name.clone(),
                x,
                y,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use crate::components::{Bjt, Component, Resistor, Subcircuit};
    use crate::components::{Category, Port, PortDirection};
    use crate::circuit::Circuit;

    #[test]
    fn test_two_terminal_layout() {
        let r: Component = Resistor::new("R1", 1e3).into();
        let layout = r.layout();
        assert_eq!((layout.width, layout.height), (4, 2));
        assert_eq!(layout.terminals[1].name, "n");
        assert_eq!((layout.terminals[1].x, layout.terminals[1].y), (4, 1));
        assert_eq!(r.metadata().category, Category::Passive);
    }

    #[test]
    fn test_bjt_metadata() {
        let q: Component = Bjt::npn("Q1").into();
        assert_eq!(q.metadata().type_name, "BJT");
        assert_eq!(q.layout().terminals.len(), 3);
    }

    #[test]
    fn test_composite_layout_splits_sides() {
        let mut inner = Circuit::new("inner");
        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            inner
                .add(Port::new(*name, i + 1, PortDirection::Bidirectional).into())
                .unwrap();
        }
        let x: Component = Subcircuit::new("X1", inner).unwrap().into();
        let layout = x.layout();
        assert_eq!(layout.height, 4);
        let xs: Vec<_> = layout.terminals.iter().map(|t| t.x).collect();
        assert_eq!(xs, vec![0, 0, 4]);
        assert_eq!(x.metadata().category, Category::Composite);
    }
}

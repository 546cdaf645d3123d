mod common;

use rtspice_core::analysis::assemble;
use rtspice_core::circuit::netlist::{ElementKind, Netlist, NetlistEntry, SubcircuitDef};
use rtspice_core::expr::Probe;
use rtspice_core::{Circuit, Diagnostic, Error};

fn square(circuit: &Circuit) -> usize {
    let assembly = assemble(circuit, &mut Vec::<Diagnostic>::new()).unwrap();
    assert_eq!(assembly.equations.len(), assembly.unknowns.len());
    assembly.unknowns.len()
}

#[test]
fn test_linear_topologies_are_square() {
    square(&common::rc_lowpass(1e3, 1e-6));
    square(&common::passthrough());

    let ladder = Netlist::new()
        .input("in")
        .output("out")
        .entry(NetlistEntry::new("R1", ["in", "a"]).value(1e3))
        .entry(NetlistEntry::new("L1", ["a", "b"]).value(10e-3))
        .entry(NetlistEntry::new("C1", ["b", "0"]).value(100e-9))
        .entry(NetlistEntry::new("R2", ["b", "out"]).value(1e3))
        .entry(NetlistEntry::new("C2", ["out", "0"]).value(10e-9));
    square(&Circuit::from_netlist(&ladder).unwrap());

    let inverting = Netlist::new()
        .input("in")
        .output("out")
        .entry(NetlistEntry::new("R1", ["in", "m"]).value(10e3))
        .entry(NetlistEntry::new("R2", ["m", "out"]).value(100e3))
        .entry(NetlistEntry::keyword(ElementKind::OpAmp, "U1", ["out", "0", "m"]));
    square(&Circuit::from_netlist(&inverting).unwrap());
}

#[test]
fn test_nonlinear_and_nested_topologies_are_square() {
    square(&common::diode_clipper());

    let stage = SubcircuitDef::new("STAGE", ["i", "o"])
        .entry(NetlistEntry::new("R1", ["i", "o"]).value(4.7e3))
        .entry(NetlistEntry::new("D1", ["o", "0"]).model("germanium"));
    let netlist = Netlist::new()
        .subcircuit(stage)
        .input("in")
        .output("out")
        .entry(NetlistEntry::new("X1", ["in", "mid"]).model("STAGE"))
        .entry(NetlistEntry::new("X2", ["mid", "out"]).model("STAGE"));
    square(&Circuit::from_netlist(&netlist).unwrap());
}

#[test]
fn test_dependent_reference_is_resolved() {
    let netlist = Netlist::new()
        .output("b")
        .entry(NetlistEntry::new("V1", ["vcc", "0"]).value(1.0))
        .entry(NetlistEntry::new("R1", ["vcc", "a"]).value(1e3))
        .entry(NetlistEntry::new("R2", ["a", "0"]).value(1e3))
        .entry(NetlistEntry::new("E1", ["b", "0"]).model("V(R1)").value(2.0))
        .entry(NetlistEntry::new("R3", ["b", "0"]).value(1e3));
    square(&Circuit::from_netlist(&netlist).unwrap());
}

#[test]
fn test_cyclic_references_fail_fast() {
    let netlist = Netlist::new()
        .entry(NetlistEntry::new("G1", ["a", "0"]).model("I(G2)").value(2.0))
        .entry(NetlistEntry::new("G2", ["a", "0"]).model("I(G1)").value(0.5))
        .entry(NetlistEntry::new("R1", ["a", "0"]).value(1e3));
    let circuit = Circuit::from_netlist(&netlist).unwrap();
    let err = assemble(&circuit, &mut Vec::<Diagnostic>::new()).unwrap_err();
    assert!(matches!(err, Error::UnresolvedDependencyError { .. }), "{err}");
}

#[test]
fn test_reference_to_missing_component() {
    let mut circuit = common::rc_lowpass(1e3, 1e-6);
    circuit
        .add(rtspice_core::components::DependentCurrentSource::new("G1", Probe::current("R7"), 1.0).into())
        .unwrap();
    circuit.connect_all("G1", &["out", "0"]).unwrap();
    assert!(matches!(
        assemble(&circuit, &mut Vec::<Diagnostic>::new()),
        Err(Error::UnresolvedDependencyError { .. })
    ));
}

#[test]
fn test_assembly_is_idempotent() {
    let circuit = common::diode_clipper();
    let mut first_sink: Vec<Diagnostic> = Vec::new();
    let mut second_sink: Vec<Diagnostic> = Vec::new();
    let first = assemble(&circuit, &mut first_sink).unwrap();
    let second = assemble(&circuit, &mut second_sink).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first_sink, second_sink);
    assert!(matches!(first_sink.last(), Some(Diagnostic::Assembled { .. })));
}

#[test]
fn test_floating_terminal_is_structural() {
    let mut circuit = common::rc_lowpass(1e3, 1e-6);
    circuit
        .add(rtspice_core::components::Resistor::new("R9", 1e3).into())
        .unwrap();
    circuit.connect_named("R9", "p", "out").unwrap();
    assert!(matches!(
        assemble(&circuit, &mut Vec::<Diagnostic>::new()),
        Err(Error::StructuralError { .. })
    ));
}

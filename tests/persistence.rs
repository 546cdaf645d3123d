mod common;

use rtspice_core::circuit::descriptor::CircuitDescriptor;
use rtspice_core::circuit::netlist::{ModelDef, ModelKind, Netlist, NetlistEntry, SubcircuitDef};
use rtspice_core::{Circuit, Error, Simulator};

fn render(circuit: &Circuit, input: &[f32]) -> Vec<f32> {
    let mut sim = Simulator::new(circuit, 48000.0).unwrap();
    let mut output = vec![0.0f32; input.len()];
    sim.process_block(input, &mut output);
    output
}

fn overdrive() -> Circuit {
    let stage = SubcircuitDef::new("CLIP", ["i", "o"])
        .entry(NetlistEntry::new("R1", ["i", "o"]).value(2.2e3))
        .entry(NetlistEntry::new("D1", ["o", "0"]).model("1N34"))
        .entry(NetlistEntry::new("D2", ["0", "o"]).model("1N34"));
    let netlist = Netlist::new()
        .model_def(ModelDef::new("1N34", ModelKind::Diode).param("is", 2e-7).param("n", 1.3))
        .subcircuit(stage)
        .input("in")
        .output("out")
        .entry(NetlistEntry::new("C1", ["in", "a"]).value(100e-9))
        .entry(NetlistEntry::new("R1", ["a", "0"]).value(100e3))
        .entry(NetlistEntry::new("E1", ["b", "0"]).model("V(R1)").value(10.0))
        .entry(NetlistEntry::new("X1", ["b", "out"]).model("CLIP"))
        .entry(NetlistEntry::new("POT1", ["out", "w", "0"]).value(10e3).param("position", 0.3))
        .entry(NetlistEntry::new("SW1", ["w", "0"]).param("closed", 0.0));
    Circuit::from_netlist(&netlist).unwrap()
}

#[test]
fn test_json_round_trip_simulates_identically() {
    let circuit = overdrive();
    let json = circuit.to_json().unwrap();
    let restored = Circuit::from_json(&json).unwrap();
    assert_eq!(restored.to_descriptor(), circuit.to_descriptor());

    let input = common::sine(330.0, 0.5, 48000.0, 2000);
    assert_eq!(render(&restored, &input), render(&circuit, &input));
}

#[test]
fn test_descriptor_from_file() {
    let circuit = common::rc_lowpass(2.2e3, 47e-9);
    let path = std::env::temp_dir().join(format!("rtspice-descriptor-{}.json", std::process::id()));
    std::fs::write(&path, circuit.to_json().unwrap()).unwrap();

    let loaded = CircuitDescriptor::from_file(&path);
    std::fs::remove_file(&path).unwrap();
    let restored = Circuit::from_descriptor(&loaded.unwrap()).unwrap();

    let input = common::sine(1000.0, 1.0, 48000.0, 256);
    assert_eq!(render(&restored, &input), render(&circuit, &input));
}

#[test]
fn test_missing_file_is_a_read_error() {
    let path = std::env::temp_dir().join("rtspice-no-such-descriptor.json");
    assert!(matches!(
        CircuitDescriptor::from_file(&path),
        Err(Error::FileReadError { .. })
    ));
}

#[test]
fn test_malformed_json_is_rejected() {
    assert!(Circuit::from_json("{ \"name\": \"broken\", ").is_err());
    assert!(Circuit::from_json(r#"{ "name": "x", "components": [{ "kind": "flux", "name": "F1" }] }"#).is_err());
}

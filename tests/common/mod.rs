#![allow(dead_code)]

use rtspice_core::circuit::netlist::{Netlist, NetlistEntry};
use rtspice_core::Circuit;

/// IN -- R -- out -- C -- gnd
pub fn rc_lowpass(r: f64, c: f64) -> Circuit {
    let netlist = Netlist::new()
        .input("in")
        .output("out")
        .entry(NetlistEntry::new("R1", ["in", "out"]).value(r))
        .entry(NetlistEntry::new("C1", ["out", "0"]).value(c));
    Circuit::from_netlist(&netlist).unwrap()
}

/// DC source `vs` through `r` into a diode to ground. Output at the anode.
pub fn diode_bias(vs: f64, r: f64) -> Circuit {
    let netlist = Netlist::new()
        .output("a")
        .entry(NetlistEntry::new("V1", ["vcc", "0"]).value(vs))
        .entry(NetlistEntry::new("R1", ["vcc", "a"]).value(r))
        .entry(NetlistEntry::new("D1", ["a", "0"]));
    Circuit::from_netlist(&netlist).unwrap()
}

/// Series resistor into antiparallel diodes.
pub fn diode_clipper() -> Circuit {
    let netlist = Netlist::new()
        .input("in")
        .output("out")
        .entry(NetlistEntry::new("R1", ["in", "out"]).value(1e3))
        .entry(NetlistEntry::new("C1", ["out", "0"]).value(10e-9))
        .entry(NetlistEntry::new("D1", ["out", "0"]))
        .entry(NetlistEntry::new("D2", ["0", "out"]));
    Circuit::from_netlist(&netlist).unwrap()
}

/// Input node wired straight to the output node, with a load.
pub fn passthrough() -> Circuit {
    let netlist = Netlist::new()
        .input("a")
        .output("a")
        .entry(NetlistEntry::new("R1", ["a", "0"]).value(10e3));
    Circuit::from_netlist(&netlist).unwrap()
}

/// A biased diode node that an input can push around.
pub fn biased_diode() -> Circuit {
    let netlist = Netlist::new()
        .input("in")
        .output("a")
        .entry(NetlistEntry::new("V1", ["vcc", "0"]).value(2.0))
        .entry(NetlistEntry::new("R1", ["vcc", "a"]).value(1e3))
        .entry(NetlistEntry::new("R2", ["in", "a"]).value(1e3))
        .entry(NetlistEntry::new("D1", ["a", "0"]));
    Circuit::from_netlist(&netlist).unwrap()
}

pub fn sine(frequency: f64, amplitude: f64, sample_rate: f64, len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| (amplitude * (std::f64::consts::TAU * frequency * n as f64 / sample_rate).sin()) as f32)
        .collect()
}

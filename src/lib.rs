//! # rtspice core
//!
//! A real-time analog circuit simulator for audio effects.
//!
//! This library provides:
//! - A circuit graph with scoped nodes, numbered ports and nested subcircuits
//! - Symbolic equation assembly: every component stamps residual expressions
//! - Dependent-variable resolution for components that reference each other
//! - Trapezoidal or backward-Euler discretization of `d/dt`
//! - Compiled residual and Jacobian tapes, solved per sample by Newton-Raphson
//! - A lock-free hand-off from the editing thread to the audio thread
//!
//! ## Architecture
//!
//! - [`circuit`] - Circuit graph, validation, descriptors and netlist import
//! - [`components`] - Component models and their stamps
//! - [`expr`] - Symbolic expressions, derivatives and pattern matching
//! - [`analysis`] - Assembly of the square residual system
//! - [`solver`] - Discretization, compilation and the per-sample solve
//! - [`runtime`] - [`runtime::Engine`] / [`runtime::Processor`] pair
//! - [`diagnostics`] - Event sink shared by assembly and the drive loop
//! - [`audio`] - Raw f32le stream I/O (CLI only)
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! ffmpeg -i input.wav -f f32le -ac 1 -ar 48000 - | rtspice fuzz.json | ffmpeg -f f32le -ac 1 -ar 48000 -i - output.wav
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use rtspice_core::circuit::netlist::{Netlist, NetlistEntry};
//! use rtspice_core::{Circuit, Simulator};
//!
//! # fn main() -> rtspice_core::Result<()> {
//! let netlist = Netlist::new()
//!     .input("in")
//!     .output("out")
//!     .entry(NetlistEntry::new("R1", ["in", "out"]).value(1e3))
//!     .entry(NetlistEntry::new("C1", ["out", "0"]).value(1e-6));
//! let circuit = Circuit::from_netlist(&netlist)?;
//! let mut sim = Simulator::new(&circuit, 48000.0)?;
//! let mut out = [0.0f32; 64];
//! sim.process_block(&[1.0; 64], &mut out);
//! # Ok(())
//! # }
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmSimulator } from 'rtspice_core';
//!
//! const sim = new WasmSimulator(descriptorJson, 48000);
//! sim.process_block(inputBuffer, outputBuffer);
//! ```

pub mod analysis;
pub mod circuit;
pub mod components;
pub mod diagnostics;
pub mod error;
pub mod expr;
pub mod runtime;
pub mod solver;

#[cfg(feature = "cli")]
pub mod audio;

pub use circuit::Circuit;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{Error, Result};
pub use runtime::{channel, Engine, Processor};
pub use solver::{Simulator, SimulatorConfig};

#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmSimulator;

/// Default sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;

/// Thermal voltage at room temperature (approximately 26mV)
pub const THERMAL_VOLTAGE: f64 = 0.0258;

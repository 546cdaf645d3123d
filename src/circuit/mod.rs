//! Circuit graph representation, validation and import/export.
//!
//! The [`Circuit`] struct holds components and named nodes. Terminals of
//! components reference nodes by [`NodeId`]; every circuit is its own scope, so
//! a terminal can never be wired to a node of another (sub)circuit.
//!
//! - [`descriptor`] converts to and from the serde persistence model
//! - [`netlist`] builds a circuit from a parsed SPICE-style netlist

mod graph;
mod types;
mod validate;

pub mod descriptor;
pub mod netlist;

pub use graph::Circuit;
pub use types::*;
pub use validate::validate_circuit;

//! WASM bindings for browsers.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmSimulator } from 'rtspice_core';
//!
//! await init();
//!
//! const descriptor = await (await fetch('fuzz.json')).text();
//! const sim = new WasmSimulator(descriptor, 48000);
//!
//! // In AudioWorkletProcessor.process():
//! sim.process_block(inputs[0][0], outputs[0][0]);
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::Circuit;
use crate::diagnostics::NullDiagnostics;
use crate::error::Error;
use crate::solver::{Simulator, SimulatorConfig};

impl From<Error> for JsValue {
    fn from(error: Error) -> Self {
        JsValue::from_str(&error.to_string())
    }
}

#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// A simulator for use from an AudioWorklet.
///
/// Diagnostics are discarded; the worklet has nowhere to log to.
#[wasm_bindgen]
pub struct WasmSimulator {
    simulator: Simulator,
}

impl WasmSimulator {
    fn build(circuit: &Circuit, sample_rate: f64, config: SimulatorConfig) -> Result<WasmSimulator, JsValue> {
        let simulator = Simulator::build(circuit, sample_rate, config, Box::new(NullDiagnostics))?;
        Ok(WasmSimulator { simulator })
    }
}

#[wasm_bindgen]
impl WasmSimulator {
    /// Build from a JSON circuit descriptor.
    #[wasm_bindgen(constructor)]
    pub fn new(descriptor_json: &str, sample_rate: f64) -> Result<WasmSimulator, JsValue> {
        let circuit = Circuit::from_json(descriptor_json)?;
        Self::build(&circuit, sample_rate, SimulatorConfig::default())
    }

    /// Build from a JSON circuit descriptor with custom Newton-Raphson settings.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(
        descriptor_json: &str,
        sample_rate: f64,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<WasmSimulator, JsValue> {
        let circuit = Circuit::from_json(descriptor_json)?;
        let config = SimulatorConfig::new()
            .with_max_iterations(max_iterations)
            .with_tolerance(tolerance);
        Self::build(&circuit, sample_rate, config)
    }

    /// Process a mono block: first input port in, first output port out.
    #[wasm_bindgen]
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        self.simulator.process_block(input, output);
    }

    /// Like [`Self::process_block`] but returns a new array.
    #[wasm_bindgen]
    pub fn process_block_alloc(&mut self, input: &[f32]) -> Vec<f32> {
        let mut output = vec![0.0; input.len()];
        self.simulator.process_block(input, &mut output);
        output
    }

    /// Process interleaved frames, one channel per port.
    #[wasm_bindgen]
    pub fn process_interleaved(&mut self, input: &[f32], output: &mut [f32]) {
        self.simulator.process_interleaved(input, output);
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.simulator.reset();
    }

    #[wasm_bindgen(getter)]
    pub fn sample_rate(&self) -> f64 {
        self.simulator.sample_rate()
    }

    #[wasm_bindgen(getter)]
    pub fn input_count(&self) -> usize {
        self.simulator.input_count()
    }

    #[wasm_bindgen(getter)]
    pub fn output_count(&self) -> usize {
        self.simulator.output_count()
    }

    /// Voltage of a top-level node, `undefined` if there is no such node.
    #[wasm_bindgen]
    pub fn node_voltage(&self, node_name: &str) -> Option<f64> {
        self.simulator.node_voltage(node_name)
    }
}

#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[wasm_bindgen]
pub fn default_sample_rate() -> f64 {
    crate::DEFAULT_SAMPLE_RATE
}

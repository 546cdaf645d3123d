//! Split between the assembly context and the real-time audio thread.
//!
//! [`channel`] creates a connected pair:
//!
//! - [`Engine`] lives on a normal thread. [`Engine::load`] validates,
//!   assembles and compiles a circuit, prepares a fully initialized
//!   [`Simulator`] and publishes it. Errors block publishing, so whatever was
//!   published before keeps running.
//! - [`Processor`] lives on the audio thread. At each block boundary it does a
//!   single non-blocking receive and, if a new program arrived, swaps it in
//!   whole. The retired program goes back to the engine to be freed there.
//!
//! ```text
//!   Engine ──program (bounded 1)──▶ Processor
//!   Engine ◀──retired (bounded)─── Processor
//!   Engine ◀──diagnostics (bounded)─ Processor
//! ```
//!
//! The processor never blocks, never logs and never allocates while
//! processing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};

use crate::circuit::Circuit;
use crate::diagnostics::{ChannelDiagnostics, Diagnostic, Diagnostics, TracingDiagnostics};
use crate::error::{Error, Result};
use crate::solver::{Simulator, SimulatorConfig};

/// Retired programs buffered before the audio thread frees them itself.
pub const RETIRED_CAPACITY: usize = 4;

/// Diagnostics buffered between drains. Further events are dropped and counted.
pub const DIAGNOSTICS_CAPACITY: usize = 256;

/// Create an engine and its real-time processor.
pub fn channel(sample_rate: f64, config: SimulatorConfig) -> (Engine, Processor) {
    let (program_tx, program_rx) = bounded(1);
    let (retired_tx, retired_rx) = bounded(RETIRED_CAPACITY);
    let (diagnostics_tx, diagnostics_rx) = bounded(DIAGNOSTICS_CAPACITY);
    let diagnostics = ChannelDiagnostics::new(diagnostics_tx);
    let stopped = Arc::new(AtomicBool::new(false));

    let engine = Engine {
        sample_rate,
        config,
        program_tx,
        pending: program_rx.clone(),
        retired_rx,
        diagnostics: diagnostics.clone(),
        diagnostics_rx,
        stopped: Arc::clone(&stopped),
        published: 0,
    };
    let processor = Processor {
        program: None,
        program_rx,
        retired_tx,
        diagnostics,
        stopped,
    };
    (engine, processor)
}

/// Non-real-time side: builds and publishes programs.
pub struct Engine {
    sample_rate: f64,
    config: SimulatorConfig,
    program_tx: Sender<Box<Simulator>>,
    /// Receiver clone used to replace a program the processor has not picked up
    pending: Receiver<Box<Simulator>>,
    retired_rx: Receiver<Box<Simulator>>,
    /// Sink handed to every published program, sharing the processor's drop counter
    diagnostics: ChannelDiagnostics,
    diagnostics_rx: Receiver<Diagnostic>,
    stopped: Arc<AtomicBool>,
    published: u64,
}

impl Engine {
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Number of programs published so far.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Whether the processor still exists. Only the engine and the processor
    /// hold the stop flag.
    pub fn is_connected(&self) -> bool {
        Arc::strong_count(&self.stopped) > 1
    }

    /// Build a program for `circuit` and publish it.
    ///
    /// On error nothing is published and the running program is unaffected.
    /// A program that cannot be handed over is an [`Error::PublishError`].
    pub fn load(&mut self, circuit: &Circuit) -> Result<()> {
        let mut simulator = Simulator::build(
            circuit,
            self.sample_rate,
            self.config.clone(),
            Box::new(TracingDiagnostics),
        )?;
        simulator.set_diagnostics(Box::new(self.diagnostics.clone()));

        // A program the processor has not picked up yet is superseded.
        while let Ok(stale) = self.pending.try_recv() {
            drop(stale);
        }

        if !self.is_connected() {
            tracing::warn!(circuit = circuit.name(), "processor is gone, load dropped");
            return Err(Error::PublishError {
                message: format!("no processor to run '{}'", circuit.name()),
            });
        }

        match self.program_tx.try_send(Box::new(simulator)) {
            Ok(()) => {
                self.published += 1;
                tracing::info!(circuit = circuit.name(), revision = circuit.revision(), "program published");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(circuit = circuit.name(), "program slot busy, load dropped");
                Err(Error::PublishError {
                    message: format!("program slot busy while loading '{}'", circuit.name()),
                })
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!(circuit = circuit.name(), "processor is gone, load dropped");
                Err(Error::PublishError {
                    message: format!("no processor to run '{}'", circuit.name()),
                })
            }
        }
    }

    /// Make the processor emit silence.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Let the processor run its program again.
    pub fn resume(&self) {
        self.stopped.store(false, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Free programs retired by the processor. Returns how many were freed.
    pub fn collect_retired(&self) -> usize {
        let mut count = 0;
        while let Ok(program) = self.retired_rx.try_recv() {
            drop(program);
            count += 1;
        }
        count
    }

    /// Real-time diagnostics dropped because the channel was full.
    pub fn dropped_diagnostics(&self) -> u64 {
        self.diagnostics.dropped()
    }

    /// Forward pending real-time diagnostics to `sink`. Returns how many were
    /// forwarded.
    pub fn drain_diagnostics(&self, sink: &mut dyn Diagnostics) -> usize {
        let mut count = 0;
        while let Ok(diagnostic) = self.diagnostics_rx.try_recv() {
            sink.report(diagnostic);
            count += 1;
        }
        count
    }
}

/// Real-time side: runs the most recently published program.
pub struct Processor {
    program: Option<Box<Simulator>>,
    program_rx: Receiver<Box<Simulator>>,
    retired_tx: Sender<Box<Simulator>>,
    diagnostics: ChannelDiagnostics,
    stopped: Arc<AtomicBool>,
}

impl Processor {
    /// Swap in a newly published program, if any.
    fn poll(&mut self) {
        let Ok(next) = self.program_rx.try_recv() else {
            return;
        };
        let unknowns = next.system().size();
        if let Some(old) = self.program.replace(next) {
            // Freed here only if the engine has not collected for a while.
            let _ = self.retired_tx.try_send(old);
        }
        self.diagnostics.report(Diagnostic::SystemSwapped { unknowns });
    }

    fn running(&mut self) -> Option<&mut Simulator> {
        self.poll();
        if self.stopped.load(Ordering::Acquire) {
            return None;
        }
        self.program.as_deref_mut()
    }

    /// Process a mono block. Emits silence when stopped or not loaded.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        match self.running() {
            Some(simulator) => simulator.process_block(input, output),
            None => output.fill(0.0),
        }
    }

    /// Process interleaved frames with explicit channel counts.
    pub fn process_frames(&mut self, input: &[f32], in_channels: usize, output: &mut [f32], out_channels: usize) {
        match self.running() {
            Some(simulator) => simulator.process_frames(input, in_channels, output, out_channels),
            None => output.fill(0.0),
        }
    }

    /// Whether a program has been received.
    pub fn is_loaded(&self) -> bool {
        self.program.is_some()
    }

    /// The running program.
    pub fn simulator(&self) -> Option<&Simulator> {
        self.program.as_deref()
    }

    /// Diagnostics dropped because the channel was full.
    pub fn dropped_diagnostics(&self) -> u64 {
        self.diagnostics.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Ground, Port, PortDirection, Resistor};

    fn follower(load: f64) -> Circuit {
        let mut c = Circuit::new("follower");
        c.add(Port::new("IN", 1, PortDirection::Input).into()).unwrap();
        c.add(Resistor::new("R1", load).into()).unwrap();
        c.add(Ground::new("GND").into()).unwrap();
        c.add(Port::new("OUT", 2, PortDirection::Output).into()).unwrap();
        c.connect_all("IN", &["a"]).unwrap();
        c.connect_all("R1", &["a", "0"]).unwrap();
        c.connect_all("GND", &["0"]).unwrap();
        c.connect_all("OUT", &["a"]).unwrap();
        c
    }

    #[test]
    fn test_silence_before_load() {
        let (_engine, mut processor) = channel(48000.0, SimulatorConfig::default());
        let mut out = [1.0f32; 4];
        processor.process_block(&[0.5; 4], &mut out);
        assert_eq!(out, [0.0; 4]);
        assert!(!processor.is_loaded());
    }

    #[test]
    fn test_load_then_process() {
        let (mut engine, mut processor) = channel(48000.0, SimulatorConfig::default());
        engine.load(&follower(1e3)).unwrap();
        let mut out = [0.0f32; 3];
        processor.process_block(&[0.25, 0.5, 1.0], &mut out);
        assert_eq!(out, [0.25, 0.5, 1.0]);

        let mut seen: Vec<Diagnostic> = Vec::new();
        engine.drain_diagnostics(&mut seen);
        assert_eq!(seen, vec![Diagnostic::SystemSwapped { unknowns: 2 }]);
    }

    #[test]
    fn test_failed_reload_keeps_running_program() {
        let (mut engine, mut processor) = channel(48000.0, SimulatorConfig::default());
        engine.load(&follower(1e3)).unwrap();

        let mut broken = follower(1e3);
        broken.add(Resistor::new("R2", 1e3).into()).unwrap();
        assert!(engine.load(&broken).is_err());
        assert_eq!(engine.published(), 1);

        let mut out = [0.0f32; 2];
        processor.process_block(&[0.5, 0.75], &mut out);
        assert_eq!(out, [0.5, 0.75]);
    }

    #[test]
    fn test_load_without_processor_fails() {
        let (mut engine, processor) = channel(48000.0, SimulatorConfig::default());
        assert!(engine.is_connected());
        drop(processor);
        assert!(!engine.is_connected());

        let err = engine.load(&follower(1e3)).unwrap_err();
        assert!(matches!(err, Error::PublishError { .. }), "{err}");
        assert_eq!(engine.published(), 0);
    }

    #[test]
    fn test_stop_gives_silence() {
        let (mut engine, mut processor) = channel(48000.0, SimulatorConfig::default());
        engine.load(&follower(1e3)).unwrap();
        engine.stop();
        let mut out = [1.0f32; 2];
        processor.process_block(&[0.5, 0.5], &mut out);
        assert_eq!(out, [0.0, 0.0]);

        engine.resume();
        processor.process_block(&[0.5, 0.5], &mut out);
        assert_eq!(out, [0.5, 0.5]);
    }

    #[test]
    fn test_reload_retires_previous_program() {
        let (mut engine, mut processor) = channel(48000.0, SimulatorConfig::default());
        engine.load(&follower(1e3)).unwrap();
        let mut out = [0.0f32; 1];
        processor.process_block(&[0.1], &mut out);

        engine.load(&follower(2e3)).unwrap();
        processor.process_block(&[0.1], &mut out);
        assert_eq!(engine.collect_retired(), 1);
        assert_eq!(engine.collect_retired(), 0);
    }

    #[test]
    fn test_unconsumed_program_is_replaced() {
        let (mut engine, mut processor) = channel(48000.0, SimulatorConfig::default());
        engine.load(&follower(1e3)).unwrap();
        engine.load(&follower(2e3)).unwrap();
        let mut out = [0.0f32; 1];
        processor.process_block(&[0.1], &mut out);
        assert_eq!(engine.collect_retired(), 0);
        assert_eq!(engine.published(), 2);
    }
}

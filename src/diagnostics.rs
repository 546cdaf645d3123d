//! Diagnostics sink for assembly and the drive loop.
//!
//! Nothing in the engine writes to global logging state from the audio path.
//! Instead, callers pass a [`Diagnostics`] sink: the assembly context reports
//! summaries and warnings, the drive loop reports per-step failures. Per-step
//! variants carry only plain numbers so producing them never allocates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::channel::{Sender, TrySendError};

/// One diagnostic event.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Assembly finished
    Assembled { unknowns: usize, equations: usize },
    /// Non-fatal assembly finding
    Warning(String),
    /// The DC operating point could not be found; the simulation starts from zero
    DcFallback,
    /// A new equation system was published
    Published { unknowns: usize, linear: bool },
    /// A step did not converge and produced its fallback output
    ConvergenceFailure {
        step: u64,
        iterations: usize,
        residual: f64,
    },
    /// A step ran out of its wall-clock budget and produced its fallback output
    DeadlineExceeded { step: u64, iterations: usize },
    /// The real-time side switched to a newly published system
    SystemSwapped { unknowns: usize },
}

impl Diagnostic {
    /// A step that produced its fallback output.
    pub fn is_step_failure(&self) -> bool {
        matches!(
            self,
            Diagnostic::ConvergenceFailure { .. } | Diagnostic::DeadlineExceeded { .. }
        )
    }
}

/// Receiver of diagnostics.
pub trait Diagnostics: Send {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Forwards diagnostics to `tracing`. Not for use on the audio thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::Assembled { unknowns, equations } => {
                tracing::debug!(unknowns, equations, "circuit assembled");
            }
            Diagnostic::Warning(message) => tracing::warn!("{message}"),
            Diagnostic::DcFallback => {
                tracing::warn!("no DC operating point, starting from the zero state");
            }
            Diagnostic::Published { unknowns, linear } => {
                tracing::info!(unknowns, linear, "equation system published");
            }
            Diagnostic::ConvergenceFailure {
                step,
                iterations,
                residual,
            } => {
                tracing::warn!(step, iterations, residual, "step did not converge");
            }
            Diagnostic::DeadlineExceeded { step, iterations } => {
                tracing::warn!(step, iterations, "step exceeded its deadline");
            }
            Diagnostic::SystemSwapped { unknowns } => {
                tracing::debug!(unknowns, "audio thread switched equation system");
            }
        }
    }
}

/// Collects diagnostics in memory.
impl Diagnostics for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Non-blocking sink for the audio thread. When the channel is full the
/// event is dropped and counted. Clones share the channel and the counter.
#[derive(Debug, Clone)]
pub struct ChannelDiagnostics {
    tx: Sender<Diagnostic>,
    dropped: Arc<AtomicU64>,
}

impl ChannelDiagnostics {
    pub fn new(tx: Sender<Diagnostic>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of events dropped because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Diagnostics for ChannelDiagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        match self.tx.try_send(diagnostic) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::bounded;

    #[test]
    fn test_channel_drops_when_full() {
        let (tx, rx) = bounded(1);
        let mut sink = ChannelDiagnostics::new(tx);
        sink.report(Diagnostic::DcFallback);
        sink.report(Diagnostic::DeadlineExceeded {
            step: 1,
            iterations: 2,
        });
        assert_eq!(sink.dropped(), 1);

        let mut clone = sink.clone();
        clone.report(Diagnostic::DcFallback);
        assert_eq!(sink.dropped(), 2);
        assert_eq!(rx.try_recv().unwrap(), Diagnostic::DcFallback);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_vec_collects() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        sink.report(Diagnostic::Warning("w".into()));
        assert_eq!(sink.len(), 1);
    }
}

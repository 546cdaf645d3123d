//! Error types for the rtspice circuit simulator.
//!
//! This module provides a unified error type [`Error`] that covers topology
//! edits, equation assembly, numerical solving and the CLI's I/O.
//!
//! Assembly-time kinds ([`Error::StructuralError`],
//! [`Error::UnresolvedDependencyError`], [`Error::SingularSystemError`]) block
//! publishing a new equation system. Per-step kinds
//! ([`Error::ConvergenceFailure`], [`Error::DeadlineExceeded`]) carry only
//! plain numbers so they can be produced on the audio thread without
//! allocating.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all rtspice operations.
#[derive(Error, Debug)]
pub enum Error {
    // ============ Topology Errors ============
    /// Bad topology: duplicate names, unknown terminals, floating terminals,
    /// cross-scope connections.
    #[error("Structural error: {message}")]
    StructuralError { message: String },

    /// Invalid parameter value
    #[error("Invalid parameter '{param}' for component '{component}': {message}")]
    InvalidParameter {
        component: String,
        param: String,
        message: String,
    },

    // ============ Assembly Errors ============
    /// A dependent-variable reference names no component, or resolving it
    /// does not terminate.
    #[error("Unresolved dependency '{name}': {message}")]
    UnresolvedDependencyError { name: String, message: String },

    /// Under- or over-determined network.
    #[error("Singular system: {message}")]
    SingularSystemError { message: String },

    // ============ Simulation Errors ============
    /// Newton-Raphson iteration did not converge
    #[error("Newton-Raphson did not converge after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailure { iterations: usize, residual: f64 },

    /// The step ran past its wall-clock budget
    #[error("Step exceeded its deadline after {iterations} iterations")]
    DeadlineExceeded { iterations: usize },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    // ============ Runtime Errors ============
    /// A prepared program could not be handed to the real-time side
    #[error("Program not published: {message}")]
    PublishError { message: String },

    // ============ I/O Errors ============
    /// Error reading circuit file
    #[error("Failed to read circuit file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A netlist entry that cannot be turned into a component
    #[error("Netlist entry '{entry}': {message}")]
    NetlistError { entry: String, message: String },

    /// Malformed topology descriptor
    #[error("Invalid circuit descriptor: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Error reading audio input
    #[error("Audio input error: {message}")]
    AudioInputError { message: String },

    /// Error writing audio output
    #[error("Audio output error: {message}")]
    AudioOutputError { message: String },
}

impl Error {
    /// Create a structural error
    pub fn structural(message: impl Into<String>) -> Self {
        Self::StructuralError {
            message: message.into(),
        }
    }

    /// Create an unresolved dependency error
    pub fn unresolved(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnresolvedDependencyError {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a singular system error
    pub fn singular(message: impl Into<String>) -> Self {
        Self::SingularSystemError {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        component: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            component: component.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a netlist error
    pub fn netlist(entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NetlistError {
            entry: entry.into(),
            message: message.into(),
        }
    }

    /// Create a convergence failure error
    pub fn convergence_failure(iterations: usize, residual: f64) -> Self {
        Self::ConvergenceFailure {
            iterations,
            residual,
        }
    }

    /// Whether this error is a recoverable per-step failure.
    pub fn is_step_failure(&self) -> bool {
        matches!(
            self,
            Self::ConvergenceFailure { .. } | Self::DeadlineExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failures_are_recoverable() {
        assert!(Error::convergence_failure(50, 1e-3).is_step_failure());
        assert!(Error::DeadlineExceeded { iterations: 3 }.is_step_failure());
        assert!(!Error::structural("duplicate").is_step_failure());
        assert!(!Error::singular("floating node").is_step_failure());
    }

    #[test]
    fn test_messages() {
        let err = Error::unresolved("R9", "no such component");
        assert_eq!(
            err.to_string(),
            "Unresolved dependency 'R9': no such component"
        );
    }
}

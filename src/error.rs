//! Error types for the stress/velocity stepping core

use thiserror::Error;

use crate::scheme::StepPhase;

pub type Result<T> = std::result::Result<T, ViscoError>;

#[derive(Debug, Error)]
pub enum ViscoError {
    // Precondition violations: the step must be abandoned.
    #[error("{component} used before reinit")]
    NotInitialized { component: &'static str },

    #[error("stale {component} context: built for mesh generation {expected}, solution is at generation {found}")]
    StaleContext {
        component: &'static str,
        expected: u64,
        found: u64,
    },

    #[error("scheme `{scheme}` needs {required} historical levels, solution holds {available}")]
    InsufficientHistory {
        scheme: &'static str,
        required: usize,
        available: usize,
    },

    #[error("step ordering violated: {0}")]
    StepOrder(String),

    #[error("vector length mismatch for {what}: expected {expected}, got {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("non-finite {field} value at DOF {dof}")]
    NonFiniteField { field: &'static str, dof: usize },

    // Numerical failure of a linear sub-solve.
    #[error("linear solve for {what} did not converge after {iterations} iterations (residual {residual:.3e})")]
    NonConvergence {
        what: String,
        iterations: usize,
        residual: f64,
    },

    // Configuration mismatch between a factory and its caller.
    #[error("{expected:?}-phase factory cannot build a {requested:?}-phase operator")]
    PhaseMismatch {
        expected: StepPhase,
        requested: StepPhase,
    },

    #[error("stress component {0} out of range")]
    InvalidComponent(usize),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ViscoError {
    /// True for errors that signal a broken stepping contract rather than a
    /// numerical or I/O failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ViscoError::NotInitialized { .. }
                | ViscoError::StaleContext { .. }
                | ViscoError::InsufficientHistory { .. }
                | ViscoError::StepOrder(_)
                | ViscoError::DimensionMismatch { .. }
                | ViscoError::NonFiniteField { .. }
        )
    }
}

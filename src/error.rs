//! Error types surfaced at construction-time boundaries.
//!
//! `simulate` itself never returns an error (see the crate-level docs):
//! degenerate input is clamped or downgraded to a static body instead. This
//! taxonomy exists for the narrower set of internal operations — mass
//! derivation, configuration validation — that can genuinely fail.

use thiserror::Error;

/// Result type alias for fallible physics construction operations.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

/// Errors raised by construction-time operations. None of these variants are
/// ever returned from `World::simulate`.
#[derive(Error, Debug, Clone)]
pub enum PhysicsError {
    /// A `SolverConfig`/`CollisionConfig` field is outside its documented
    /// range (e.g. `max_iterations == 0`).
    #[error("invalid configuration: {parameter} = {value}, expected {constraint}")]
    InvalidConfiguration {
        parameter: String,
        value: String,
        constraint: String,
    },

    /// An inertia tensor failed to invert during mass-property derivation.
    #[error("singular inertia tensor in {operation}: determinant = {determinant}")]
    SingularMatrix { operation: String, determinant: f64 },

    /// A defensive assertion tripped on a value that should be unreachable
    /// through the documented public API (e.g. NaN entering `apply_impulse`).
    #[error("invalid physical state: {0}")]
    InvalidPhysicalState(String),
}

impl PhysicsError {
    pub fn invalid_configuration(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidConfiguration {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    pub fn singular_matrix(operation: impl Into<String>, determinant: f64) -> Self {
        Self::SingularMatrix {
            operation: operation.into(),
            determinant,
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidPhysicalState(message.into())
    }
}

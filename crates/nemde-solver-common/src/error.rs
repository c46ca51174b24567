//! Error types for solver backends.

use thiserror::Error;

/// Errors that can occur while handing a problem to a backend.
///
/// A solve that completes with a non-optimal status is not an error; it is
/// reported through [`crate::SolutionStatus`].
#[derive(Debug, Error)]
pub enum SolverError {
    /// Unknown solver ID.
    #[error("Unknown solver: {0}")]
    UnknownSolver(String),

    /// Solver was not compiled into this build.
    #[error("Solver {solver} is not available. {hint}")]
    NotAvailable {
        solver: crate::SolverId,
        hint: String,
    },

    /// The problem uses a feature the backend cannot honour.
    #[error("Unsupported by backend: {0}")]
    Unsupported(String),

    /// Malformed problem (bad bounds, non-finite coefficients, dangling ids).
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// The backend itself failed (setup or numerical failure).
    #[error("Backend error: {0}")]
    Backend(String),

    /// Timeout while waiting for solver.
    #[error("Solver timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

/// Result type alias for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;

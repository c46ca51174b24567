//! Backend strategy trait.

use crate::{LinearProblem, LpSolution, SolverId, SolverResult};

/// Configuration passed to backend solvers.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum iterations
    pub max_iterations: u32,
    /// Convergence tolerance
    pub tolerance: f64,
    /// Timeout in seconds
    pub timeout_seconds: u64,
    /// Solve the continuous relaxation when the backend has no integer support.
    pub relax_integrality: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-8,
            timeout_seconds: 300,
            relax_integrality: true,
        }
    }
}

/// Implements the actual solving.
///
/// Backends return `Ok` for every completed solve, whatever its status;
/// `Err` is reserved for problems the backend could not even attempt.
pub trait SolverBackend: Send + Sync {
    fn id(&self) -> SolverId;

    /// Whether integer domains are enforced (otherwise they are relaxed).
    fn supports_integers(&self) -> bool;

    fn solve(&self, problem: &LinearProblem, config: &SolverConfig) -> SolverResult<LpSolution>;
}

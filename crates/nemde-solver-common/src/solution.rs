//! Solution representation returned by solver backends.

use serde::{Deserialize, Serialize};

use crate::{RowId, VarId};

/// Status of the solver solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Solver timed out.
    Timeout,
    /// Solver hit iteration limit.
    IterationLimit,
    /// Numerical difficulties.
    NumericalError,
    /// Generic error occurred.
    Error,
    /// Solution status unknown.
    Unknown,
}

impl SolutionStatus {
    /// Check if this status represents a successful solve.
    pub fn is_success(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }

    /// Check if this status represents a failure.
    pub fn is_failure(&self) -> bool {
        !self.is_success() && !matches!(self, SolutionStatus::Unknown)
    }

    /// Solver ran out of budget rather than proving anything about the model.
    pub fn is_limit(&self) -> bool {
        matches!(self, SolutionStatus::Timeout | SolutionStatus::IterationLimit)
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Infeasible => write!(f, "infeasible"),
            SolutionStatus::Unbounded => write!(f, "unbounded"),
            SolutionStatus::Timeout => write!(f, "timeout"),
            SolutionStatus::IterationLimit => write!(f, "iteration_limit"),
            SolutionStatus::NumericalError => write!(f, "numerical_error"),
            SolutionStatus::Error => write!(f, "error"),
            SolutionStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Primal and dual values from one solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpSolution {
    pub status: SolutionStatus,
    pub objective: f64,
    /// Primal value per variable, in problem order.
    pub values: Vec<f64>,
    /// d(objective)/d(rhs) per row, in problem order.
    pub duals: Vec<f64>,
    pub iterations: u32,
    pub solve_time_ms: u64,
    pub message: Option<String>,
}

impl LpSolution {
    /// Non-optimal result with no values.
    pub fn with_status(status: SolutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            objective: f64::NAN,
            values: Vec::new(),
            duals: Vec::new(),
            iterations: 0,
            solve_time_ms: 0,
            message: Some(message.into()),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_success()
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }

    pub fn dual(&self, row: RowId) -> f64 {
        self.duals.get(row.0).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(SolutionStatus::Optimal.is_success());
        assert!(SolutionStatus::Timeout.is_limit());
        assert!(SolutionStatus::IterationLimit.is_failure());
        assert!(!SolutionStatus::Infeasible.is_limit());
        assert!(!SolutionStatus::Unknown.is_failure());
        assert_eq!(SolutionStatus::IterationLimit.to_string(), "iteration_limit");
    }

    #[test]
    fn missing_entries_read_as_zero() {
        let sol = LpSolution::with_status(SolutionStatus::Infeasible, "no point");
        assert!(!sol.is_optimal());
        assert_eq!(sol.value(VarId(4)), 0.0);
        assert_eq!(sol.dual(RowId(0)), 0.0);
    }
}

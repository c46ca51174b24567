//! Error types for resolvers, model construction and the solve protocol.

use nemde_core::NemdeError;
use nemde_solver_common::{SolutionStatus, SolverError};
use thiserror::Error;

/// Input defects found while resolving one entity.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// Loss model cannot be turned into a piecewise function
    #[error("loss model of {interconnector}: {message}")]
    LossModel {
        interconnector: String,
        message: String,
    },

    /// FCAS offer without usable trapezium data
    #[error("FCAS trapezium of {trader} {service}: {message}")]
    Trapezium {
        trader: String,
        service: String,
        message: String,
    },

    /// Fast-start parameters that cannot be advanced
    #[error("fast start profile of {trader}: {message}")]
    FastStart { trader: String, message: String },

    /// Stack underflow, division by zero or a malformed term
    #[error("equation {equation} term {term}: {message}")]
    Equation {
        equation: String,
        term: usize,
        message: String,
    },

    /// Equations or constraints that reference each other
    #[error("equation cycle through {path}")]
    EquationCycle { path: String },
}

/// Outcome-level failure of one dispatch interval.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Casefile defect caught at ingestion
    #[error(transparent)]
    Input(#[from] NemdeError),

    /// Casefile defect caught while resolving
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Backend could not attempt the solve
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// No feasible point even with every violation variable free
    #[error("{pass} pass infeasible")]
    Infeasible { pass: String },

    #[error("{pass} pass unbounded")]
    Unbounded { pass: String },

    /// Timeout, iteration limit or numerical trouble
    #[error("{pass} pass inconclusive: {status}")]
    Inconclusive {
        pass: String,
        status: SolutionStatus,
    },

    #[error("interval cancelled")]
    Cancelled,
}

impl DispatchError {
    /// True when the casefile itself is at fault.
    pub fn is_input_error(&self) -> bool {
        match self {
            DispatchError::Input(e) => e.is_input_defect(),
            DispatchError::Resolve(_) => true,
            DispatchError::Solver(SolverError::InvalidProblem(_)) => true,
            _ => false,
        }
    }
}

impl From<DispatchError> for NemdeError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Input(e) => e,
            DispatchError::Resolve(e) => NemdeError::Validation(e.to_string()),
            other => NemdeError::Solver(other.to_string()),
        }
    }
}

/// Convenience alias for dispatch results.
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_errors_are_input_errors() {
        let err: DispatchError = ResolveError::EquationCycle {
            path: "A -> B -> A".into(),
        }
        .into();
        assert!(err.is_input_error());
        assert!(err.to_string().contains("A -> B -> A"));
    }

    #[test]
    fn inconclusive_is_not_an_input_error() {
        let err = DispatchError::Inconclusive {
            pass: "physical".into(),
            status: SolutionStatus::Timeout,
        };
        assert!(!err.is_input_error());
        assert_eq!(err.to_string(), "physical pass inconclusive: timeout");
        let core: NemdeError = err.into();
        assert!(matches!(core, NemdeError::Solver(_)));
    }
}

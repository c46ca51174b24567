//! Solver boundary for the dispatch engine.
//!
//! The model builder emits a [`LinearProblem`] (bounded variables with a
//! continuous/integer domain, sparse linear rows, a linear objective) and a
//! [`SolverBackend`] turns it into an [`LpSolution`] (status, primal values,
//! row duals). Any backend implementing the trait is interchangeable.
//!
//! # Supported Solvers
//!
//! | Solver | Problem Type | Reference |
//! |--------|--------------|-----------|
//! | Clarabel | LP (integrality relaxed) | Goulart et al. (2024) |
//! | HiGHS  | LP/MIP | Huangfu & Hall (2018) doi:[10.1007/s12532-017-0130-5] |
//!
//! # Dual convention
//!
//! Every backend reports `dual[r] = d(objective) / d(rhs[r])` regardless of
//! the row's sense, so a region balance row's dual is directly the regional
//! energy price.
//!
//! [10.1007/s12532-017-0130-5]: https://doi.org/10.1007/s12532-017-0130-5

pub mod backend;
pub mod error;
pub mod problem;
pub mod solution;

pub use backend::{SolverBackend, SolverConfig};
pub use error::{SolverError, SolverResult};
pub use problem::{LinearProblem, Row, RowId, RowSense, VarDomain, VarId, Variable};
pub use solution::{LpSolution, SolutionStatus};

/// Solver backends the dispatch engine can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverId {
    /// Clarabel - pure-Rust interior-point solver for conic programs.
    ///
    /// Always available. Solves the continuous relaxation; integer
    /// variables are relaxed to their bounds.
    ///
    /// **Algorithm:** Homogeneous self-dual interior-point method
    /// **Reference:** Goulart, P., Chen, Y., & Schwan, M. (2024). Clarabel:
    /// An interior-point solver for conic programs with quadratic objectives.
    /// [github.com/oxfordcontrol/Clarabel.rs](https://github.com/oxfordcontrol/Clarabel.rs)
    Clarabel,

    /// HiGHS - LP/MIP solver, available with the `solver-highs` feature.
    ///
    /// **Algorithm:** Dual revised simplex (LP); branch-and-cut (MIP)
    /// **Reference:** Huangfu, Q., & Hall, J. A. J. (2018). Parallelizing the dual
    /// revised simplex method. *Mathematical Programming Computation*, 10(1), 119-142.
    Highs,
}

impl SolverId {
    pub fn display_name(&self) -> &'static str {
        match self {
            SolverId::Clarabel => "Clarabel",
            SolverId::Highs => "HiGHS",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SolverId::Clarabel => "LP interior-point (integrality relaxed)",
            SolverId::Highs => "LP/MIP simplex + branch-and-cut",
        }
    }

    /// Whether the backend honours integer domains.
    pub fn supports_integers(&self) -> bool {
        matches!(self, SolverId::Highs)
    }

    pub fn all() -> &'static [SolverId] {
        &[SolverId::Clarabel, SolverId::Highs]
    }
}

impl std::fmt::Display for SolverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for SolverId {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clarabel" => Ok(SolverId::Clarabel),
            "highs" => Ok(SolverId::Highs),
            _ => Err(SolverError::UnknownSolver(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_id_parse() {
        assert_eq!("clarabel".parse::<SolverId>().unwrap(), SolverId::Clarabel);
        assert_eq!("HiGHS".parse::<SolverId>().unwrap(), SolverId::Highs);
        assert!(matches!(
            "cplex".parse::<SolverId>(),
            Err(SolverError::UnknownSolver(_))
        ));
    }

    #[test]
    fn test_solver_id_serde() {
        assert_eq!(
            serde_json::to_string(&SolverId::Highs).unwrap(),
            "\"highs\""
        );
    }

    #[test]
    fn test_integer_support() {
        assert!(!SolverId::Clarabel.supports_integers());
        assert!(SolverId::Highs.supports_integers());
        assert_eq!(SolverId::all().len(), 2);
    }
}

//! Built-in solver backends.
//!
//! Each backend wraps an existing solver and exposes it through the
//! [`SolverBackend`] trait.

mod clarabel;

#[cfg(feature = "solver-highs")]
mod highs;

pub use clarabel::ClarabelBackend;

#[cfg(feature = "solver-highs")]
pub use highs::HighsBackend;

use nemde_solver_common::{SolverBackend, SolverId, SolverResult};

/// Backend for `id`, or `NotAvailable` when it was not compiled in.
pub fn backend_for(id: SolverId) -> SolverResult<Box<dyn SolverBackend>> {
    match id {
        SolverId::Clarabel => Ok(Box::new(ClarabelBackend)),
        #[cfg(feature = "solver-highs")]
        SolverId::Highs => Ok(Box::new(HighsBackend)),
        #[cfg(not(feature = "solver-highs"))]
        SolverId::Highs => Err(nemde_solver_common::SolverError::NotAvailable {
            solver: id,
            hint: "rebuild with --features solver-highs".to_string(),
        }),
    }
}

/// Solvers compiled into this build.
pub fn available_solvers() -> Vec<SolverId> {
    SolverId::all()
        .iter()
        .copied()
        .filter(|id| backend_for(*id).is_ok())
        .collect()
}

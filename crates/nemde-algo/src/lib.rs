//! # nemde-algo: dispatch model compiler and solve protocol
//!
//! Turns one [`nemde_core::Casefile`] into a linear program, solves it through
//! a [`nemde_solver_common::SolverBackend`], maps the result onto the
//! published [`nemde_core::DispatchSolution`] schema and compares it with the
//! historical record.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Resolve | [`resolve`] | loss curves, scaled FCAS trapezia, fast-start states, constraint RHS |
//! | Build | [`model`] | [`model::DispatchModel`]: problem plus entity index |
//! | Solve | [`orchestrator`] | physical pass, optional pricing pass |
//! | Extract | [`extract`] | [`nemde_core::DispatchSolution`] |
//! | Validate | [`validation`] | [`validation::ValidationReport`] |
//!
//! [`interval::run_interval`] chains all of them and classifies the interval
//! as validated pass/fail, inconclusive or input error.
//!
//! ## Backends
//!
//! Clarabel (pure Rust, continuous) is always available and solves the LP
//! relaxation of the loss-curve binaries. With the `solver-highs` feature the
//! HiGHS backend enforces them exactly.
//!
//! ## Example
//!
//! ```ignore
//! use nemde_algo::{run_interval, CancelFlag, DispatchConfig};
//! use nemde_core::Casefile;
//!
//! let casefile = Casefile::from_path("20201101001.json".as_ref())?;
//! let outcome = run_interval(&casefile, &DispatchConfig::default(), &CancelFlag::new());
//! println!("{}: {}", outcome.case_id, outcome.kind);
//! ```

pub mod arena;
pub mod backends;
pub mod config;
pub mod error;
pub mod extract;
pub mod interval;
pub mod model;
pub mod orchestrator;
pub mod resolve;
pub mod test_fixtures;
pub mod validation;

pub use arena::ArenaContext;
pub use backends::{available_solvers, backend_for};
pub use config::{Algorithm, DispatchConfig, LossEncoding, SolverSettings};
pub use error::{DispatchError, DispatchResult, ResolveError};
pub use extract::extract_solution;
pub use interval::{run_casefile, run_interval, IntervalOutcome, OutcomeKind};
pub use model::{build_model, BuildOptions, DispatchModel, Pass, ViolationKind};
pub use orchestrator::{dispatch, CancelFlag, DispatchOrchestrator, DispatchRun, PassState};
pub use resolve::{resolve_inputs, ResolvedInputs};
pub use validation::{
    validate_solution, FieldClass, FieldResult, Tolerance, ValidationReport, ValidationTolerances,
};

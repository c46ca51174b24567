//! One interval end to end: ingest, dispatch, extract, validate.

use std::path::Path;

use nemde_core::{Casefile, CasefilePatch, DispatchSolution, NemdeError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use web_time::Instant;

use crate::arena::ArenaContext;
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::extract::extract_solution;
use crate::orchestrator::{CancelFlag, DispatchOrchestrator};
use crate::validation::{validate_solution, ValidationReport};

/// Outcome class of one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    ValidatedPass,
    ValidatedFail,
    /// Solved, but the casefile carries no historical record to compare.
    Solved,
    /// No feasible point for a pass, even with every violation variable free.
    Infeasible,
    /// Timeout, iteration limit, numerical trouble or cancellation.
    Inconclusive,
    InputError,
}

impl OutcomeKind {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeKind::ValidatedPass => "validated_pass",
            OutcomeKind::ValidatedFail => "validated_fail",
            OutcomeKind::Solved => "solved",
            OutcomeKind::Infeasible => "infeasible",
            OutcomeKind::Inconclusive => "inconclusive",
            OutcomeKind::InputError => "input_error",
        }
    }

    /// Solved, and either matched the historical record or had none.
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeKind::ValidatedPass | OutcomeKind::Solved)
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one interval, always attributable to its case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalOutcome {
    pub case_id: String,
    pub kind: OutcomeKind,
    pub solution: Option<DispatchSolution>,
    pub report: Option<ValidationReport>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl IntervalOutcome {
    fn failed(case_id: &str, kind: OutcomeKind, error: String, start: Instant) -> Self {
        Self {
            case_id: case_id.to_string(),
            kind,
            solution: None,
            report: None,
            error: Some(error),
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }
}

fn classify(err: &DispatchError) -> OutcomeKind {
    match err {
        DispatchError::Infeasible { .. } => OutcomeKind::Infeasible,
        err if err.is_input_error() => OutcomeKind::InputError,
        _ => OutcomeKind::Inconclusive,
    }
}

/// Dispatch a loaded casefile and validate it against its historical record.
pub fn run_interval(
    casefile: &Casefile,
    config: &DispatchConfig,
    cancel: &CancelFlag,
) -> IntervalOutcome {
    let start = Instant::now();
    let case_id = casefile.case_id();
    info!(case_id, "interval started");

    if let Err(err) = casefile.validate() {
        warn!(case_id, error = %err, "casefile rejected");
        return IntervalOutcome::failed(case_id, OutcomeKind::InputError, err.to_string(), start);
    }

    let orchestrator = match DispatchOrchestrator::new(config) {
        Ok(o) => o.with_cancel(cancel.clone()),
        Err(err) => {
            return IntervalOutcome::failed(case_id, classify(&err), err.to_string(), start)
        }
    };
    // Scratch memory for this interval only, dropped on every exit path.
    let mut arena = ArenaContext::new();
    let run = match orchestrator.run(casefile, &mut arena) {
        Ok(run) => run,
        Err(err) => {
            let kind = classify(&err);
            warn!(case_id, outcome = %kind, error = %err, "interval not solved");
            return IntervalOutcome::failed(case_id, kind, err.to_string(), start);
        }
    };

    let solution = extract_solution(casefile, &run);
    let report = casefile
        .historical
        .as_ref()
        .map(|historical| validate_solution(&solution, historical, &config.validation));
    let kind = match &report {
        Some(r) if r.passed => OutcomeKind::ValidatedPass,
        Some(_) => OutcomeKind::ValidatedFail,
        None => OutcomeKind::Solved,
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        case_id,
        outcome = %kind,
        solves = run.solves,
        failures = report.as_ref().map(|r| r.failure_count()).unwrap_or(0),
        elapsed_ms,
        "interval finished"
    );

    IntervalOutcome {
        case_id: case_id.to_string(),
        kind,
        solution: Some(solution),
        report,
        error: None,
        elapsed_ms,
    }
}

/// Load a casefile (with optional patches) and run it. Unreadable or
/// malformed files are input errors of that interval.
pub fn run_casefile(
    path: &Path,
    patches: &[CasefilePatch],
    config: &DispatchConfig,
    cancel: &CancelFlag,
) -> IntervalOutcome {
    match Casefile::from_path_with_patches(path, patches) {
        Ok(casefile) => run_interval(&casefile, config, cancel),
        Err(err) => {
            let case_id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let kind = if err.is_input_defect() || matches!(err, NemdeError::Io(_)) {
                OutcomeKind::InputError
            } else {
                OutcomeKind::Inconclusive
            };
            warn!(case_id = %case_id, error = %err, "casefile could not be loaded");
            IntervalOutcome::failed(&case_id, kind, err.to_string(), Instant::now())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;
    use nemde_solver_common::SolutionStatus;

    #[test]
    fn casefile_without_history_is_solved() {
        let casefile = test_fixtures::single_region();
        let outcome = run_interval(&casefile, &DispatchConfig::default(), &CancelFlag::new());
        assert_eq!(outcome.kind, OutcomeKind::Solved);
        assert!(outcome.solution.is_some());
        assert!(outcome.report.is_none());
    }

    #[test]
    fn history_matching_the_solve_validates() {
        let mut casefile = test_fixtures::single_region();
        let first = run_interval(&casefile, &DispatchConfig::default(), &CancelFlag::new());
        casefile.historical = first.solution;
        let second = run_interval(&casefile, &DispatchConfig::default(), &CancelFlag::new());
        assert_eq!(second.kind, OutcomeKind::ValidatedPass);
    }

    #[test]
    fn invalid_casefile_is_an_input_error() {
        let mut casefile = test_fixtures::single_region();
        casefile.traders[0].region_id = "QLD1".into();
        let outcome = run_interval(&casefile, &DispatchConfig::default(), &CancelFlag::new());
        assert_eq!(outcome.kind, OutcomeKind::InputError);
        assert!(outcome.error.unwrap().contains("region_id"));
    }

    #[test]
    fn infeasible_pass_is_not_a_timeout() {
        let infeasible = DispatchError::Infeasible {
            pass: "physical".into(),
        };
        assert_eq!(classify(&infeasible), OutcomeKind::Infeasible);
        let timeout = DispatchError::Inconclusive {
            pass: "physical".into(),
            status: SolutionStatus::Timeout,
        };
        assert_eq!(classify(&timeout), OutcomeKind::Inconclusive);
        assert_eq!(classify(&DispatchError::Cancelled), OutcomeKind::Inconclusive);
        assert_eq!(OutcomeKind::Infeasible.to_string(), "infeasible");
        assert!(!OutcomeKind::Infeasible.is_success());
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let outcome = run_casefile(
            Path::new("/nonexistent/20201101001.json"),
            &[],
            &DispatchConfig::default(),
            &CancelFlag::new(),
        );
        assert_eq!(outcome.kind, OutcomeKind::InputError);
        assert_eq!(outcome.case_id, "20201101001");
    }
}

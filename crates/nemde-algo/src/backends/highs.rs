//! HiGHS backend (exact MILP through `good_lp`).
//!
//! HiGHS enforces the integer domains of the loss-curve encodings. Row duals
//! are not meaningful for a MILP, so once the integer solution is known the
//! integers are fixed and the remaining LP is re-solved with Clarabel; that
//! LP's values and duals are reported.

use good_lp::solvers::highs::highs as highs_solver;
use good_lp::{constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel};
use nemde_solver_common::{
    LinearProblem, LpSolution, RowSense, SolutionStatus, SolverBackend, SolverConfig, SolverId,
    SolverResult, VarDomain,
};
use tracing::debug;
use web_time::Instant;

use super::ClarabelBackend;

pub struct HighsBackend;

impl HighsBackend {
    /// Integer values of the MILP optimum, or the status that stopped it.
    fn solve_integers(
        problem: &LinearProblem,
        config: &SolverConfig,
    ) -> Result<Vec<f64>, LpSolution> {
        let mut vars = variables!();
        let handles: Vec<good_lp::Variable> = problem
            .variables
            .iter()
            .map(|v| {
                let mut def = variable();
                if v.lower.is_finite() {
                    def = def.min(v.lower);
                }
                if v.upper.is_finite() {
                    def = def.max(v.upper);
                }
                if v.domain == VarDomain::Integer {
                    def = def.integer();
                }
                vars.add(def)
            })
            .collect();

        let objective: Expression = problem
            .variables
            .iter()
            .zip(&handles)
            .filter(|(v, _)| v.cost != 0.0)
            .map(|(v, h)| v.cost * *h)
            .sum();

        let mut model = vars
            .minimise(objective)
            .using(highs_solver)
            .set_time_limit(config.timeout_seconds as f64);
        for row in &problem.rows {
            let lhs: Expression = row.terms.iter().map(|(var, a)| *a * handles[var.0]).sum();
            model = match row.sense {
                RowSense::Le => model.with(constraint!(lhs <= row.rhs)),
                RowSense::Ge => model.with(constraint!(lhs >= row.rhs)),
                RowSense::Eq => model.with(constraint!(lhs == row.rhs)),
            };
        }

        match model.solve() {
            Ok(solution) => Ok(handles.iter().map(|h| solution.value(*h)).collect()),
            Err(ResolutionError::Infeasible) => Err(LpSolution::with_status(
                SolutionStatus::Infeasible,
                "HiGHS: infeasible",
            )),
            Err(ResolutionError::Unbounded) => Err(LpSolution::with_status(
                SolutionStatus::Unbounded,
                "HiGHS: unbounded",
            )),
            Err(other) => {
                let message = other.to_string();
                let status = if message.to_lowercase().contains("time") {
                    SolutionStatus::Timeout
                } else {
                    SolutionStatus::Error
                };
                Err(LpSolution::with_status(status, format!("HiGHS: {message}")))
            }
        }
    }
}

impl SolverBackend for HighsBackend {
    fn id(&self) -> SolverId {
        SolverId::Highs
    }

    fn supports_integers(&self) -> bool {
        true
    }

    fn solve(&self, problem: &LinearProblem, config: &SolverConfig) -> SolverResult<LpSolution> {
        problem.validate()?;
        let start = Instant::now();

        let values = match Self::solve_integers(problem, config) {
            Ok(values) => values,
            Err(failed) => return Ok(failed),
        };

        let mut fixed = problem.clone();
        for var in problem.integer_vars() {
            let value = values[var.0].round();
            fixed.fix_variable(var, value);
            fixed.variables[var.0].domain = VarDomain::Continuous;
        }
        debug!(
            problem = %problem.name,
            integers = problem.integer_vars().count(),
            "HiGHS integer solve finished, re-solving fixed LP for duals"
        );

        let mut solution = ClarabelBackend.solve(&fixed, config)?;
        solution.solve_time_ms = start.elapsed().as_millis() as u64;
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_choice_is_enforced() {
        // min -x  s.t.  x <= 1.5 u, u binary, x <= 1.2  ->  x = 1.2, u = 1
        let mut lp = LinearProblem::new("mip");
        let x = lp.add_variable("x", 0.0, 1.2, VarDomain::Continuous);
        let u = lp.add_binary("u");
        lp.add_cost(x, -1.0);
        lp.add_cost(u, 0.1);
        lp.add_row("link", vec![(x, 1.0), (u, -1.5)], RowSense::Le, 0.0);
        let sol = HighsBackend.solve(&lp, &SolverConfig::default()).unwrap();
        assert!(sol.is_optimal());
        assert!((sol.value(u) - 1.0).abs() < 1e-6);
        assert!((sol.value(x) - 1.2).abs() < 1e-5);
    }
}

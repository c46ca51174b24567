//! Clarabel backend for the continuous dispatch problem.
//!
//! Clarabel solves
//!
//! ```text
//! minimize    q'x
//! subject to  Ax + s = b,  s ∈ {0}^m_eq × R+^m_ineq
//! ```
//!
//! so every row and finite variable bound is written as an equality or a
//! `≤` row: `Ge` rows are negated and bounds become single-entry rows.
//! Integer domains are relaxed to their bounds.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettingsBuilder, IPSolver, SolverStatus, SupportedConeT};
use nemde_solver_common::{
    LinearProblem, LpSolution, RowSense, SolutionStatus, SolverBackend, SolverConfig,
    SolverError, SolverId, SolverResult,
};
use sprs::TriMat;
use tracing::debug;
use web_time::Instant;

/// Pure-Rust interior-point backend; always available.
pub struct ClarabelBackend;

/// One problem row placed in the conic system.
#[derive(Debug, Clone, Copy)]
struct Placement {
    index: usize,
    /// +1 when stored as written, -1 when negated to fit `≤`.
    sign: f64,
}

struct ConicForm {
    a: CscMatrix<f64>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
    rows: Vec<Placement>,
}

fn conic_form(problem: &LinearProblem) -> ConicForm {
    let n = problem.num_vars();
    let mut eq: Vec<(Vec<(usize, f64)>, f64)> = Vec::new();
    let mut ineq: Vec<(Vec<(usize, f64)>, f64)> = Vec::new();
    // (is_eq, position within its block, sign)
    let mut slots: Vec<(bool, usize, f64)> = Vec::with_capacity(problem.num_rows());

    for row in &problem.rows {
        let terms: Vec<(usize, f64)> = row.terms.iter().map(|(v, a)| (v.0, *a)).collect();
        match row.sense {
            RowSense::Eq => {
                slots.push((true, eq.len(), 1.0));
                eq.push((terms, row.rhs));
            }
            RowSense::Le => {
                slots.push((false, ineq.len(), 1.0));
                ineq.push((terms, row.rhs));
            }
            RowSense::Ge => {
                slots.push((false, ineq.len(), -1.0));
                ineq.push((terms.into_iter().map(|(j, a)| (j, -a)).collect(), -row.rhs));
            }
        }
    }

    for (j, var) in problem.variables.iter().enumerate() {
        if var.lower == var.upper && var.lower.is_finite() {
            eq.push((vec![(j, 1.0)], var.lower));
            continue;
        }
        if var.upper.is_finite() {
            ineq.push((vec![(j, 1.0)], var.upper));
        }
        if var.lower.is_finite() {
            ineq.push((vec![(j, -1.0)], -var.lower));
        }
    }

    let n_eq = eq.len();
    let m = n_eq + ineq.len();
    let mut triplets = TriMat::new((m, n));
    let mut b = Vec::with_capacity(m);
    for (i, (terms, rhs)) in eq.iter().chain(ineq.iter()).enumerate() {
        for &(j, a) in terms {
            if a != 0.0 {
                triplets.add_triplet(i, j, a);
            }
        }
        b.push(*rhs);
    }
    let csc: sprs::CsMat<f64> = triplets.to_csc();
    let (indptr, indices, data) = csc.into_raw_storage();
    let a = CscMatrix::new(m, n, indptr, indices, data);

    let mut cones = Vec::with_capacity(2);
    if n_eq > 0 {
        cones.push(SupportedConeT::ZeroConeT(n_eq));
    }
    if m > n_eq {
        cones.push(SupportedConeT::NonnegativeConeT(m - n_eq));
    }

    let rows = slots
        .into_iter()
        .map(|(is_eq, pos, sign)| Placement {
            index: if is_eq { pos } else { n_eq + pos },
            sign,
        })
        .collect();

    ConicForm { a, b, cones, rows }
}

fn map_status(status: SolverStatus) -> SolutionStatus {
    match status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => SolutionStatus::Optimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            SolutionStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            SolutionStatus::Unbounded
        }
        SolverStatus::MaxTime => SolutionStatus::Timeout,
        SolverStatus::MaxIterations => SolutionStatus::IterationLimit,
        _ => SolutionStatus::NumericalError,
    }
}

impl SolverBackend for ClarabelBackend {
    fn id(&self) -> SolverId {
        SolverId::Clarabel
    }

    fn supports_integers(&self) -> bool {
        false
    }

    fn solve(&self, problem: &LinearProblem, config: &SolverConfig) -> SolverResult<LpSolution> {
        problem.validate()?;
        if problem.has_integers() && !config.relax_integrality {
            return Err(SolverError::Unsupported(
                "Clarabel cannot enforce integer variables; enable relax_integrality or use HiGHS"
                    .to_string(),
            ));
        }

        let start = Instant::now();
        let n = problem.num_vars();
        if n == 0 {
            return Ok(LpSolution {
                status: SolutionStatus::Optimal,
                objective: problem.objective_offset,
                values: Vec::new(),
                duals: vec![0.0; problem.num_rows()],
                iterations: 0,
                solve_time_ms: 0,
                message: None,
            });
        }

        let form = conic_form(problem);
        let q: Vec<f64> = problem.variables.iter().map(|v| v.cost).collect();
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .max_iter(config.max_iterations)
            .time_limit(config.timeout_seconds as f64)
            .tol_gap_abs(config.tolerance)
            .tol_gap_rel(config.tolerance)
            .tol_feas(config.tolerance)
            .build()
            .map_err(|e| SolverError::Backend(format!("Clarabel settings error: {:?}", e)))?;

        let mut solver =
            clarabel::solver::DefaultSolver::new(&p, &q, &form.a, &form.b, &form.cones, settings)
                .map_err(|e| {
                    SolverError::Backend(format!("Clarabel initialization failed: {:?}", e))
                })?;
        solver.solve();

        let sol = solver.solution;
        let status = map_status(sol.status);
        debug!(
            problem = %problem.name,
            clarabel_status = ?sol.status,
            iterations = sol.iterations,
            "clarabel solve finished"
        );
        if status != SolutionStatus::Optimal {
            let mut result =
                LpSolution::with_status(status, format!("Clarabel status {:?}", sol.status));
            result.iterations = sol.iterations;
            result.solve_time_ms = start.elapsed().as_millis() as u64;
            return Ok(result);
        }

        // z is the multiplier of Ax + s = b; d(obj)/d(b) = -z.
        let duals = form
            .rows
            .iter()
            .map(|placement| -placement.sign * sol.z[placement.index])
            .collect();

        Ok(LpSolution {
            status,
            objective: problem.objective_value(&sol.x),
            values: sol.x.clone(),
            duals,
            iterations: sol.iterations,
            solve_time_ms: start.elapsed().as_millis() as u64,
            message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nemde_solver_common::VarDomain;

    fn config() -> SolverConfig {
        SolverConfig::default()
    }

    #[test]
    fn cheapest_supply_meets_demand() {
        // min 10 g1 + 20 g2  s.t.  g1 + g2 = 80, g1 <= 50
        let mut lp = LinearProblem::new("two_gen");
        let g1 = lp.add_variable("g1", 0.0, 50.0, VarDomain::Continuous);
        let g2 = lp.add_variable("g2", 0.0, 100.0, VarDomain::Continuous);
        lp.add_cost(g1, 10.0);
        lp.add_cost(g2, 20.0);
        let balance = lp.add_row("balance", vec![(g1, 1.0), (g2, 1.0)], RowSense::Eq, 80.0);

        let sol = ClarabelBackend.solve(&lp, &config()).unwrap();
        assert_eq!(sol.status, SolutionStatus::Optimal);
        assert!((sol.value(g1) - 50.0).abs() < 1e-4);
        assert!((sol.value(g2) - 30.0).abs() < 1e-4);
        assert!((sol.objective - 1100.0).abs() < 1e-3);
        // marginal unit comes from g2
        assert!((sol.dual(balance) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn dual_signs_follow_rhs_sensitivity() {
        // min x  s.t.  x >= 5   (dual +1)
        // min -y s.t.  y <= 3   (dual -1)
        let mut lp = LinearProblem::new("signs");
        let x = lp.add_variable("x", f64::NEG_INFINITY, f64::INFINITY, VarDomain::Continuous);
        let y = lp.add_variable("y", f64::NEG_INFINITY, f64::INFINITY, VarDomain::Continuous);
        lp.add_cost(x, 1.0);
        lp.add_cost(y, -1.0);
        let ge = lp.add_row("ge", vec![(x, 1.0)], RowSense::Ge, 5.0);
        let le = lp.add_row("le", vec![(y, 1.0)], RowSense::Le, 3.0);

        let sol = ClarabelBackend.solve(&lp, &config()).unwrap();
        assert!((sol.dual(ge) - 1.0).abs() < 1e-5);
        assert!((sol.dual(le) + 1.0).abs() < 1e-5);
    }

    #[test]
    fn infeasible_rows_report_status() {
        let mut lp = LinearProblem::new("infeasible");
        let x = lp.add_variable("x", 0.0, 1.0, VarDomain::Continuous);
        lp.add_row("too_much", vec![(x, 1.0)], RowSense::Ge, 2.0);
        let sol = ClarabelBackend.solve(&lp, &config()).unwrap();
        assert_eq!(sol.status, SolutionStatus::Infeasible);
        assert!(sol.values.is_empty());
    }

    #[test]
    fn fixed_variables_become_equalities() {
        let mut lp = LinearProblem::new("fixed");
        let x = lp.add_variable("x", 0.0, 10.0, VarDomain::Continuous);
        lp.add_cost(x, 1.0);
        lp.fix_variable(x, 4.0);
        let sol = ClarabelBackend.solve(&lp, &config()).unwrap();
        assert!((sol.value(x) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn integers_need_relaxation() {
        let mut lp = LinearProblem::new("mip");
        lp.add_binary("u");
        let strict = SolverConfig {
            relax_integrality: false,
            ..SolverConfig::default()
        };
        assert!(matches!(
            ClarabelBackend.solve(&lp, &strict),
            Err(SolverError::Unsupported(_))
        ));
        assert!(ClarabelBackend.solve(&lp, &config()).is_ok());
    }
}

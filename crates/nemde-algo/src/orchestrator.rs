//! Two-pass solve protocol for one interval.
//!
//! The orchestrator:
//! 1. Resolves loss curves, trapezia, fast-start states and constraint RHS
//! 2. Builds and solves the physical pass (with a fast-start commitment
//!    re-solve under [`Algorithm::Default`])
//! 3. If the case carries an intervention, builds the pricing pass with
//!    intervention constraints dropped and directed units fixed, and solves it
//!
//! Passes are driven by [`PassState`]; a case without intervention goes
//! straight from `Physical` to `Done`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nemde_core::{Casefile, FastStartMode, TraderId};
use nemde_solver_common::{LpSolution, SolutionStatus, SolverBackend};
use tracing::{debug, info};

use crate::arena::ArenaContext;
use crate::backends::backend_for;
use crate::config::{Algorithm, DispatchConfig};
use crate::error::{DispatchError, DispatchResult};
use crate::model::{build_model, BuildOptions, DispatchModel, Pass};
use crate::resolve::{resolve_inputs, ResolvedInputs};

/// Cooperative cancellation shared between a caller and one interval.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Where the protocol stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Physical,
    Pricing,
    Done,
}

impl PassState {
    /// Next state after a pass completes.
    pub fn advance(self, intervention: bool) -> PassState {
        match self {
            PassState::Physical if intervention => PassState::Pricing,
            PassState::Physical | PassState::Pricing | PassState::Done => PassState::Done,
        }
    }
}

/// Model and optimal solution of one pass.
#[derive(Debug, Clone)]
pub struct SolvedPass {
    pub model: DispatchModel,
    pub solution: LpSolution,
    /// Inputs the model was built from, including fast-start commitments.
    pub resolved: ResolvedInputs,
}

/// Everything the protocol produced for one interval.
#[derive(Debug, Clone)]
pub struct DispatchRun {
    pub physical: SolvedPass,
    pub pricing: Option<SolvedPass>,
    /// Solver calls made, including fast-start re-solves.
    pub solves: u32,
}

impl DispatchRun {
    /// Pass whose duals are published as prices.
    pub fn price_pass(&self) -> &SolvedPass {
        self.pricing.as_ref().unwrap_or(&self.physical)
    }
}

/// Runs the solve protocol for casefiles with one backend and configuration.
pub struct DispatchOrchestrator<'a> {
    config: &'a DispatchConfig,
    backend: Box<dyn SolverBackend>,
    cancel: CancelFlag,
}

impl<'a> DispatchOrchestrator<'a> {
    /// Orchestrator using the backend named in `config.solver`.
    pub fn new(config: &'a DispatchConfig) -> DispatchResult<Self> {
        Ok(Self {
            config,
            backend: backend_for(config.solver.backend)?,
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_backend(config: &'a DispatchConfig, backend: Box<dyn SolverBackend>) -> Self {
        Self {
            config,
            backend,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn backend(&self) -> &dyn SolverBackend {
        self.backend.as_ref()
    }

    /// Run every pass the case needs. `arena` is reset before each build.
    pub fn run(&self, casefile: &Casefile, arena: &mut ArenaContext) -> DispatchResult<DispatchRun> {
        let resolved = resolve_inputs(casefile, self.config)?;
        let intervention = casefile.case.intervention;
        let mut solves = 0u32;
        let mut state = PassState::Physical;
        let mut physical: Option<SolvedPass> = None;
        let mut pricing: Option<SolvedPass> = None;

        while state != PassState::Done {
            match state {
                PassState::Physical => {
                    let pass = self.physical_pass(casefile, resolved.clone(), arena, &mut solves)?;
                    physical = Some(pass);
                }
                PassState::Pricing => {
                    let Some(first) = physical.as_ref() else {
                        break;
                    };
                    let fixed_energy = intervened_energy(casefile, first);
                    debug!(
                        case_id = casefile.case_id(),
                        fixed = fixed_energy.len(),
                        "pricing pass fixes directed units"
                    );
                    let options = BuildOptions {
                        pass: Pass::Pricing,
                        profiles_active: true,
                        fixed_energy,
                        integers_relaxed: self.integers_relaxed(),
                    };
                    let pass =
                        self.solve_pass(casefile, first.resolved.clone(), &options, arena, &mut solves)?;
                    pricing = Some(pass);
                }
                PassState::Done => {}
            }
            state = state.advance(intervention);
        }

        let physical = physical.ok_or_else(|| DispatchError::Infeasible {
            pass: Pass::Physical.to_string(),
        })?;
        Ok(DispatchRun {
            physical,
            pricing,
            solves,
        })
    }

    fn integers_relaxed(&self) -> bool {
        !self.backend.supports_integers()
    }

    fn physical_pass(
        &self,
        casefile: &Casefile,
        mut resolved: ResolvedInputs,
        arena: &mut ArenaContext,
        solves: &mut u32,
    ) -> DispatchResult<SolvedPass> {
        let mut options = BuildOptions {
            pass: Pass::Physical,
            profiles_active: true,
            fixed_energy: HashMap::new(),
            integers_relaxed: self.integers_relaxed(),
        };
        if self.config.algorithm == Algorithm::DispatchOnly {
            return self.solve_pass(casefile, resolved, &options, arena, solves);
        }

        // Commitment solve: which uncommitted fast-start units are wanted?
        options.profiles_active = false;
        let trial = self.solve_pass(casefile, resolved.clone(), &options, arena, solves)?;
        let mut committed = 0usize;
        for (trader, vars) in casefile.traders.iter().zip(&trial.model.traders) {
            let Some(profile) = &trader.fast_start else {
                continue;
            };
            if profile.current_mode != FastStartMode::Uncommitted {
                continue;
            }
            let target = vars.energy().map(|e| trial.solution.value(e)).unwrap_or(0.0);
            if target > self.config.fast_start_threshold {
                resolved.commit_fast_start(trader, self.config.interval_minutes)?;
                committed += 1;
            }
        }
        debug!(
            case_id = casefile.case_id(),
            committed, "fast-start commitment solve finished"
        );

        options.profiles_active = true;
        self.solve_pass(casefile, resolved, &options, arena, solves)
    }

    fn solve_pass(
        &self,
        casefile: &Casefile,
        resolved: ResolvedInputs,
        options: &BuildOptions,
        arena: &mut ArenaContext,
        solves: &mut u32,
    ) -> DispatchResult<SolvedPass> {
        if self.cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        arena.reset();
        let model = build_model(casefile, &resolved, self.config, options, arena)?;
        let solution = self
            .backend
            .solve(&model.problem, &self.config.solver.solver_config())?;
        *solves += 1;
        debug!(
            case_id = casefile.case_id(),
            pass = %options.pass,
            solver = %self.backend.id(),
            status = %solution.status,
            objective = solution.objective,
            iterations = solution.iterations,
            solve_time_ms = solution.solve_time_ms,
            "pass solved"
        );
        check_status(options.pass, &solution)?;
        Ok(SolvedPass {
            model,
            solution,
            resolved,
        })
    }
}

/// Map a non-optimal status onto the outcome taxonomy.
pub fn check_status(pass: Pass, solution: &LpSolution) -> DispatchResult<()> {
    match solution.status {
        SolutionStatus::Optimal => Ok(()),
        SolutionStatus::Infeasible => Err(DispatchError::Infeasible {
            pass: pass.to_string(),
        }),
        SolutionStatus::Unbounded => Err(DispatchError::Unbounded {
            pass: pass.to_string(),
        }),
        status => Err(DispatchError::Inconclusive {
            pass: pass.to_string(),
            status,
        }),
    }
}

/// Physical-pass energy of every trader named by an intervention constraint.
fn intervened_energy(casefile: &Casefile, physical: &SolvedPass) -> HashMap<TraderId, f64> {
    let mut fixed = HashMap::new();
    for constraint in casefile.constraints.iter().filter(|c| c.intervention) {
        for term in &constraint.lhs.traders {
            if !term.trade_type.is_energy() {
                continue;
            }
            let Some(vars) = physical.model.trader(term.trader_id.as_str()) else {
                continue;
            };
            if let Some(energy) = vars.energy() {
                fixed.insert(term.trader_id.clone(), physical.solution.value(energy));
            }
        }
    }
    fixed
}

/// Convenience wrapper: one orchestrator, one arena, one casefile.
pub fn dispatch(casefile: &Casefile, config: &DispatchConfig) -> DispatchResult<DispatchRun> {
    let orchestrator = DispatchOrchestrator::new(config)?;
    let mut arena = ArenaContext::new();
    info!(
        case_id = casefile.case_id(),
        solver = %orchestrator.backend().id(),
        algorithm = %config.algorithm,
        "dispatching interval"
    );
    orchestrator.run(casefile, &mut arena)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;

    #[test]
    fn pass_state_machine() {
        assert_eq!(PassState::Physical.advance(false), PassState::Done);
        assert_eq!(PassState::Physical.advance(true), PassState::Pricing);
        assert_eq!(PassState::Pricing.advance(true), PassState::Done);
        assert_eq!(PassState::Done.advance(true), PassState::Done);
    }

    #[test]
    fn no_intervention_is_single_pass() {
        let casefile = test_fixtures::single_region();
        let config = DispatchConfig {
            algorithm: Algorithm::DispatchOnly,
            ..DispatchConfig::default()
        };
        let run = dispatch(&casefile, &config).unwrap();
        assert!(run.pricing.is_none());
        assert_eq!(run.solves, 1);
    }

    #[test]
    fn default_algorithm_adds_commitment_solve() {
        let casefile = test_fixtures::single_region();
        let run = dispatch(&casefile, &DispatchConfig::default()).unwrap();
        assert_eq!(run.solves, 2);
    }

    #[test]
    fn intervention_runs_pricing_pass() {
        let casefile = test_fixtures::intervention();
        let config = DispatchConfig {
            algorithm: Algorithm::DispatchOnly,
            ..DispatchConfig::default()
        };
        let run = dispatch(&casefile, &config).unwrap();
        let pricing = run.pricing.as_ref().unwrap();
        assert_eq!(pricing.model.pass, Pass::Pricing);
        assert!(pricing.model.constraints.is_empty());
        let g2 = pricing.model.trader("G2").unwrap().energy().unwrap();
        assert!((pricing.solution.value(g2) - 60.0).abs() < 1e-3);
    }

    #[test]
    fn cancelled_flag_stops_before_solving() {
        let casefile = test_fixtures::single_region();
        let config = DispatchConfig::default();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let orchestrator = DispatchOrchestrator::new(&config).unwrap().with_cancel(cancel);
        let mut arena = ArenaContext::new();
        assert!(matches!(
            orchestrator.run(&casefile, &mut arena),
            Err(DispatchError::Cancelled)
        ));
    }

    #[test]
    fn non_optimal_statuses_map_to_outcomes() {
        let timeout = LpSolution::with_status(SolutionStatus::Timeout, "t");
        assert!(matches!(
            check_status(Pass::Physical, &timeout),
            Err(DispatchError::Inconclusive { .. })
        ));
        let infeasible = LpSolution::with_status(SolutionStatus::Infeasible, "i");
        assert!(matches!(
            check_status(Pass::Pricing, &infeasible),
            Err(DispatchError::Infeasible { .. })
        ));
    }
}

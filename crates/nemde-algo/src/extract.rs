//! Solver values and duals mapped onto the published solution schema.
//!
//! Dispatch quantities (targets, flows, losses, violations) come from the
//! physical pass; prices and marginal values come from the pass whose duals
//! are published, which is the pricing pass when one ran.

use std::collections::BTreeMap;

use nemde_core::{
    CaseSolution, Casefile, ConstraintSolution, DispatchSolution, FcasOutcome,
    InterconnectorSolution, PeriodSolution, RegionFcas, RegionSolution, TradeType,
    TraderSolution,
};

use crate::model::ViolationKind;
use crate::orchestrator::{DispatchRun, SolvedPass};

pub fn extract_solution(casefile: &Casefile, run: &DispatchRun) -> DispatchSolution {
    let physical = &run.physical;
    let prices = run.price_pass();

    let trader_solution = traders(casefile, physical);
    let region_solution = regions(casefile, physical, prices, &trader_solution);

    DispatchSolution {
        case_solution: CaseSolution {
            case_id: casefile.case_id().to_string(),
            intervention: casefile.case.intervention,
            solver_status: prices.solution.status.to_string(),
            solves: run.solves,
        },
        period_solution: period(physical),
        region_solution,
        interconnector_solution: interconnectors(casefile, physical, prices),
        trader_solution,
        constraint_solution: constraints(casefile, physical, prices),
    }
}

fn period(pass: &SolvedPass) -> PeriodSolution {
    let total = |kind| pass.model.violation_total(kind, &pass.solution);
    PeriodSolution {
        total_objective: pass.solution.objective,
        total_area_gen_violation: total(ViolationKind::AreaGen),
        total_interconnector_violation: total(ViolationKind::Interconnector),
        total_generic_violation: total(ViolationKind::Generic),
        total_ramp_rate_violation: total(ViolationKind::RampRate),
        total_unit_mw_capacity_violation: total(ViolationKind::UnitCapacity),
        total_energy_offer_violation: total(ViolationKind::EnergyOffer),
        total_as_profile_violation: total(ViolationKind::AsProfile),
        total_fast_start_violation: total(ViolationKind::FastStart),
        total_mnsp_ramp_rate_violation: total(ViolationKind::MnspRampRate),
        total_mnsp_offer_violation: total(ViolationKind::MnspOffer),
        total_mnsp_capacity_violation: total(ViolationKind::MnspCapacity),
        total_uigf_violation: total(ViolationKind::Uigf),
    }
}

fn traders(casefile: &Casefile, pass: &SolvedPass) -> Vec<TraderSolution> {
    let sol = &pass.solution;
    casefile
        .traders
        .iter()
        .zip(&pass.model.traders)
        .map(|(trader, vars)| {
            let fcas = vars
                .fcas
                .iter()
                .map(|f| {
                    let violation = f.violations.iter().map(|&v| sol.value(v)).sum();
                    (
                        f.trade_type,
                        FcasOutcome {
                            target: sol.value(f.target),
                            violation,
                        },
                    )
                })
                .collect();
            let fs_target_mode = trader.fast_start.as_ref().map(|profile| {
                pass.resolved
                    .fast_start
                    .get(&trader.id)
                    .map(|fs| fs.state.mode)
                    .unwrap_or(profile.current_mode)
                    .number()
            });
            TraderSolution {
                trader_id: trader.id.clone(),
                energy_target: vars.energy().map(|e| sol.value(e)).unwrap_or(0.0),
                fcas,
                fs_target_mode,
                ramp_up_rate: vars.ramp_up_rate,
                ramp_down_rate: vars.ramp_down_rate,
                ramp_deficit: vars.ramp_violations.iter().map(|&v| sol.value(v)).sum(),
                uigf_violation: vars.uigf_violation.map(|v| sol.value(v)).unwrap_or(0.0),
            }
        })
        .collect()
}

fn regions(
    casefile: &Casefile,
    physical: &SolvedPass,
    prices: &SolvedPass,
    traders: &[TraderSolution],
) -> Vec<RegionSolution> {
    let sol = &physical.solution;
    casefile
        .regions
        .iter()
        .zip(&physical.model.regions)
        .map(|(region, vars)| {
            let mut out = RegionSolution {
                region_id: region.id.clone(),
                fixed_demand: vars.fixed_demand,
                surplus_generation: sol.value(vars.surplus),
                ..RegionSolution::default()
            };
            if let Some(priced) = prices.model.region(region.id.as_str()) {
                out.energy_price = prices.solution.dual(priced.balance);
            }

            for (trader, result) in casefile.traders.iter().zip(traders) {
                if trader.region_id != region.id {
                    continue;
                }
                let availability = trader.energy_availability().unwrap_or(0.0);
                if trader.trader_type.is_load() {
                    out.dispatched_load += result.energy_target;
                    out.available_load += availability;
                } else {
                    out.dispatched_generation += result.energy_target;
                    out.available_generation += availability;
                }
                for (&tt, outcome) in &result.fcas {
                    out.fcas.entry(tt).or_insert_with(RegionFcas::default).dispatch +=
                        outcome.target;
                }
            }

            let mut allocated_losses = 0.0;
            for (ic, ic_vars) in casefile
                .interconnectors
                .iter()
                .zip(&physical.model.interconnectors)
            {
                let share = ic.loss_allocation(&region.id);
                allocated_losses += share * sol.value(ic_vars.loss);
                out.net_export += ic.export_sign(&region.id) * sol.value(ic_vars.flow);
            }
            out.net_export += allocated_losses;
            out.cleared_demand = out.fixed_demand + allocated_losses;

            fcas_prices(&mut out.fcas, prices, region.id.as_str());
            out
        })
        .collect()
}

/// The regional price of a service is the negated dual of its link row.
fn fcas_prices(fcas: &mut BTreeMap<TradeType, RegionFcas>, prices: &SolvedPass, region: &str) {
    let Some(vars) = prices.model.region(region) else {
        return;
    };
    for link in vars.links.iter().filter(|l| l.trade_type.is_fcas()) {
        fcas.entry(link.trade_type).or_default().price = -prices.solution.dual(link.row);
    }
}

fn interconnectors(
    casefile: &Casefile,
    physical: &SolvedPass,
    prices: &SolvedPass,
) -> Vec<InterconnectorSolution> {
    let sol = &physical.solution;
    casefile
        .interconnectors
        .iter()
        .zip(&physical.model.interconnectors)
        .map(|(ic, vars)| {
            let flow = sol.value(vars.flow);
            let ideal_losses = physical
                .resolved
                .loss_curves
                .get(&ic.id)
                .map(|curve| curve.loss_at(flow))
                .unwrap_or(0.0);
            let price = prices
                .model
                .interconnector(ic.id.as_str())
                .map(|p| -prices.solution.dual(p.forward_row) + prices.solution.dual(p.reverse_row))
                .unwrap_or(0.0);
            InterconnectorSolution {
                interconnector_id: ic.id.clone(),
                flow,
                losses: sol.value(vars.loss),
                deficit: sol.value(vars.forward_violation) + sol.value(vars.reverse_violation),
                price,
                ideal_losses,
            }
        })
        .collect()
}

fn constraints(
    casefile: &Casefile,
    physical: &SolvedPass,
    prices: &SolvedPass,
) -> Vec<ConstraintSolution> {
    casefile
        .constraints
        .iter()
        .filter_map(|c| {
            let id = c.id.as_str();
            let find = |pass: &SolvedPass| {
                pass.model
                    .constraints
                    .iter()
                    .find(|v| v.constraint_id.as_str() == id)
                    .cloned()
            };
            // Intervention constraints only exist in the physical pass.
            let (priced, pass) = match find(prices) {
                Some(v) => (v, prices),
                None => (find(physical)?, physical),
            };
            let deficit = find(physical)
                .map(|v| v.violations.iter().map(|&x| physical.solution.value(x)).sum())
                .unwrap_or(0.0);
            Some(ConstraintSolution {
                constraint_id: c.id.clone(),
                rhs: priced.rhs,
                marginal_value: priced.marginal_value(&pass.solution),
                deficit,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Algorithm, DispatchConfig};
    use crate::orchestrator::dispatch;
    use crate::test_fixtures;

    fn solve(casefile: &Casefile) -> DispatchSolution {
        let config = DispatchConfig {
            algorithm: Algorithm::DispatchOnly,
            ..DispatchConfig::default()
        };
        let run = dispatch(casefile, &config).unwrap();
        extract_solution(casefile, &run)
    }

    #[test]
    fn single_generator_sets_price_and_target() {
        let solution = solve(&test_fixtures::single_region());
        let region = solution.region("NSW1").unwrap();
        assert!((region.energy_price - 50.0).abs() < 1e-3);
        assert!((region.dispatched_generation - 80.0).abs() < 1e-4);
        assert!((region.available_generation - 100.0).abs() < 1e-9);
        let g1 = solution.trader("G1").unwrap();
        assert!((g1.energy_target - 80.0).abs() < 1e-4);
        for (name, total) in solution.period_solution.violation_totals() {
            assert!(total.abs() < 1e-5, "{name} = {total}");
        }
        assert_eq!(solution.case_solution.solver_status, "optimal");
    }

    #[test]
    fn load_bid_clears_against_generator() {
        let solution = solve(&test_fixtures::generator_and_load());
        let region = solution.region("NSW1").unwrap();
        assert!((region.dispatched_load - 50.0).abs() < 1e-3);
        assert!((region.dispatched_generation - 150.0).abs() < 1e-3);
        assert!((region.energy_price - 30.0).abs() < 1e-3);
    }

    #[test]
    fn binding_generic_constraint_reports_marginal_value() {
        let solution = solve(&test_fixtures::mnsp_link());
        let link = solution.interconnector("T-V-MNSP1").unwrap();
        assert!(link.flow <= 80.0 + 1e-3);
        let limit = solution.constraint("T_V_LIMIT").unwrap();
        assert_eq!(limit.rhs, 80.0);
        assert!(limit.marginal_value > 0.0);
        assert!(limit.deficit.abs() < 1e-5);
    }
}

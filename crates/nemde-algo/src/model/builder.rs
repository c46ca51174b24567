//! Model construction entry point and trader offers.
//!
//! Build order is fixed (traders, tie-break, FCAS, interconnectors, regions,
//! generic constraints) and every loop walks casefile vectors, never hash
//! maps, so identical inputs always produce an identical problem.

use std::collections::HashMap;

use nemde_core::{
    Casefile, FastStartMode, PenaltyPrices, PriceBand, TradeType, Trader, TraderId,
};
use nemde_solver_common::{RowSense, VarDomain, VarId};
use tracing::debug;

use super::{
    ancillary, generic, network, DispatchModel, OfferVars, Pass, TraderVars, ViolationKind,
};
use crate::arena::{ArenaContext, ArenaMap, ArenaVec};
use crate::config::DispatchConfig;
use crate::error::DispatchResult;
use crate::resolve::ResolvedInputs;

/// Bands whose prices differ by less than this are tied.
const TIE_TOLERANCE: f64 = 1e-6;

/// Per-solve switches chosen by the orchestrator.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub pass: Pass,
    /// Apply fast-start profile bounds.
    pub profiles_active: bool,
    /// Energy targets pinned to these values (pricing pass).
    pub fixed_energy: HashMap<TraderId, f64>,
    /// Integer variables will be relaxed by the backend.
    pub integers_relaxed: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            pass: Pass::Physical,
            profiles_active: true,
            fixed_energy: HashMap::new(),
            integers_relaxed: true,
        }
    }
}

/// Read-only data shared by the build stages.
pub(super) struct BuildContext<'a> {
    pub casefile: &'a Casefile,
    pub resolved: &'a ResolvedInputs,
    pub config: &'a DispatchConfig,
    pub options: &'a BuildOptions,
    pub penalties: PenaltyPrices,
}

/// Scratch lookups built while adding traders.
pub(super) struct OfferIndex<'arena, 'cf> {
    /// Offer total per (trader, trade type).
    pub totals: ArenaMap<'arena, (&'cf str, TradeType), VarId>,
    /// Offer totals per (region, trade type), in trader order.
    pub by_region: ArenaMap<'arena, (&'cf str, TradeType), ArenaVec<'arena, VarId>>,
}

/// Compile one interval into a linear program.
pub fn build_model(
    casefile: &Casefile,
    resolved: &ResolvedInputs,
    config: &DispatchConfig,
    options: &BuildOptions,
    arena: &ArenaContext,
) -> DispatchResult<DispatchModel> {
    let ctx = BuildContext {
        casefile,
        resolved,
        config,
        options,
        penalties: casefile.case.penalties,
    };
    let mut model = DispatchModel::new(
        options.pass,
        format!("{}-{}", casefile.case_id(), options.pass),
    );
    let mut index = OfferIndex {
        totals: arena.alloc_hashmap(),
        by_region: arena.alloc_hashmap(),
    };

    for trader in &casefile.traders {
        let vars = add_trader(&ctx, &mut model, trader);
        for offer in &vars.offers {
            index
                .totals
                .insert((trader.id.as_str(), offer.trade_type), offer.total);
            index
                .by_region
                .entry((trader.region_id.as_str(), offer.trade_type))
                .or_insert_with(|| arena.alloc_vec())
                .push(offer.total);
        }
        model.traders.push(vars);
    }

    add_tie_breaks(&ctx, &mut model, arena);
    ancillary::add_fcas_rows(&ctx, &mut model);
    network::add_interconnectors(&ctx, &mut model)?;
    network::add_regions(&ctx, &mut model);
    generic::add_generic_constraints(&ctx, &mut model, &index)?;

    debug!(
        problem = %model.problem.name,
        variables = model.problem.num_vars(),
        rows = model.problem.num_rows(),
        nonzeros = model.problem.num_nonzeros(),
        integers = model.problem.integer_vars().count(),
        arena_bytes = arena.allocated_bytes(),
        "dispatch model built"
    );
    Ok(model)
}

/// Band variables, their cost, and the offer total.
///
/// Energy bands are softened (`band <= quantity + cv`); FCAS bands are
/// bounded by their quantity since the trapezium rows carry the penalties.
pub(super) fn add_offer(
    model: &mut DispatchModel,
    name: &str,
    trade_type: TradeType,
    bands: &[PriceBand],
    cost_sign: f64,
    soft_bands: Option<(ViolationKind, f64)>,
) -> OfferVars {
    let mut band_vars = Vec::with_capacity(bands.len());
    let mut total_terms = Vec::with_capacity(bands.len() + 1);
    for (i, band) in bands.iter().enumerate() {
        let upper = if soft_bands.is_some() {
            f64::INFINITY
        } else {
            band.quantity
        };
        let var = model.problem.add_variable(
            format!("{name}.band[{i}]"),
            0.0,
            upper,
            VarDomain::Continuous,
        );
        model.problem.add_cost(var, cost_sign * band.price);
        if let Some((kind, penalty)) = soft_bands {
            let cv = model.add_violation(format!("{name}.band[{i}].cv"), kind, penalty);
            model.problem.add_row(
                format!("{name}.band_limit[{i}]"),
                vec![(var, 1.0), (cv, -1.0)],
                RowSense::Le,
                band.quantity,
            );
        }
        band_vars.push(var);
        total_terms.push((var, -1.0));
    }

    let total = model.problem.add_nonneg(format!("{name}.total"));
    total_terms.push((total, 1.0));
    model
        .problem
        .add_row(format!("{name}.band_sum"), total_terms, RowSense::Eq, 0.0);

    OfferVars {
        trade_type,
        total,
        bands: band_vars,
    }
}

fn add_trader(ctx: &BuildContext<'_>, model: &mut DispatchModel, trader: &Trader) -> TraderVars {
    let penalties = &ctx.penalties;
    let is_load = trader.trader_type.is_load();
    let cost_sign = if is_load { -1.0 } else { 1.0 };
    let mut vars = TraderVars {
        trader_id: trader.id.clone(),
        region_id: trader.region_id.clone(),
        is_load,
        offers: Vec::with_capacity(trader.offers.len()),
        fcas: Vec::new(),
        ramp_violations: Vec::new(),
        uigf_violation: None,
        fast_start_mode: None,
        ramp_up_rate: 0.0,
        ramp_down_rate: 0.0,
    };

    for offer in &trader.offers {
        let name = format!("{}.{}", trader.id, offer.trade_type);
        if offer.trade_type.is_energy() {
            let offer_vars = add_offer(
                model,
                &name,
                offer.trade_type,
                &offer.bands,
                cost_sign,
                Some((ViolationKind::EnergyOffer, penalties.energy_offer)),
            );
            let cv = model.add_violation(
                format!("{name}.capacity_cv"),
                ViolationKind::UnitCapacity,
                penalties.unit_capacity,
            );
            model.problem.add_row(
                format!("{name}.capacity"),
                vec![(offer_vars.total, 1.0), (cv, -1.0)],
                RowSense::Le,
                offer.max_avail,
            );
            vars.offers.push(offer_vars);
        } else {
            // FCAS offers are costed as sales regardless of role.
            let offer_vars = add_offer(model, &name, offer.trade_type, &offer.bands, 1.0, None);
            vars.offers.push(offer_vars);
        }
    }

    let Some(energy) = vars.energy() else {
        return vars;
    };
    let name = format!("{}.energy", trader.id);
    let initial = trader.initial.initial_mw;

    if trader.semi_dispatch {
        if let Some(uigf) = trader.uigf {
            let cv = model.add_violation(
                format!("{name}.uigf_cv"),
                ViolationKind::Uigf,
                penalties.uigf_surplus,
            );
            model.problem.add_row(
                format!("{name}.uigf"),
                vec![(energy, 1.0), (cv, -1.0)],
                RowSense::Le,
                uigf,
            );
            vars.uigf_violation = Some(cv);
        }
    }

    // Fast-start profile
    let fast_start = if ctx.options.profiles_active {
        ctx.resolved.fast_start.get(&trader.id)
    } else {
        None
    };
    let profile_pins = fast_start
        .map(|fs| fs.state.mode < FastStartMode::MinimumLoading)
        .unwrap_or(false);
    if let Some(fs) = fast_start {
        vars.fast_start_mode = Some(fs.state.mode);
        if let Some(max) = fs.bounds.max {
            let cv = model.add_violation(
                format!("{name}.fs_max_cv"),
                ViolationKind::FastStart,
                penalties.fast_start,
            );
            model.problem.add_row(
                format!("{name}.fs_max"),
                vec![(energy, 1.0), (cv, -1.0)],
                RowSense::Le,
                max,
            );
        }
        if let Some(min) = fs.bounds.min {
            let cv = model.add_violation(
                format!("{name}.fs_min_cv"),
                ViolationKind::FastStart,
                penalties.fast_start,
            );
            model.problem.add_row(
                format!("{name}.fs_min"),
                vec![(energy, 1.0), (cv, 1.0)],
                RowSense::Ge,
                min,
            );
        }
    }

    // Ramp rates, offered and telemetered, whichever is tighter.
    let up = trader.energy_ramp_up_rate();
    let down = trader.energy_ramp_down_rate();
    vars.ramp_up_rate = up.unwrap_or(0.0);
    vars.ramp_down_rate = down.unwrap_or(0.0);
    let intervals_per_hour = ctx.config.intervals_per_hour();

    if !profile_pins {
        let capability = fast_start.and_then(|fs| fs.ramp_up_capability);
        let ceiling = match (capability, up) {
            (Some(cap), _) => Some(cap),
            (None, Some(rate)) => Some(initial + rate / intervals_per_hour),
            (None, None) => None,
        };
        if let Some(ceiling) = ceiling {
            let cv = model.add_violation(
                format!("{name}.ramp_up_cv"),
                ViolationKind::RampRate,
                penalties.ramp_rate,
            );
            model.problem.add_row(
                format!("{name}.ramp_up"),
                vec![(energy, 1.0), (cv, -1.0)],
                RowSense::Le,
                ceiling,
            );
            vars.ramp_violations.push(cv);
        }
        if let Some(rate) = down {
            let cv = model.add_violation(
                format!("{name}.ramp_down_cv"),
                ViolationKind::RampRate,
                penalties.ramp_rate,
            );
            model.problem.add_row(
                format!("{name}.ramp_down"),
                vec![(energy, 1.0), (cv, 1.0)],
                RowSense::Ge,
                initial - rate / intervals_per_hour,
            );
            vars.ramp_violations.push(cv);
        }
    }

    if let Some(&target) = ctx.options.fixed_energy.get(&trader.id) {
        model.problem.fix_variable(energy, target);
    }

    vars
}

/// Spread dispatch evenly across price-tied energy bands of a region.
///
/// Every pair of tied bands `a`, `b`, including two bands of one trader,
/// gets `x_a/q_a - x_b/q_b = s1 - s2` with `s1 + s2` priced at the
/// tie-break price scaled by VoLL.
fn add_tie_breaks(ctx: &BuildContext<'_>, model: &mut DispatchModel, arena: &ArenaContext) {
    struct TiedBand<'cf> {
        region: &'cf str,
        trade_type: TradeType,
        price: f64,
        trader: usize,
        band: usize,
        quantity: f64,
        var: VarId,
    }

    let mut bands: ArenaVec<'_, TiedBand<'_>> = arena.alloc_vec();
    for (t, (trader, vars)) in ctx.casefile.traders.iter().zip(&model.traders).enumerate() {
        let Some(offer) = trader.energy_offer() else {
            continue;
        };
        let Some(offer_vars) = vars.offers.iter().find(|o| o.trade_type == offer.trade_type)
        else {
            continue;
        };
        for (b, (band, &var)) in offer.bands.iter().zip(&offer_vars.bands).enumerate() {
            if band.quantity > 0.0 {
                bands.push(TiedBand {
                    region: trader.region_id.as_str(),
                    trade_type: offer.trade_type,
                    price: band.price,
                    trader: t,
                    band: b,
                    quantity: band.quantity,
                    var,
                });
            }
        }
    }
    bands.sort_by(|a, b| {
        (a.region, a.trade_type)
            .cmp(&(b.region, b.trade_type))
            .then(a.price.total_cmp(&b.price))
            .then((a.trader, a.band).cmp(&(b.trader, b.band)))
    });

    let cost = ctx.config.tie_break_price_for(&ctx.casefile.case) * ctx.casefile.case.voll;
    let mut pairs = 0usize;
    for (i, a) in bands.iter().enumerate() {
        for b in &bands[i + 1..] {
            // sorted by price within a group, so the first miss ends the run
            if a.region != b.region
                || a.trade_type != b.trade_type
                || (a.price - b.price).abs() >= TIE_TOLERANCE
            {
                break;
            }
            let s1 = model.problem.add_nonneg(format!("tie[{pairs}].s1"));
            let s2 = model.problem.add_nonneg(format!("tie[{pairs}].s2"));
            model.problem.add_cost(s1, cost);
            model.problem.add_cost(s2, cost);
            model.problem.add_row(
                format!("tie[{pairs}]"),
                vec![
                    (a.var, 1.0 / a.quantity),
                    (b.var, -1.0 / b.quantity),
                    (s1, -1.0),
                    (s2, 1.0),
                ],
                RowSense::Eq,
                0.0,
            );
            pairs += 1;
        }
    }
    if pairs > 0 {
        debug!(pairs, cost, "tie-break rows added");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve_inputs;
    use crate::test_fixtures;

    fn build(casefile: &Casefile, options: &BuildOptions) -> DispatchModel {
        let config = DispatchConfig::default();
        let resolved = resolve_inputs(casefile, &config).unwrap();
        let arena = ArenaContext::new();
        build_model(casefile, &resolved, &config, options, &arena).unwrap()
    }

    #[test]
    fn single_generator_model_shape() {
        let casefile = test_fixtures::single_region();
        let model = build(&casefile, &BuildOptions::default());
        let trader = model.trader("G1").unwrap();
        assert!(trader.energy().is_some());
        assert_eq!(trader.offers[0].bands.len(), 1);
        assert_eq!(model.regions.len(), 1);
        assert!(model.interconnectors.is_empty());
        assert!(model.problem.validate().is_ok());
    }

    #[test]
    fn identical_inputs_build_identical_problems() {
        let casefile = test_fixtures::two_region_with_fcas();
        let a = build(&casefile, &BuildOptions::default());
        let b = build(&casefile, &BuildOptions::default());
        let names = |m: &DispatchModel| -> Vec<String> {
            m.problem.rows.iter().map(|r| r.name.clone()).collect()
        };
        assert_eq!(names(&a), names(&b));
        assert_eq!(a.problem.num_vars(), b.problem.num_vars());
    }

    #[test]
    fn tied_bands_get_tie_break_rows() {
        let casefile = test_fixtures::tied_generators();
        let model = build(&casefile, &BuildOptions::default());
        let ties = model
            .problem
            .rows
            .iter()
            .filter(|r| r.name.starts_with("tie["))
            .count();
        assert_eq!(ties, 1);
    }

    #[test]
    fn every_tied_pair_gets_a_row() {
        let mut casefile = test_fixtures::tied_generators();
        casefile.traders[0].offers[0] = test_fixtures::energy_offer(
            TradeType::EnergyOffer,
            &[(30.0, 50.0), (30.0, 50.0)],
            100.0,
        );
        let model = build(&casefile, &BuildOptions::default());
        let ties = model
            .problem
            .rows
            .iter()
            .filter(|r| r.name.starts_with("tie[") && !r.name.contains('.'))
            .count();
        assert_eq!(ties, 3);
    }

    #[test]
    fn fixed_energy_pins_total() {
        let casefile = test_fixtures::single_region();
        let mut options = BuildOptions::default();
        options.fixed_energy.insert("G1".into(), 42.0);
        let model = build(&casefile, &options);
        let energy = model.trader("G1").unwrap().energy().unwrap();
        let var = &model.problem.variables[energy.0];
        assert_eq!((var.lower, var.upper), (42.0, 42.0));
    }

    #[test]
    fn load_bids_are_negative_cost() {
        let casefile = test_fixtures::generator_and_load();
        let model = build(&casefile, &BuildOptions::default());
        let load = model.trader("L1").unwrap();
        let band = load.offers[0].bands[0];
        assert!(model.problem.variables[band.0].cost < 0.0);
    }
}

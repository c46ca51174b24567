//! Interconnector flows, losses, MNSP offers and regional energy balance.

use nemde_core::{Interconnector, Mnsp, Region, TradeType};
use nemde_solver_common::{RowSense, SolverError, VarDomain, VarId};
use tracing::warn;

use super::builder::{add_offer, BuildContext};
use super::{DispatchModel, InterconnectorVars, MnspVars, RegionVars, ViolationKind};
use crate::error::{DispatchError, DispatchResult, ResolveError};

pub(super) fn add_interconnectors(
    ctx: &BuildContext<'_>,
    model: &mut DispatchModel,
) -> DispatchResult<()> {
    let encoding = ctx.config.loss_encoding_for(&ctx.casefile.case);
    for ic in &ctx.casefile.interconnectors {
        let name = ic.id.as_str();
        let curve = ctx.resolved.loss_curves.get(&ic.id).ok_or_else(|| {
            DispatchError::Resolve(ResolveError::LossModel {
                interconnector: name.to_string(),
                message: "loss curve was not resolved".to_string(),
            })
        })?;

        let flow = model.problem.add_variable(
            format!("{name}.flow"),
            f64::NEG_INFINITY,
            f64::INFINITY,
            VarDomain::Continuous,
        );

        let forward_violation = model.add_violation(
            format!("{name}.forward_cv"),
            ViolationKind::Interconnector,
            ctx.penalties.interconnector,
        );
        let forward_row = model.problem.add_row(
            format!("{name}.forward_limit"),
            vec![(flow, 1.0), (forward_violation, -1.0)],
            RowSense::Le,
            ic.upper_limit,
        );
        let reverse_violation = model.add_violation(
            format!("{name}.reverse_cv"),
            ViolationKind::Interconnector,
            ctx.penalties.interconnector,
        );
        let reverse_row = model.problem.add_row(
            format!("{name}.reverse_limit"),
            vec![(flow, 1.0), (reverse_violation, 1.0)],
            RowSense::Ge,
            -ic.lower_limit,
        );

        // A relaxed encoding of a non-convex curve leaves the curve.
        if ctx.options.integers_relaxed && !curve.is_convex() {
            warn!(interconnector = name, "non-convex loss curve on a continuous solver");
            return Err(DispatchError::Solver(SolverError::Unsupported(format!(
                "loss curve of {name} is not convex and needs an integer-capable solver"
            ))));
        }
        let encoded = curve.encode(&mut model.problem, flow, encoding, name);

        let mnsp = ic.mnsp.as_ref().map(|offers| add_mnsp(ctx, model, ic, offers, flow));

        model.interconnectors.push(InterconnectorVars {
            interconnector_id: ic.id.clone(),
            flow,
            loss: encoded.loss,
            forward_row,
            reverse_row,
            forward_violation,
            reverse_violation,
            mnsp,
        });
    }
    Ok(())
}

/// Both ends of a market network service offer their transfer; the link
/// flow is what the receiving end takes minus what the sending end gives up.
fn add_mnsp(
    ctx: &BuildContext<'_>,
    model: &mut DispatchModel,
    ic: &Interconnector,
    mnsp: &Mnsp,
    flow: VarId,
) -> MnspVars {
    let penalties = &ctx.penalties;
    let name = ic.id.as_str();
    let mut violations = Vec::new();

    let soft = Some((ViolationKind::MnspOffer, penalties.mnsp_offer));
    let from_offer = add_offer(
        model,
        &format!("{name}.from"),
        TradeType::EnergyOffer,
        &mnsp.from_region_offer.bands,
        1.0,
        soft,
    );
    let to_offer = add_offer(
        model,
        &format!("{name}.to"),
        TradeType::EnergyOffer,
        &mnsp.to_region_offer.bands,
        1.0,
        soft,
    );

    model.problem.add_row(
        format!("{name}.mnsp_flow"),
        vec![(flow, 1.0), (to_offer.total, -1.0), (from_offer.total, 1.0)],
        RowSense::Eq,
        0.0,
    );

    let iph = ctx.config.intervals_per_hour();
    let ends = [
        ("to", &mnsp.to_region_offer, to_offer.total, ic.initial_mw.max(0.0)),
        ("from", &mnsp.from_region_offer, from_offer.total, (-ic.initial_mw).max(0.0)),
    ];
    for (end, offer, total, initial) in ends {
        let cv = model.add_violation(
            format!("{name}.{end}.capacity_cv"),
            ViolationKind::MnspCapacity,
            penalties.mnsp_capacity,
        );
        model.problem.add_row(
            format!("{name}.{end}.capacity"),
            vec![(total, 1.0), (cv, -1.0)],
            RowSense::Le,
            offer.max_avail,
        );
        violations.push(cv);

        if let Some(rate) = offer.ramp_up_rate {
            let cv = model.add_violation(
                format!("{name}.{end}.ramp_up_cv"),
                ViolationKind::MnspRampRate,
                penalties.mnsp_ramp_rate,
            );
            model.problem.add_row(
                format!("{name}.{end}.ramp_up"),
                vec![(total, 1.0), (cv, -1.0)],
                RowSense::Le,
                initial + rate / iph,
            );
            violations.push(cv);
        }
        if let Some(rate) = offer.ramp_down_rate {
            let cv = model.add_violation(
                format!("{name}.{end}.ramp_down_cv"),
                ViolationKind::MnspRampRate,
                penalties.mnsp_ramp_rate,
            );
            model.problem.add_row(
                format!("{name}.{end}.ramp_down"),
                vec![(total, 1.0), (cv, 1.0)],
                RowSense::Ge,
                initial - rate / iph,
            );
            violations.push(cv);
        }
    }

    // At most one end transfers.
    let to_max = mnsp.to_region_offer.max_avail;
    let from_max = mnsp.from_region_offer.max_avail;
    if to_max > 0.0 && from_max > 0.0 {
        let forward = model.problem.add_binary(format!("{name}.direction"));
        model.problem.add_row(
            format!("{name}.direction_to"),
            vec![(to_offer.total, 1.0), (forward, -to_max)],
            RowSense::Le,
            0.0,
        );
        model.problem.add_row(
            format!("{name}.direction_from"),
            vec![(from_offer.total, 1.0), (forward, from_max)],
            RowSense::Le,
            from_max,
        );
    }

    MnspVars {
        from_offer,
        to_offer,
        violations,
    }
}

/// Demand not under dispatch: forecast demand less the initial output of
/// dispatchable loads and the losses allocated at initial flows.
fn fixed_demand(ctx: &BuildContext<'_>, region: &Region) -> f64 {
    let loads: f64 = ctx
        .casefile
        .traders
        .iter()
        .filter(|t| t.region_id == region.id && t.trader_type.is_load())
        .filter(|t| t.energy_offer().is_some())
        .map(|t| t.initial.initial_mw)
        .sum();
    let losses: f64 = ctx
        .casefile
        .interconnectors
        .iter()
        .filter_map(|ic| {
            let curve = ctx.resolved.loss_curves.get(&ic.id)?;
            Some(ic.loss_allocation(&region.id) * curve.loss_at(ic.initial_mw))
        })
        .sum();
    region.initial_demand + region.ade + region.demand_forecast - loads - losses
}

/// `gen - load - Σ sign·flow - Σ share·loss + deficit - surplus = fixed_demand`
pub(super) fn add_regions(ctx: &BuildContext<'_>, model: &mut DispatchModel) {
    for region in &ctx.casefile.regions {
        let name = region.id.as_str();
        let mut terms: Vec<(VarId, f64)> = Vec::new();

        for vars in &model.traders {
            if vars.region_id != region.id {
                continue;
            }
            if let Some(energy) = vars.energy() {
                terms.push((energy, if vars.is_load { -1.0 } else { 1.0 }));
            }
        }
        for (ic, vars) in ctx.casefile.interconnectors.iter().zip(&model.interconnectors) {
            let sign = ic.export_sign(&region.id);
            if sign != 0.0 {
                terms.push((vars.flow, -sign));
            }
            let share = ic.loss_allocation(&region.id);
            if share != 0.0 {
                terms.push((vars.loss, -share));
            }
        }

        let deficit = model.add_violation(
            format!("{name}.deficit"),
            ViolationKind::AreaGen,
            ctx.penalties.energy_deficit,
        );
        let surplus = model.add_violation(
            format!("{name}.surplus"),
            ViolationKind::AreaGen,
            ctx.penalties.energy_surplus,
        );
        terms.push((deficit, 1.0));
        terms.push((surplus, -1.0));

        let demand = fixed_demand(ctx, region);
        let balance = model.problem.add_row(
            format!("{name}.balance"),
            terms,
            RowSense::Eq,
            demand,
        );

        model.regions.push(RegionVars {
            region_id: region.id.clone(),
            balance,
            deficit,
            surplus,
            fixed_demand: demand,
            links: Vec::new(),
        });
    }
}

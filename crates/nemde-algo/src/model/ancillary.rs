//! FCAS co-optimisation rows.
//!
//! For each available service `X` of a trader with energy target `E`:
//!
//! ```text
//! X                       <= max_avail + cv
//! E + usc·X (+ R5RE)      <= enablement_max + cv
//! E - lsc·X (- L5RE) + cv >= enablement_min
//! ```
//!
//! Regulation partners only appear on contingency rows, and only when that
//! regulation service is itself available. Loads use the opposite partner on
//! each side. Unavailable services are held at zero.

use nemde_core::{TradeType, Trader};
use nemde_solver_common::{RowSense, VarId};

use super::builder::BuildContext;
use super::{DispatchModel, FcasVars, ViolationKind};
use crate::resolve::ResolvedFcas;

pub(super) fn add_fcas_rows(ctx: &BuildContext<'_>, model: &mut DispatchModel) {
    for (t, trader) in ctx.casefile.traders.iter().enumerate() {
        let services = ctx.resolved.fcas_for(trader.id.as_str());
        if services.is_empty() {
            continue;
        }
        let fcas = trader_rows(ctx, model, t, trader, services);
        model.traders[t].fcas = fcas;
    }
}

fn trader_rows(
    ctx: &BuildContext<'_>,
    model: &mut DispatchModel,
    t: usize,
    trader: &Trader,
    services: &[ResolvedFcas],
) -> Vec<FcasVars> {
    let penalties = &ctx.penalties;
    let is_load = model.traders[t].is_load;
    let energy = model.traders[t].energy();
    let initial = trader.initial.initial_mw;
    // With no energy offer the energy target stays at its initial value.
    let energy_terms = |extra: Vec<(VarId, f64)>| -> (Vec<(VarId, f64)>, f64) {
        let mut terms = extra;
        match energy {
            Some(e) => {
                terms.insert(0, (e, 1.0));
                (terms, 0.0)
            }
            None => (terms, initial),
        }
    };

    let available = |tt: TradeType| -> Option<VarId> {
        services
            .iter()
            .find(|s| s.trade_type == tt && s.is_available())
            .and_then(|_| model.traders[t].total(tt))
    };
    let (upper_partner, lower_partner) = if is_load {
        (available(TradeType::LowerReg), available(TradeType::RaiseReg))
    } else {
        (available(TradeType::RaiseReg), available(TradeType::LowerReg))
    };

    let mut out = Vec::with_capacity(services.len());
    for service in services {
        let tt = service.trade_type;
        let Some(target) = model.traders[t].total(tt) else {
            continue;
        };
        let name = format!("{}.{}", trader.id, tt);
        let mut violations = Vec::new();

        if !service.is_available() {
            let cv = model.add_violation(
                format!("{name}.unavailable_cv"),
                ViolationKind::AsProfile,
                penalties.as_profile,
            );
            model.problem.add_row(
                format!("{name}.unavailable"),
                vec![(target, 1.0), (cv, -1.0)],
                RowSense::Le,
                0.0,
            );
            violations.push(cv);
            out.push(FcasVars {
                trade_type: tt,
                target,
                available: false,
                violations,
            });
            continue;
        }

        let trap = &service.trapezium;

        let cv = model.add_violation(
            format!("{name}.max_avail_cv"),
            ViolationKind::AsProfile,
            penalties.as_max_avail,
        );
        model.problem.add_row(
            format!("{name}.max_avail"),
            vec![(target, 1.0), (cv, -1.0)],
            RowSense::Le,
            trap.max_avail,
        );
        violations.push(cv);

        // Upper slope
        let cv = model.add_violation(
            format!("{name}.emax_cv"),
            ViolationKind::AsProfile,
            penalties.as_enablement_max,
        );
        let mut extra = vec![(target, trap.upper_slope_coefficient()), (cv, -1.0)];
        if tt.is_contingency() {
            if let Some(partner) = upper_partner {
                extra.push((partner, 1.0));
            }
        }
        let (terms, offset) = energy_terms(extra);
        model.problem.add_row(
            format!("{name}.upper_slope"),
            terms,
            RowSense::Le,
            trap.enablement_max - offset,
        );
        violations.push(cv);

        // Lower slope
        let cv = model.add_violation(
            format!("{name}.emin_cv"),
            ViolationKind::AsProfile,
            penalties.as_enablement_min,
        );
        let mut extra = vec![(target, -trap.lower_slope_coefficient()), (cv, 1.0)];
        if tt.is_contingency() {
            if let Some(partner) = lower_partner {
                extra.push((partner, -1.0));
            }
        }
        let (terms, offset) = energy_terms(extra);
        model.problem.add_row(
            format!("{name}.lower_slope"),
            terms,
            RowSense::Ge,
            trap.enablement_min - offset,
        );
        violations.push(cv);

        if tt.is_regulation() {
            if let Some(cv) = joint_ramp_row(ctx, model, trader, is_load, energy, tt, target) {
                violations.push(cv);
            }
        }

        out.push(FcasVars {
            trade_type: tt,
            target,
            available: true,
            violations,
        });
    }
    out
}

/// Energy plus regulation must stay within one interval of SCADA ramping.
fn joint_ramp_row(
    ctx: &BuildContext<'_>,
    model: &mut DispatchModel,
    trader: &Trader,
    is_load: bool,
    energy: Option<VarId>,
    tt: TradeType,
    target: VarId,
) -> Option<VarId> {
    let energy = energy?;
    let initial = trader.initial.initial_mw;
    let per_interval = |rate: f64| rate / ctx.config.intervals_per_hour();
    // Raising frequency moves generators up and loads down.
    let moves_up = (tt == TradeType::RaiseReg) != is_load;
    let name = format!("{}.{}.joint_ramp", trader.id, tt);

    if moves_up {
        let rate = trader.initial.scada_ramp_up_rate?;
        let cv = model.add_violation(
            format!("{name}_cv"),
            ViolationKind::AsProfile,
            ctx.penalties.as_profile,
        );
        model.problem.add_row(
            name,
            vec![(energy, 1.0), (target, 1.0), (cv, -1.0)],
            RowSense::Le,
            initial + per_interval(rate),
        );
        Some(cv)
    } else {
        let rate = trader.initial.scada_ramp_down_rate?;
        let cv = model.add_violation(
            format!("{name}_cv"),
            ViolationKind::AsProfile,
            ctx.penalties.as_profile,
        );
        model.problem.add_row(
            name,
            vec![(energy, 1.0), (target, -1.0), (cv, 1.0)],
            RowSense::Ge,
            initial - per_interval(rate),
        );
        Some(cv)
    }
}

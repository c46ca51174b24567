//! Generic constraint rows.
//!
//! Each constraint becomes one row over trader offer totals, interconnector
//! flows and region trade totals, softened by a violation priced at the
//! constraint's own violation price.

use nemde_core::{ConstraintType, GenericConstraint, RegionId, TradeType};
use nemde_solver_common::{RowSense, VarDomain, VarId};
use tracing::{debug, warn};

use super::builder::{BuildContext, OfferIndex};
use super::{ConstraintVars, DispatchModel, Pass, RegionLink, ViolationKind};
use crate::error::{DispatchError, DispatchResult, ResolveError};

pub(super) fn add_generic_constraints(
    ctx: &BuildContext<'_>,
    model: &mut DispatchModel,
    index: &OfferIndex<'_, '_>,
) -> DispatchResult<()> {
    let mut skipped = 0usize;
    for constraint in &ctx.casefile.constraints {
        if constraint.intervention && ctx.options.pass == Pass::Pricing {
            skipped += 1;
            continue;
        }
        let rhs = ctx.resolved.rhs(constraint.id.as_str()).ok_or_else(|| {
            DispatchError::Resolve(ResolveError::Equation {
                equation: constraint.id.to_string(),
                term: 0,
                message: "constraint right-hand side was not resolved".to_string(),
            })
        })?;
        let terms = lhs_terms(model, constraint, index);
        add_row(model, constraint, terms, rhs);
    }
    if skipped > 0 {
        debug!(skipped, "intervention constraints dropped for pricing pass");
    }
    Ok(())
}

fn lhs_terms(
    model: &mut DispatchModel,
    constraint: &GenericConstraint,
    index: &OfferIndex<'_, '_>,
) -> Vec<(VarId, f64)> {
    let lhs = &constraint.lhs;
    let mut terms = Vec::with_capacity(
        lhs.traders.len() + lhs.interconnectors.len() + lhs.regions.len() + 2,
    );

    for term in &lhs.traders {
        match index
            .totals
            .get(&(term.trader_id.as_str(), term.trade_type))
        {
            Some(&var) => terms.push((var, term.factor)),
            None => warn!(
                constraint = %constraint.id,
                trader = %term.trader_id,
                trade_type = %term.trade_type,
                "constraint term has no matching offer, skipped"
            ),
        }
    }

    for term in &lhs.interconnectors {
        match model.interconnector(term.interconnector_id.as_str()) {
            Some(ic) => terms.push((ic.flow, term.factor)),
            None => warn!(
                constraint = %constraint.id,
                interconnector = %term.interconnector_id,
                "constraint term references unknown interconnector, skipped"
            ),
        }
    }

    for term in &lhs.regions {
        match region_link(model, &term.region_id, term.trade_type, index) {
            Some(var) => terms.push((var, term.factor)),
            None => warn!(
                constraint = %constraint.id,
                region = %term.region_id,
                "constraint term references unknown region, skipped"
            ),
        }
    }
    terms
}

/// Variable equal to a region's total for one trade type, created on first use.
fn region_link(
    model: &mut DispatchModel,
    region_id: &RegionId,
    trade_type: TradeType,
    index: &OfferIndex<'_, '_>,
) -> Option<VarId> {
    let position = model
        .regions
        .iter()
        .position(|r| &r.region_id == region_id)?;
    if let Some(link) = model.regions[position].link(trade_type) {
        return Some(link.var);
    }

    let name = format!("{region_id}.{trade_type}");
    let var = model.problem.add_variable(
        format!("{name}.total"),
        f64::NEG_INFINITY,
        f64::INFINITY,
        VarDomain::Continuous,
    );
    let mut terms = vec![(var, 1.0)];
    if let Some(totals) = index.by_region.get(&(region_id.as_str(), trade_type)) {
        terms.extend(totals.iter().map(|&t| (t, -1.0)));
    }
    let row = model
        .problem
        .add_row(format!("{name}.link"), terms, RowSense::Eq, 0.0);
    model.regions[position].links.push(RegionLink {
        trade_type,
        var,
        row,
    });
    Some(var)
}

fn add_row(
    model: &mut DispatchModel,
    constraint: &GenericConstraint,
    mut terms: Vec<(VarId, f64)>,
    rhs: f64,
) {
    let name = constraint.id.as_str();
    let price = constraint.violation_price;
    let mut violations = Vec::with_capacity(2);
    let sense = match constraint.constraint_type {
        ConstraintType::Le => {
            let cv = model.add_violation(format!("{name}.cv"), ViolationKind::Generic, price);
            terms.push((cv, -1.0));
            violations.push(cv);
            RowSense::Le
        }
        ConstraintType::Ge => {
            let cv = model.add_violation(format!("{name}.cv"), ViolationKind::Generic, price);
            terms.push((cv, 1.0));
            violations.push(cv);
            RowSense::Ge
        }
        ConstraintType::Eq => {
            let over = model.add_violation(format!("{name}.cv_over"), ViolationKind::Generic, price);
            let under =
                model.add_violation(format!("{name}.cv_under"), ViolationKind::Generic, price);
            terms.push((over, -1.0));
            terms.push((under, 1.0));
            violations.push(over);
            violations.push(under);
            RowSense::Eq
        }
    };
    let row = model
        .problem
        .add_row(format!("constraint.{name}"), terms, sense, rhs);
    model.constraints.push(ConstraintVars {
        constraint_id: constraint.id.clone(),
        constraint_type: constraint.constraint_type,
        rhs,
        row,
        violations,
    });
}

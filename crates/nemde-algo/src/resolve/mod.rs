//! Per-interval resolvers.
//!
//! Each resolver turns one kind of raw casefile data into the numbers the
//! model builder consumes. [`resolve_inputs`] runs all of them once per
//! interval; any failure is an input defect of that interval.

pub mod equation;
pub mod fast_start;
pub mod fcas;
pub mod loss;

use std::collections::HashMap;

use nemde_core::{Casefile, ConstraintId, InterconnectorId, Trader, TraderId};
use tracing::debug;

use crate::config::DispatchConfig;
use crate::error::ResolveError;

pub use equation::{resolve_constraint_rhs, RhsResolver};
pub use fast_start::{FastStartState, ProfileBounds, ResolvedFastStart};
pub use fcas::{ResolvedFcas, Trapezium, Unavailability};
pub use loss::{EncodedLoss, LossCurve};

/// Resolved inputs for one interval.
#[derive(Debug, Clone, Default)]
pub struct ResolvedInputs {
    pub loss_curves: HashMap<InterconnectorId, LossCurve>,
    pub fcas: HashMap<TraderId, Vec<ResolvedFcas>>,
    pub fast_start: HashMap<TraderId, ResolvedFastStart>,
    pub constraint_rhs: HashMap<ConstraintId, f64>,
}

impl ResolvedInputs {
    pub fn fcas_for(&self, trader: &str) -> &[ResolvedFcas] {
        self.fcas.get(trader).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rhs(&self, constraint: &str) -> Option<f64> {
        self.constraint_rhs.get(constraint).copied()
    }

    /// Restart an uncommitted unit's profile as if it had been committed at
    /// the start of the interval.
    pub fn commit_fast_start(
        &mut self,
        trader: &Trader,
        interval_minutes: f64,
    ) -> Result<(), ResolveError> {
        if let Some(profile) = &trader.fast_start {
            let committed = fast_start::committed(profile);
            let resolved = fast_start::resolve_fast_start(trader, &committed, interval_minutes)?;
            self.fast_start.insert(trader.id.clone(), resolved);
        }
        Ok(())
    }
}

pub fn resolve_inputs(
    casefile: &Casefile,
    config: &DispatchConfig,
) -> Result<ResolvedInputs, ResolveError> {
    let intervals_per_hour = config.intervals_per_hour();

    let loss_curves = casefile
        .interconnectors
        .iter()
        .map(|ic| Ok((ic.id.clone(), LossCurve::for_interconnector(ic)?)))
        .collect::<Result<HashMap<_, _>, ResolveError>>()?;

    let mut fcas = HashMap::new();
    let mut fast_start = HashMap::new();
    for trader in &casefile.traders {
        let services = fcas::resolve_trader_fcas(trader, intervals_per_hour)?;
        if !services.is_empty() {
            fcas.insert(trader.id.clone(), services);
        }
        if let Some(profile) = &trader.fast_start {
            let resolved =
                fast_start::resolve_fast_start(trader, profile, config.interval_minutes)?;
            fast_start.insert(trader.id.clone(), resolved);
        }
    }

    let constraint_rhs = resolve_constraint_rhs(casefile)?;

    debug!(
        loss_curves = loss_curves.len(),
        fcas_traders = fcas.len(),
        fast_start = fast_start.len(),
        constraints = constraint_rhs.len(),
        "inputs resolved"
    );

    Ok(ResolvedInputs {
        loss_curves,
        fcas,
        fast_start,
        constraint_rhs,
    })
}

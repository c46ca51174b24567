//! Dispatch model: the linear program for one solve plus the index that maps
//! casefile entities to its variables and rows.

mod ancillary;
mod builder;
mod generic;
mod network;

pub use builder::{build_model, BuildOptions};

use nemde_core::{
    ConstraintId, ConstraintType, FastStartMode, InterconnectorId, RegionId, TradeType, TraderId,
};
use nemde_solver_common::{LinearProblem, LpSolution, RowId, VarId};
use serde::{Deserialize, Serialize};

/// Which solve of the two-pass protocol a model is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    /// All constraints, including intervention-only ones.
    Physical,
    /// Intervention-only constraints dropped, intervened traders fixed.
    Pricing,
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pass::Physical => write!(f, "physical"),
            Pass::Pricing => write!(f, "pricing"),
        }
    }
}

/// Violation category, one per period-level total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    AreaGen,
    Interconnector,
    Generic,
    RampRate,
    UnitCapacity,
    EnergyOffer,
    AsProfile,
    FastStart,
    MnspRampRate,
    MnspOffer,
    MnspCapacity,
    Uigf,
}

/// Penalised slack variable.
#[derive(Debug, Clone, Copy)]
pub struct Violation {
    pub var: VarId,
    pub kind: ViolationKind,
}

/// Band and total variables of one priced offer.
#[derive(Debug, Clone)]
pub struct OfferVars {
    pub trade_type: TradeType,
    pub total: VarId,
    pub bands: Vec<VarId>,
}

#[derive(Debug, Clone)]
pub struct FcasVars {
    pub trade_type: TradeType,
    pub target: VarId,
    pub available: bool,
    pub violations: Vec<VarId>,
}

#[derive(Debug, Clone)]
pub struct TraderVars {
    pub trader_id: TraderId,
    pub region_id: RegionId,
    pub is_load: bool,
    pub offers: Vec<OfferVars>,
    pub fcas: Vec<FcasVars>,
    pub ramp_violations: Vec<VarId>,
    pub uigf_violation: Option<VarId>,
    pub fast_start_mode: Option<FastStartMode>,
    /// Effective rates (MW/h) used in the ramp rows; 0 when unconstrained.
    pub ramp_up_rate: f64,
    pub ramp_down_rate: f64,
}

impl TraderVars {
    pub fn total(&self, trade_type: TradeType) -> Option<VarId> {
        self.offers
            .iter()
            .find(|o| o.trade_type == trade_type)
            .map(|o| o.total)
    }

    pub fn energy(&self) -> Option<VarId> {
        self.offers
            .iter()
            .find(|o| o.trade_type.is_energy())
            .map(|o| o.total)
    }
}

/// Region trade total referenced by generic constraints.
#[derive(Debug, Clone, Copy)]
pub struct RegionLink {
    pub trade_type: TradeType,
    pub var: VarId,
    pub row: RowId,
}

#[derive(Debug, Clone)]
pub struct RegionVars {
    pub region_id: RegionId,
    pub balance: RowId,
    pub deficit: VarId,
    pub surplus: VarId,
    pub fixed_demand: f64,
    pub links: Vec<RegionLink>,
}

impl RegionVars {
    pub fn link(&self, trade_type: TradeType) -> Option<&RegionLink> {
        self.links.iter().find(|l| l.trade_type == trade_type)
    }
}

#[derive(Debug, Clone)]
pub struct MnspVars {
    pub from_offer: OfferVars,
    pub to_offer: OfferVars,
    pub violations: Vec<VarId>,
}

#[derive(Debug, Clone)]
pub struct InterconnectorVars {
    pub interconnector_id: InterconnectorId,
    pub flow: VarId,
    pub loss: VarId,
    pub forward_row: RowId,
    pub reverse_row: RowId,
    pub forward_violation: VarId,
    pub reverse_violation: VarId,
    pub mnsp: Option<MnspVars>,
}

#[derive(Debug, Clone)]
pub struct ConstraintVars {
    pub constraint_id: ConstraintId,
    pub constraint_type: ConstraintType,
    pub rhs: f64,
    pub row: RowId,
    pub violations: Vec<VarId>,
}

impl ConstraintVars {
    /// Marginal value in the published sign convention: positive when
    /// relaxing the constraint lowers the objective.
    pub fn marginal_value(&self, solution: &LpSolution) -> f64 {
        let dual = solution.dual(self.row);
        match self.constraint_type {
            ConstraintType::Le => -dual,
            ConstraintType::Ge | ConstraintType::Eq => dual,
        }
    }
}

/// Problem plus entity index for one solve.
#[derive(Debug, Clone)]
pub struct DispatchModel {
    pub pass: Pass,
    pub problem: LinearProblem,
    pub traders: Vec<TraderVars>,
    pub regions: Vec<RegionVars>,
    pub interconnectors: Vec<InterconnectorVars>,
    pub constraints: Vec<ConstraintVars>,
    pub violations: Vec<Violation>,
}

impl DispatchModel {
    pub(crate) fn new(pass: Pass, name: impl Into<String>) -> Self {
        Self {
            pass,
            problem: LinearProblem::new(name),
            traders: Vec::new(),
            regions: Vec::new(),
            interconnectors: Vec::new(),
            constraints: Vec::new(),
            violations: Vec::new(),
        }
    }

    /// Non-negative slack priced at `penalty` per MW.
    pub(crate) fn add_violation(
        &mut self,
        name: impl Into<String>,
        kind: ViolationKind,
        penalty: f64,
    ) -> VarId {
        let var = self.problem.add_nonneg(name);
        self.problem.add_cost(var, penalty);
        self.violations.push(Violation { var, kind });
        var
    }

    pub fn trader(&self, id: &str) -> Option<&TraderVars> {
        self.traders.iter().find(|t| t.trader_id.as_str() == id)
    }

    pub fn region(&self, id: &str) -> Option<&RegionVars> {
        self.regions.iter().find(|r| r.region_id.as_str() == id)
    }

    pub fn interconnector(&self, id: &str) -> Option<&InterconnectorVars> {
        self.interconnectors
            .iter()
            .find(|i| i.interconnector_id.as_str() == id)
    }

    /// Sum of solved violation amounts in one category.
    pub fn violation_total(&self, kind: ViolationKind, solution: &LpSolution) -> f64 {
        self.violations
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| solution.value(v.var))
            .sum()
    }
}

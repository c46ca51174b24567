//! Dispatch solution schema.
//!
//! One shape serves both the historical record carried in a casefile and the
//! solution the engine computes, so the validator can compare them field by
//! field. Field names serialise in the PascalCase of the published output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ConstraintId, InterconnectorId, RegionId, TradeType, TraderId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DispatchSolution {
    pub case_solution: CaseSolution,
    #[serde(default)]
    pub period_solution: PeriodSolution,
    #[serde(default)]
    pub region_solution: Vec<RegionSolution>,
    #[serde(default)]
    pub interconnector_solution: Vec<InterconnectorSolution>,
    #[serde(default)]
    pub trader_solution: Vec<TraderSolution>,
    #[serde(default)]
    pub constraint_solution: Vec<ConstraintSolution>,
}

impl DispatchSolution {
    pub fn region(&self, id: &str) -> Option<&RegionSolution> {
        self.region_solution.iter().find(|r| r.region_id.as_str() == id)
    }

    pub fn interconnector(&self, id: &str) -> Option<&InterconnectorSolution> {
        self.interconnector_solution
            .iter()
            .find(|i| i.interconnector_id.as_str() == id)
    }

    pub fn trader(&self, id: &str) -> Option<&TraderSolution> {
        self.trader_solution.iter().find(|t| t.trader_id.as_str() == id)
    }

    pub fn constraint(&self, id: &str) -> Option<&ConstraintSolution> {
        self.constraint_solution
            .iter()
            .find(|c| c.constraint_id.as_str() == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CaseSolution {
    #[serde(rename = "CaseID")]
    pub case_id: String,
    #[serde(default)]
    pub intervention: bool,
    /// Status of the final solve (`optimal`, `infeasible`, ...).
    #[serde(default)]
    pub solver_status: String,
    /// Number of solver calls made for the interval.
    #[serde(default)]
    pub solves: u32,
}

/// Interval-level objective and violation totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PeriodSolution {
    pub total_objective: f64,
    pub total_area_gen_violation: f64,
    pub total_interconnector_violation: f64,
    pub total_generic_violation: f64,
    pub total_ramp_rate_violation: f64,
    #[serde(rename = "TotalUnitMWCapacityViolation")]
    pub total_unit_mw_capacity_violation: f64,
    pub total_energy_offer_violation: f64,
    #[serde(rename = "TotalASProfileViolation")]
    pub total_as_profile_violation: f64,
    pub total_fast_start_violation: f64,
    #[serde(rename = "TotalMNSPRampRateViolation")]
    pub total_mnsp_ramp_rate_violation: f64,
    #[serde(rename = "TotalMNSPOfferViolation")]
    pub total_mnsp_offer_violation: f64,
    #[serde(rename = "TotalMNSPCapacityViolation")]
    pub total_mnsp_capacity_violation: f64,
    #[serde(rename = "TotalUIGFViolation")]
    pub total_uigf_violation: f64,
}

impl PeriodSolution {
    /// Violation totals with their output field names.
    pub fn violation_totals(&self) -> [(&'static str, f64); 12] {
        [
            ("TotalAreaGenViolation", self.total_area_gen_violation),
            ("TotalInterconnectorViolation", self.total_interconnector_violation),
            ("TotalGenericViolation", self.total_generic_violation),
            ("TotalRampRateViolation", self.total_ramp_rate_violation),
            ("TotalUnitMWCapacityViolation", self.total_unit_mw_capacity_violation),
            ("TotalEnergyOfferViolation", self.total_energy_offer_violation),
            ("TotalASProfileViolation", self.total_as_profile_violation),
            ("TotalFastStartViolation", self.total_fast_start_violation),
            ("TotalMNSPRampRateViolation", self.total_mnsp_ramp_rate_violation),
            ("TotalMNSPOfferViolation", self.total_mnsp_offer_violation),
            ("TotalMNSPCapacityViolation", self.total_mnsp_capacity_violation),
            ("TotalUIGFViolation", self.total_uigf_violation),
        ]
    }
}

/// Regional FCAS clearing for one service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegionFcas {
    pub dispatch: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RegionSolution {
    #[serde(rename = "RegionID")]
    pub region_id: RegionId,
    pub energy_price: f64,
    pub dispatched_generation: f64,
    pub dispatched_load: f64,
    pub fixed_demand: f64,
    pub net_export: f64,
    pub surplus_generation: f64,
    pub cleared_demand: f64,
    pub available_generation: f64,
    pub available_load: f64,
    #[serde(rename = "FCAS")]
    pub fcas: BTreeMap<TradeType, RegionFcas>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InterconnectorSolution {
    #[serde(rename = "InterconnectorID")]
    pub interconnector_id: InterconnectorId,
    pub flow: f64,
    pub losses: f64,
    /// Limit violation (MW).
    pub deficit: f64,
    /// Marginal value of the binding flow limit.
    pub price: f64,
    /// Loss-curve value at the solved flow.
    pub ideal_losses: f64,
}

/// Trader FCAS target and its violation for one service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FcasOutcome {
    pub target: f64,
    #[serde(default)]
    pub violation: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TraderSolution {
    #[serde(rename = "TraderID")]
    pub trader_id: TraderId,
    pub energy_target: f64,
    #[serde(rename = "FCAS")]
    pub fcas: BTreeMap<TradeType, FcasOutcome>,
    #[serde(rename = "FSTargetMode", skip_serializing_if = "Option::is_none")]
    pub fs_target_mode: Option<u8>,
    /// Effective ramp up rate used by the model (MW/h).
    pub ramp_up_rate: f64,
    /// Effective ramp down rate used by the model (MW/h).
    #[serde(rename = "RampDnRate")]
    pub ramp_down_rate: f64,
    pub ramp_deficit: f64,
    #[serde(rename = "UIGFViolation")]
    pub uigf_violation: f64,
}

impl TraderSolution {
    pub fn fcas_target(&self, trade_type: TradeType) -> f64 {
        self.fcas.get(&trade_type).map(|f| f.target).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ConstraintSolution {
    #[serde(rename = "ConstraintID")]
    pub constraint_id: ConstraintId,
    #[serde(rename = "RHS")]
    pub rhs: f64,
    pub marginal_value: f64,
    pub deficit: f64,
}

//! Generic network constraints and the equations that compute their RHS.

use serde::{Deserialize, Serialize};

use crate::{
    ConstraintId, EquationId, Interconnector, InterconnectorId, Region, RegionId, TradeType,
    Trader, TraderId,
};

/// Relational type of a generic constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintType {
    #[serde(rename = "LE")]
    Le,
    #[serde(rename = "GE")]
    Ge,
    #[serde(rename = "EQ")]
    Eq,
}

impl std::fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConstraintType::Le => "LE",
            ConstraintType::Ge => "GE",
            ConstraintType::Eq => "EQ",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderFactor {
    pub trader_id: TraderId,
    pub trade_type: TradeType,
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterconnectorFactor {
    pub interconnector_id: InterconnectorId,
    pub factor: f64,
}

/// Region term: the sum of the region's trader totals for `trade_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFactor {
    pub region_id: RegionId,
    pub trade_type: TradeType,
    pub factor: f64,
}

/// Left-hand side of a generic constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LhsTerms {
    #[serde(default)]
    pub traders: Vec<TraderFactor>,
    #[serde(default)]
    pub interconnectors: Vec<InterconnectorFactor>,
    #[serde(default)]
    pub regions: Vec<RegionFactor>,
}

impl LhsTerms {
    pub fn is_empty(&self) -> bool {
        self.traders.is_empty() && self.interconnectors.is_empty() && self.regions.is_empty()
    }
}

/// Where a constraint's right-hand side comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RhsSource {
    Literal {
        value: f64,
    },
    /// Evaluate an equation; `default` stands in when the equation is absent
    /// from the casefile.
    Equation {
        equation_id: EquationId,
        #[serde(default)]
        default: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericConstraint {
    pub id: ConstraintId,
    #[serde(default)]
    pub version: Option<String>,
    pub constraint_type: ConstraintType,
    pub rhs: RhsSource,
    /// $/MW applied to the constraint's violation variable.
    pub violation_price: f64,
    #[serde(default)]
    pub lhs: LhsTerms,
    /// Applies to the physical-dispatch pass only; dropped from the pricing pass.
    #[serde(default)]
    pub intervention: bool,
}

/// Casefile attributes an equation may read from a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionAttribute {
    InitialDemand,
    Ade,
    DemandForecast,
}

impl RegionAttribute {
    pub fn read(&self, region: &Region) -> Option<f64> {
        Some(match self {
            RegionAttribute::InitialDemand => region.initial_demand,
            RegionAttribute::Ade => region.ade,
            RegionAttribute::DemandForecast => region.demand_forecast,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraderAttribute {
    InitialMw,
    Hmw,
    Lmw,
    Uigf,
    AgcStatus,
    ScadaRampUpRate,
    ScadaRampDownRate,
}

impl TraderAttribute {
    pub fn read(&self, trader: &Trader) -> Option<f64> {
        let initial = &trader.initial;
        match self {
            TraderAttribute::InitialMw => Some(initial.initial_mw),
            TraderAttribute::Hmw => initial.hmw,
            TraderAttribute::Lmw => initial.lmw,
            TraderAttribute::Uigf => trader.uigf,
            TraderAttribute::AgcStatus => Some(if initial.agc_status { 1.0 } else { 0.0 }),
            TraderAttribute::ScadaRampUpRate => initial.scada_ramp_up_rate,
            TraderAttribute::ScadaRampDownRate => initial.scada_ramp_down_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterconnectorAttribute {
    InitialMw,
    UpperLimit,
    LowerLimit,
}

impl InterconnectorAttribute {
    pub fn read(&self, interconnector: &Interconnector) -> Option<f64> {
        Some(match self {
            InterconnectorAttribute::InitialMw => interconnector.initial_mw,
            InterconnectorAttribute::UpperLimit => interconnector.upper_limit,
            InterconnectorAttribute::LowerLimit => interconnector.lower_limit,
        })
    }
}

/// Value an equation term reads before applying its multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operand {
    Constant {
        value: f64,
    },
    /// SCADA point. Live telemetry is not modelled; the default is always used.
    Telemetry {
        tag: String,
        #[serde(default)]
        default: f64,
    },
    Region {
        region_id: RegionId,
        attribute: RegionAttribute,
        #[serde(default)]
        default: f64,
    },
    Trader {
        trader_id: TraderId,
        attribute: TraderAttribute,
        #[serde(default)]
        default: f64,
    },
    Interconnector {
        interconnector_id: InterconnectorId,
        attribute: InterconnectorAttribute,
        #[serde(default)]
        default: f64,
    },
    /// Another constraint's resolved right-hand side.
    Constraint {
        constraint_id: ConstraintId,
        #[serde(default)]
        default: f64,
    },
    /// Value of a nested equation.
    Equation {
        equation_id: EquationId,
    },
}

/// Stack-machine instruction.
///
/// Binary operations with an operand combine the top of the stack with the
/// operand; without one they combine the top two entries. Unary operations
/// with an operand push the result; without one they rewrite the top entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    #[default]
    Push,
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
    Neg,
    Abs,
    Sqrt,
    /// 1 if the value is positive, else 0
    Step,
    Pow2,
    Pow3,
    Dup,
    Exch,
    Pop,
}

impl Operation {
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            Operation::Add
                | Operation::Sub
                | Operation::Mul
                | Operation::Div
                | Operation::Max
                | Operation::Min
        )
    }

    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            Operation::Neg
                | Operation::Abs
                | Operation::Sqrt
                | Operation::Step
                | Operation::Pow2
                | Operation::Pow3
        )
    }
}

fn unit_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationTerm {
    #[serde(default = "unit_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub operand: Option<Operand>,
    #[serde(default)]
    pub operation: Operation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericEquation {
    pub id: EquationId,
    pub terms: Vec<EquationTerm>,
}

//! Trade and trader classifications.

use serde::{Deserialize, Serialize};

/// Market a price/quantity offer is submitted into.
///
/// Codes follow the casefile: two energy trade types and eight FCAS services
/// (raise/lower x 6 second, 60 second, 5 minute contingency, 5 minute regulation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TradeType {
    /// Energy offer from a generator
    #[serde(rename = "ENOF")]
    EnergyOffer,
    /// Energy bid from a scheduled load
    #[serde(rename = "LDOF")]
    LoadOffer,
    #[serde(rename = "R6SE")]
    Raise6Sec,
    #[serde(rename = "R60S")]
    Raise60Sec,
    #[serde(rename = "R5MI")]
    Raise5Min,
    #[serde(rename = "R5RE")]
    RaiseReg,
    #[serde(rename = "L6SE")]
    Lower6Sec,
    #[serde(rename = "L60S")]
    Lower60Sec,
    #[serde(rename = "L5MI")]
    Lower5Min,
    #[serde(rename = "L5RE")]
    LowerReg,
}

impl TradeType {
    pub const FCAS: [TradeType; 8] = [
        TradeType::Raise6Sec,
        TradeType::Raise60Sec,
        TradeType::Raise5Min,
        TradeType::RaiseReg,
        TradeType::Lower6Sec,
        TradeType::Lower60Sec,
        TradeType::Lower5Min,
        TradeType::LowerReg,
    ];

    pub const CONTINGENCY: [TradeType; 6] = [
        TradeType::Raise6Sec,
        TradeType::Raise60Sec,
        TradeType::Raise5Min,
        TradeType::Lower6Sec,
        TradeType::Lower60Sec,
        TradeType::Lower5Min,
    ];

    /// Casefile code (`ENOF`, `R5RE`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            TradeType::EnergyOffer => "ENOF",
            TradeType::LoadOffer => "LDOF",
            TradeType::Raise6Sec => "R6SE",
            TradeType::Raise60Sec => "R60S",
            TradeType::Raise5Min => "R5MI",
            TradeType::RaiseReg => "R5RE",
            TradeType::Lower6Sec => "L6SE",
            TradeType::Lower60Sec => "L60S",
            TradeType::Lower5Min => "L5MI",
            TradeType::LowerReg => "L5RE",
        }
    }

    /// Prefix used in solution field names (`R6Target`, `L5RegPrice`).
    pub fn solution_prefix(&self) -> &'static str {
        match self {
            TradeType::EnergyOffer | TradeType::LoadOffer => "Energy",
            TradeType::Raise6Sec => "R6",
            TradeType::Raise60Sec => "R60",
            TradeType::Raise5Min => "R5",
            TradeType::RaiseReg => "R5Reg",
            TradeType::Lower6Sec => "L6",
            TradeType::Lower60Sec => "L60",
            TradeType::Lower5Min => "L5",
            TradeType::LowerReg => "L5Reg",
        }
    }

    pub fn is_energy(&self) -> bool {
        matches!(self, TradeType::EnergyOffer | TradeType::LoadOffer)
    }

    pub fn is_fcas(&self) -> bool {
        !self.is_energy()
    }

    pub fn is_regulation(&self) -> bool {
        matches!(self, TradeType::RaiseReg | TradeType::LowerReg)
    }

    pub fn is_contingency(&self) -> bool {
        self.is_fcas() && !self.is_regulation()
    }

    pub fn is_raise(&self) -> bool {
        matches!(
            self,
            TradeType::Raise6Sec
                | TradeType::Raise60Sec
                | TradeType::Raise5Min
                | TradeType::RaiseReg
        )
    }
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ENOF" => Ok(TradeType::EnergyOffer),
            "LDOF" => Ok(TradeType::LoadOffer),
            "R6SE" => Ok(TradeType::Raise6Sec),
            "R60S" => Ok(TradeType::Raise60Sec),
            "R5MI" => Ok(TradeType::Raise5Min),
            "R5RE" => Ok(TradeType::RaiseReg),
            "L6SE" => Ok(TradeType::Lower6Sec),
            "L60S" => Ok(TradeType::Lower60Sec),
            "L5MI" => Ok(TradeType::Lower5Min),
            "L5RE" => Ok(TradeType::LowerReg),
            other => Err(format!("unknown trade type '{other}'")),
        }
    }
}

/// Physical role of a trader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraderType {
    Generator,
    Load,
    NormallyOnLoad,
}

impl TraderType {
    pub fn is_load(&self) -> bool {
        matches!(self, TraderType::Load | TraderType::NormallyOnLoad)
    }

    /// Energy trade type this role offers into.
    pub fn energy_trade_type(&self) -> TradeType {
        if self.is_load() {
            TradeType::LoadOffer
        } else {
            TradeType::EnergyOffer
        }
    }
}

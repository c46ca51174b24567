//! Traders (dispatchable units) and their offers.

use serde::{Deserialize, Serialize};

use crate::{RegionId, TradeType, TraderId, TraderType};

/// Maximum number of price bands per offer.
pub const MAX_BANDS: usize = 10;

/// One (price, quantity) pair of a price structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    /// $/MWh (energy) or $/MW (FCAS)
    pub price: f64,
    /// MW offered at this price for the interval
    pub quantity: f64,
}

/// FCAS trapezium geometry in energy-target space (MW).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FcasTrapezium {
    pub enablement_min: f64,
    pub enablement_max: f64,
    pub low_breakpoint: f64,
    pub high_breakpoint: f64,
}

/// A trader's offer into one market for the interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub trade_type: TradeType,
    /// Bands in offer order; prices are non-decreasing.
    pub bands: Vec<PriceBand>,
    /// Maximum availability for the interval (MW).
    pub max_avail: f64,
    /// Required for FCAS offers.
    #[serde(default)]
    pub trapezium: Option<FcasTrapezium>,
    /// Energy offers only (MW/h).
    #[serde(default)]
    pub ramp_up_rate: Option<f64>,
    /// Energy offers only (MW/h).
    #[serde(default)]
    pub ramp_down_rate: Option<f64>,
}

impl Offer {
    pub fn total_quantity(&self) -> f64 {
        self.bands.iter().map(|b| b.quantity).sum()
    }

    pub fn has_positive_quantity(&self) -> bool {
        self.bands.iter().any(|b| b.quantity > 0.0)
    }
}

/// Fast-start inflexibility profile mode.
///
/// Mode 0 is uncommitted, 1 synchronising at zero output, 2 following the
/// fixed start-up trajectory, 3 held at or above minimum loading, 4 normal
/// dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FastStartMode {
    Uncommitted,
    Synchronising,
    Trajectory,
    MinimumLoading,
    Normal,
}

impl FastStartMode {
    pub fn number(&self) -> u8 {
        match self {
            FastStartMode::Uncommitted => 0,
            FastStartMode::Synchronising => 1,
            FastStartMode::Trajectory => 2,
            FastStartMode::MinimumLoading => 3,
            FastStartMode::Normal => 4,
        }
    }

    /// Following mode, saturating at [`FastStartMode::Normal`].
    pub fn next(&self) -> FastStartMode {
        match self {
            FastStartMode::Uncommitted => FastStartMode::Synchronising,
            FastStartMode::Synchronising => FastStartMode::Trajectory,
            FastStartMode::Trajectory => FastStartMode::MinimumLoading,
            FastStartMode::MinimumLoading | FastStartMode::Normal => FastStartMode::Normal,
        }
    }
}

impl TryFrom<u8> for FastStartMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FastStartMode::Uncommitted),
            1 => Ok(FastStartMode::Synchronising),
            2 => Ok(FastStartMode::Trajectory),
            3 => Ok(FastStartMode::MinimumLoading),
            4 => Ok(FastStartMode::Normal),
            other => Err(format!("fast start mode must be 0-4, got {other}")),
        }
    }
}

impl From<FastStartMode> for u8 {
    fn from(mode: FastStartMode) -> u8 {
        mode.number()
    }
}

/// Fast-start parameters (durations in minutes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FastStartProfile {
    pub t1: f64,
    pub t2: f64,
    pub t3: f64,
    pub t4: f64,
    pub min_loading_mw: f64,
    pub current_mode: FastStartMode,
    /// Minutes already spent in `current_mode`.
    #[serde(default)]
    pub current_mode_time: f64,
}

impl FastStartProfile {
    /// Configured duration of a mode; mode 0 and 4 are open-ended.
    pub fn duration(&self, mode: FastStartMode) -> Option<f64> {
        match mode {
            FastStartMode::Synchronising => Some(self.t1),
            FastStartMode::Trajectory => Some(self.t2),
            FastStartMode::MinimumLoading => Some(self.t3),
            FastStartMode::Uncommitted | FastStartMode::Normal => None,
        }
    }
}

/// Initial conditions and SCADA telemetry at the start of the interval.
///
/// Telemetry fields are optional; an absent value disables whatever
/// adjustment would have used it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TraderInitialConditions {
    pub initial_mw: f64,
    /// AGC upper enablement limit (MW)
    #[serde(default)]
    pub hmw: Option<f64>,
    /// AGC lower enablement limit (MW)
    #[serde(default)]
    pub lmw: Option<f64>,
    #[serde(default)]
    pub agc_status: bool,
    /// MW/h
    #[serde(default)]
    pub scada_ramp_up_rate: Option<f64>,
    /// MW/h
    #[serde(default)]
    pub scada_ramp_down_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trader {
    pub id: TraderId,
    pub region_id: RegionId,
    pub trader_type: TraderType,
    /// Semi-scheduled unit capped by its unconstrained intermittent generation forecast.
    #[serde(default)]
    pub semi_dispatch: bool,
    /// Unconstrained intermittent generation forecast (MW).
    #[serde(default)]
    pub uigf: Option<f64>,
    #[serde(default)]
    pub fast_start: Option<FastStartProfile>,
    pub initial: TraderInitialConditions,
    pub offers: Vec<Offer>,
}

impl Trader {
    pub fn offer(&self, trade_type: TradeType) -> Option<&Offer> {
        self.offers.iter().find(|o| o.trade_type == trade_type)
    }

    pub fn energy_trade_type(&self) -> TradeType {
        self.trader_type.energy_trade_type()
    }

    pub fn energy_offer(&self) -> Option<&Offer> {
        self.offer(self.energy_trade_type())
    }

    /// Energy availability used by FCAS checks: UIGF for semi-dispatch units,
    /// otherwise the energy offer's max availability.
    pub fn energy_availability(&self) -> Option<f64> {
        if self.semi_dispatch {
            self.uigf.or_else(|| self.energy_offer().map(|o| o.max_avail))
        } else {
            self.energy_offer().map(|o| o.max_avail)
        }
    }

    pub fn fcas_offers(&self) -> impl Iterator<Item = &Offer> {
        self.offers.iter().filter(|o| o.trade_type.is_fcas())
    }

    /// Energy ramp-up rate (MW/h), offered or telemetered, whichever is tighter.
    pub fn energy_ramp_up_rate(&self) -> Option<f64> {
        tighter(
            self.energy_offer().and_then(|o| o.ramp_up_rate),
            self.initial.scada_ramp_up_rate,
        )
    }

    pub fn energy_ramp_down_rate(&self) -> Option<f64> {
        tighter(
            self.energy_offer().and_then(|o| o.ramp_down_rate),
            self.initial.scada_ramp_down_rate,
        )
    }
}

fn tighter(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

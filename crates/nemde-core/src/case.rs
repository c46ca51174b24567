//! Interval-level case parameters.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Case header for one dispatch interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    /// Interval identifier, e.g. `20201101001`.
    pub case_id: String,
    /// Start of the dispatch interval (market time).
    #[serde(default)]
    pub interval_start: Option<NaiveDateTime>,
    /// Value of lost load, the market price cap ($/MWh).
    pub voll: f64,
    /// Market price floor ($/MWh).
    pub market_price_floor: f64,
    /// Set when the interval was subject to an operator intervention and must
    /// be priced by a second, intervention-free pass.
    #[serde(default)]
    pub intervention: bool,
    /// Select the convex-combination loss encoding instead of segment selection.
    #[serde(default)]
    pub use_convex_loss_model: bool,
    /// Per-interval override of the configured tie-break price.
    #[serde(default)]
    pub tie_break_price: Option<f64>,
    pub penalties: PenaltyPrices,
}

/// Constraint violation penalty prices ($/MW), one per violation category.
///
/// Generic constraints carry their own price; every other softened
/// constraint draws its price from this table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyPrices {
    pub energy_deficit: f64,
    pub energy_surplus: f64,
    pub uigf_surplus: f64,
    pub ramp_rate: f64,
    pub unit_capacity: f64,
    pub energy_offer: f64,
    pub mnsp_offer: f64,
    pub mnsp_ramp_rate: f64,
    pub mnsp_capacity: f64,
    pub as_profile: f64,
    pub as_max_avail: f64,
    pub as_enablement_min: f64,
    pub as_enablement_max: f64,
    pub interconnector: f64,
    pub fast_start: f64,
}

impl Default for PenaltyPrices {
    /// Relative ordering of the published constraint violation multipliers,
    /// scaled to a $15,000/MWh price cap.
    fn default() -> Self {
        Self {
            energy_deficit: 2_250_000.0,
            energy_surplus: 2_250_000.0,
            uigf_surplus: 5_700_000.0,
            ramp_rate: 5_100_000.0,
            unit_capacity: 5_550_000.0,
            energy_offer: 5_400_000.0,
            mnsp_offer: 5_400_000.0,
            mnsp_ramp_rate: 5_100_000.0,
            mnsp_capacity: 5_550_000.0,
            as_profile: 2_100_000.0,
            as_max_avail: 2_100_000.0,
            as_enablement_min: 1_050_000.0,
            as_enablement_max: 1_050_000.0,
            interconnector: 4_500_000.0,
            fast_start: 5_250_000.0,
        }
    }
}

impl PenaltyPrices {
    /// All prices with their field names, for validation messages.
    pub fn named(&self) -> [(&'static str, f64); 15] {
        [
            ("energy_deficit", self.energy_deficit),
            ("energy_surplus", self.energy_surplus),
            ("uigf_surplus", self.uigf_surplus),
            ("ramp_rate", self.ramp_rate),
            ("unit_capacity", self.unit_capacity),
            ("energy_offer", self.energy_offer),
            ("mnsp_offer", self.mnsp_offer),
            ("mnsp_ramp_rate", self.mnsp_ramp_rate),
            ("mnsp_capacity", self.mnsp_capacity),
            ("as_profile", self.as_profile),
            ("as_max_avail", self.as_max_avail),
            ("as_enablement_min", self.as_enablement_min),
            ("as_enablement_max", self.as_enablement_max),
            ("interconnector", self.interconnector),
            ("fast_start", self.fast_start),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_penalty_table_uses_defaults() {
        let prices: PenaltyPrices = serde_json::from_str(r#"{"energy_deficit": 10.0}"#).unwrap();
        assert_eq!(prices.energy_deficit, 10.0);
        assert_eq!(prices.fast_start, PenaltyPrices::default().fast_start);
    }

    #[test]
    fn case_defaults_optional_flags() {
        let case: Case = serde_json::from_str(
            r#"{"case_id": "20201101001", "voll": 15000.0, "market_price_floor": -1000.0,
                "penalties": {}}"#,
        )
        .unwrap();
        assert!(!case.intervention);
        assert!(!case.use_convex_loss_model);
        assert!(case.tie_break_price.is_none());
        assert!(case.interval_start.is_none());
    }
}

use serde::{Deserialize, Serialize};

use crate::RegionId;

/// Demand inputs for one market region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    /// Metered demand at the start of the interval (MW), including scheduled
    /// load and allocated losses.
    pub initial_demand: f64,
    /// Aggregate dispatch error carried from the previous interval (MW).
    #[serde(default)]
    pub ade: f64,
    /// Forecast demand change over the interval (MW).
    #[serde(default)]
    pub demand_forecast: f64,
}

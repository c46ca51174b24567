//! Interconnectors, their loss models, and MNSP offers.

use serde::{Deserialize, Serialize};

use crate::{InterconnectorId, PriceBand, RegionId};

/// One segment of a piecewise loss model.
///
/// The segment ends at `limit` MW and starts at the previous segment's limit
/// (or at `-loss_lower_limit` for the first segment). `factor` is the
/// marginal loss over the segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossSegment {
    pub limit: f64,
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossModel {
    /// Share of losses allocated to the from-region (0..=1).
    pub loss_share: f64,
    /// Magnitude of the most negative flow covered by the segments.
    pub loss_lower_limit: f64,
    /// Ordered by strictly increasing `limit`.
    pub segments: Vec<LossSegment>,
}

/// MNSP offer for one end of the link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MnspOffer {
    pub region_id: RegionId,
    pub bands: Vec<PriceBand>,
    pub max_avail: f64,
    #[serde(default)]
    pub ramp_up_rate: Option<f64>,
    #[serde(default)]
    pub ramp_down_rate: Option<f64>,
}

/// Market network service provider data.
///
/// Flow is `to_region offer - from_region offer`: the to-region offer sells
/// energy delivered in the positive direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mnsp {
    pub from_region_offer: MnspOffer,
    pub to_region_offer: MnspOffer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interconnector {
    pub id: InterconnectorId,
    pub from_region: RegionId,
    pub to_region: RegionId,
    /// Maximum flow in the forward direction (MW).
    pub upper_limit: f64,
    /// Maximum flow in the reverse direction, as a positive number (MW).
    pub lower_limit: f64,
    #[serde(default)]
    pub initial_mw: f64,
    pub loss_model: LossModel,
    #[serde(default)]
    pub mnsp: Option<Mnsp>,
}

impl Interconnector {
    pub fn is_mnsp(&self) -> bool {
        self.mnsp.is_some()
    }

    /// +1 for the from-region, -1 for the to-region, 0 otherwise.
    pub fn export_sign(&self, region: &RegionId) -> f64 {
        if &self.from_region == region {
            1.0
        } else if &self.to_region == region {
            -1.0
        } else {
            0.0
        }
    }

    /// Fraction of interconnector losses borne by `region`.
    ///
    /// Regulated interconnectors split by `loss_share`; MNSP losses fall
    /// wholly on the sending end as seen at the start of the interval.
    pub fn loss_allocation(&self, region: &RegionId) -> f64 {
        if self.is_mnsp() {
            let sending = if self.initial_mw >= 0.0 {
                &self.from_region
            } else {
                &self.to_region
            };
            if sending == region {
                1.0
            } else {
                0.0
            }
        } else if &self.from_region == region {
            self.loss_model.loss_share
        } else if &self.to_region == region {
            1.0 - self.loss_model.loss_share
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(mnsp: bool, initial_mw: f64) -> Interconnector {
        let offer = |region: &str| MnspOffer {
            region_id: region.into(),
            bands: vec![],
            max_avail: 0.0,
            ramp_up_rate: None,
            ramp_down_rate: None,
        };
        Interconnector {
            id: "T-V-MNSP1".into(),
            from_region: "TAS1".into(),
            to_region: "VIC1".into(),
            upper_limit: 478.0,
            lower_limit: 478.0,
            initial_mw,
            loss_model: LossModel {
                loss_share: 0.3,
                loss_lower_limit: 478.0,
                segments: vec![],
            },
            mnsp: mnsp.then(|| Mnsp {
                from_region_offer: offer("TAS1"),
                to_region_offer: offer("VIC1"),
            }),
        }
    }

    #[test]
    fn regulated_losses_split_by_share() {
        let ic = link(false, 100.0);
        assert_eq!(ic.loss_allocation(&"TAS1".into()), 0.3);
        assert!((ic.loss_allocation(&"VIC1".into()) - 0.7).abs() < 1e-12);
        assert_eq!(ic.loss_allocation(&"NSW1".into()), 0.0);
    }

    #[test]
    fn mnsp_losses_follow_initial_direction() {
        let forward = link(true, 50.0);
        assert_eq!(forward.loss_allocation(&"TAS1".into()), 1.0);
        let reverse = link(true, -50.0);
        assert_eq!(reverse.loss_allocation(&"VIC1".into()), 1.0);
        assert_eq!(reverse.loss_allocation(&"TAS1".into()), 0.0);
    }

    #[test]
    fn export_sign_by_end() {
        let ic = link(false, 0.0);
        assert_eq!(ic.export_sign(&"TAS1".into()), 1.0);
        assert_eq!(ic.export_sign(&"VIC1".into()), -1.0);
    }
}

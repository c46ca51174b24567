//! FCAS trapezium scaling and availability.
//!
//! An FCAS offer's trapezium bounds the service target as a function of the
//! unit's energy target: zero outside `[enablement_min, enablement_max]`,
//! rising to `max_avail` at `low_breakpoint`, flat to `high_breakpoint`, and
//! falling back to zero at `enablement_max`.
//!
//! Before the model is built each trapezium is scaled to the unit's telemetry:
//!
//! - regulation offers: AGC lower limit (LMW), AGC upper limit (HMW), SCADA
//!   ramp rate, then UIGF for semi-dispatch units
//! - contingency offers of semi-dispatch units: UIGF only
//! - other contingency offers: unscaled
//!
//! Scaling moves an enablement limit inward, keeps the original slopes, and
//! lowers `max_avail` where the two sloped sides now meet below it.

use nemde_core::{FcasTrapezium, Offer, TradeType, Trader};
use tracing::debug;

use crate::error::ResolveError;

/// Straight line in (energy, service) space. `slope == None` is vertical.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Line {
    slope: Option<f64>,
    x_intercept: f64,
}

impl Line {
    fn y_intercept(&self) -> Option<f64> {
        self.slope.map(|m| -m * self.x_intercept)
    }

    fn y_at(&self, x: f64) -> Option<f64> {
        self.slope.map(|m| m * (x - self.x_intercept))
    }

    /// Point where both lines meet, if it is unique.
    fn intersection(&self, other: &Line) -> Option<(f64, f64)> {
        match (self.slope, other.slope) {
            (Some(m1), Some(m2)) => {
                if m1 == m2 {
                    return None;
                }
                let b1 = self.y_intercept()?;
                let b2 = other.y_intercept()?;
                let x = (b2 - b1) / (m1 - m2);
                Some((x, m1 * x + b1))
            }
            (None, Some(_)) => {
                let x = self.x_intercept;
                Some((x, other.y_at(x)?))
            }
            (Some(_), None) => {
                let x = other.x_intercept;
                Some((x, self.y_at(x)?))
            }
            (None, None) => None,
        }
    }

    /// Energy where the line reaches `level`; vertical or flat lines keep
    /// their x-intercept.
    fn x_at(&self, level: f64) -> f64 {
        match self.slope {
            Some(m) if m != 0.0 => level / m + self.x_intercept,
            _ => self.x_intercept,
        }
    }
}

/// Trapezium geometry plus the availability it bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trapezium {
    pub enablement_min: f64,
    pub enablement_max: f64,
    pub low_breakpoint: f64,
    pub high_breakpoint: f64,
    pub max_avail: f64,
}

impl Trapezium {
    pub fn new(geometry: &FcasTrapezium, max_avail: f64) -> Self {
        Self {
            enablement_min: geometry.enablement_min,
            enablement_max: geometry.enablement_max,
            low_breakpoint: geometry.low_breakpoint,
            high_breakpoint: geometry.high_breakpoint,
            max_avail,
        }
    }

    fn lhs_slope(&self) -> Option<f64> {
        let width = self.low_breakpoint - self.enablement_min;
        (width != 0.0).then(|| self.max_avail / width)
    }

    fn rhs_slope(&self) -> Option<f64> {
        let width = self.enablement_max - self.high_breakpoint;
        (width != 0.0).then(|| -self.max_avail / width)
    }

    /// Raise the enablement minimum to an AGC lower limit.
    pub fn scale_lhs(&mut self, limit: Option<f64>) {
        let Some(limit) = limit else { return };
        if limit == 0.0 || limit <= self.enablement_min {
            return;
        }
        let lhs = Line {
            slope: self.lhs_slope(),
            x_intercept: limit,
        };
        let rhs = Line {
            slope: self.rhs_slope(),
            x_intercept: self.enablement_max,
        };
        self.clip_and_rebreak(&lhs, &rhs);
        self.enablement_min = limit;
    }

    /// Lower the enablement maximum to an AGC upper limit or UIGF.
    pub fn scale_rhs(&mut self, limit: Option<f64>) {
        let Some(limit) = limit else { return };
        if limit == 0.0 || limit >= self.enablement_max {
            return;
        }
        let lhs = Line {
            slope: self.lhs_slope(),
            x_intercept: self.enablement_min,
        };
        let rhs = Line {
            slope: self.rhs_slope(),
            x_intercept: limit,
        };
        self.clip_and_rebreak(&lhs, &rhs);
        self.enablement_max = limit;
    }

    fn clip_and_rebreak(&mut self, lhs: &Line, rhs: &Line) {
        if let Some((_, y)) = lhs.intersection(rhs) {
            if y < self.max_avail {
                self.max_avail = y.max(0.0);
            }
        }
        self.low_breakpoint = lhs.x_at(self.max_avail);
        self.high_breakpoint = rhs.x_at(self.max_avail);
    }

    /// Cap availability at what the unit can ramp in one interval.
    pub fn scale_ramp(&mut self, rate_mw_per_hour: Option<f64>, intervals_per_hour: f64) {
        let Some(rate) = rate_mw_per_hour else { return };
        if rate == 0.0 {
            return;
        }
        let capped = self.max_avail.min(rate / intervals_per_hour);
        if capped < self.max_avail {
            if let Some(slope) = self.lhs_slope() {
                self.low_breakpoint = Line {
                    slope: Some(slope),
                    x_intercept: self.enablement_min,
                }
                .x_at(capped);
            }
            if let Some(slope) = self.rhs_slope() {
                self.high_breakpoint = Line {
                    slope: Some(slope),
                    x_intercept: self.enablement_max,
                }
                .x_at(capped);
            }
        }
        self.max_avail = capped;
    }

    /// `(enablement_max - high_breakpoint) / max_avail`, the energy given up
    /// per MW of service on the falling side.
    pub fn upper_slope_coefficient(&self) -> f64 {
        if self.max_avail > 0.0 {
            (self.enablement_max - self.high_breakpoint) / self.max_avail
        } else {
            0.0
        }
    }

    pub fn lower_slope_coefficient(&self) -> f64 {
        if self.max_avail > 0.0 {
            (self.low_breakpoint - self.enablement_min) / self.max_avail
        } else {
            0.0
        }
    }

    fn is_well_formed(&self) -> bool {
        self.enablement_min <= self.low_breakpoint
            && self.low_breakpoint <= self.high_breakpoint
            && self.high_breakpoint <= self.enablement_max
    }
}

/// Why an FCAS offer was excluded from dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailability {
    NoMaxAvail,
    NoPositiveBand,
    EnergyBelowEnablement,
    NegativeEnablementMax,
    InitialOutsideEnablement,
    AgcDisabled,
    Degenerate,
}

impl std::fmt::Display for Unavailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Unavailability::NoMaxAvail => "scaled max availability is zero",
            Unavailability::NoPositiveBand => "no band has positive quantity",
            Unavailability::EnergyBelowEnablement => "energy availability below enablement min",
            Unavailability::NegativeEnablementMax => "enablement max is negative",
            Unavailability::InitialOutsideEnablement => "initial MW outside enablement range",
            Unavailability::AgcDisabled => "AGC disabled",
            Unavailability::Degenerate => "scaled trapezium is degenerate",
        })
    }
}

/// One FCAS offer after scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFcas {
    pub trade_type: TradeType,
    pub trapezium: Trapezium,
    pub unavailable: Option<Unavailability>,
}

impl ResolvedFcas {
    pub fn is_available(&self) -> bool {
        self.unavailable.is_none()
    }
}

/// Scale one FCAS offer of `trader`.
pub fn scale_trapezium(
    trader: &Trader,
    offer: &Offer,
    intervals_per_hour: f64,
) -> Result<Trapezium, ResolveError> {
    let geometry = offer.trapezium.as_ref().ok_or_else(|| ResolveError::Trapezium {
        trader: trader.id.to_string(),
        service: offer.trade_type.to_string(),
        message: "offer has no trapezium".into(),
    })?;
    let mut trap = Trapezium::new(geometry, offer.max_avail);
    let tt = offer.trade_type;
    let uigf = if trader.semi_dispatch { trader.uigf } else { None };

    if tt.is_regulation() {
        let initial = &trader.initial;
        trap.scale_lhs(initial.lmw);
        trap.scale_rhs(initial.hmw);
        // Raising regulation needs generators to ramp up and loads to ramp down.
        let ramp_up = (tt == TradeType::RaiseReg) != trader.trader_type.is_load();
        let rate = if ramp_up {
            initial.scada_ramp_up_rate
        } else {
            initial.scada_ramp_down_rate
        };
        trap.scale_ramp(rate, intervals_per_hour);
        trap.scale_rhs(uigf);
    } else if trader.semi_dispatch {
        trap.scale_rhs(uigf);
    }
    Ok(trap)
}

fn availability(trader: &Trader, offer: &Offer, trap: &Trapezium) -> Option<Unavailability> {
    if !(trap.max_avail > 0.0) {
        return Some(Unavailability::NoMaxAvail);
    }
    if !offer.has_positive_quantity() {
        return Some(Unavailability::NoPositiveBand);
    }
    if let Some(energy) = trader.energy_availability() {
        if energy < trap.enablement_min {
            return Some(Unavailability::EnergyBelowEnablement);
        }
    }
    if trap.enablement_max < 0.0 {
        return Some(Unavailability::NegativeEnablementMax);
    }
    let initial = trader.initial.initial_mw;
    if initial < trap.enablement_min || initial > trap.enablement_max {
        return Some(Unavailability::InitialOutsideEnablement);
    }
    if offer.trade_type.is_regulation() && !trader.initial.agc_status {
        return Some(Unavailability::AgcDisabled);
    }
    if !trap.is_well_formed() {
        return Some(Unavailability::Degenerate);
    }
    None
}

/// Scale every FCAS offer of a trader and decide which are available.
pub fn resolve_trader_fcas(
    trader: &Trader,
    intervals_per_hour: f64,
) -> Result<Vec<ResolvedFcas>, ResolveError> {
    trader
        .fcas_offers()
        .map(|offer| {
            let trapezium = scale_trapezium(trader, offer, intervals_per_hour)?;
            let unavailable = availability(trader, offer, &trapezium);
            if let Some(reason) = unavailable {
                debug!(trader = %trader.id, service = %offer.trade_type, %reason, "FCAS unavailable");
            }
            Ok(ResolvedFcas {
                trade_type: offer.trade_type,
                trapezium,
                unavailable,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nemde_core::{PriceBand, TraderInitialConditions, TraderType};

    fn geometry(emin: f64, low: f64, high: f64, emax: f64) -> FcasTrapezium {
        FcasTrapezium {
            enablement_min: emin,
            enablement_max: emax,
            low_breakpoint: low,
            high_breakpoint: high,
        }
    }

    fn fcas_offer(tt: TradeType, max_avail: f64, trap: FcasTrapezium) -> Offer {
        Offer {
            trade_type: tt,
            bands: vec![PriceBand {
                price: 1.0,
                quantity: max_avail,
            }],
            max_avail,
            trapezium: Some(trap),
            ramp_up_rate: None,
            ramp_down_rate: None,
        }
    }

    fn generator(offers: Vec<Offer>, initial: TraderInitialConditions) -> Trader {
        let mut all = vec![Offer {
            trade_type: TradeType::EnergyOffer,
            bands: vec![PriceBand {
                price: 20.0,
                quantity: 300.0,
            }],
            max_avail: 300.0,
            trapezium: None,
            ramp_up_rate: Some(600.0),
            ramp_down_rate: Some(600.0),
        }];
        all.extend(offers);
        Trader {
            id: "GEN1".into(),
            region_id: "NSW1".into(),
            trader_type: TraderType::Generator,
            semi_dispatch: false,
            uigf: None,
            fast_start: None,
            initial,
            offers: all,
        }
    }

    #[test]
    fn lhs_scaling_keeps_slope() {
        let mut trap = Trapezium::new(&geometry(100.0, 150.0, 250.0, 300.0), 50.0);
        trap.scale_lhs(Some(120.0));
        assert_eq!(trap.enablement_min, 120.0);
        assert_eq!(trap.max_avail, 50.0);
        assert!((trap.low_breakpoint - 170.0).abs() < 1e-9);
        assert!((trap.high_breakpoint - 250.0).abs() < 1e-9);
    }

    #[test]
    fn rhs_scaling_cuts_max_avail_where_sides_meet() {
        let mut trap = Trapezium::new(&geometry(0.0, 50.0, 60.0, 110.0), 50.0);
        // Slopes 1 and -1; new emax 60 meets the rising side at (30, 30).
        trap.scale_rhs(Some(60.0));
        assert!((trap.max_avail - 30.0).abs() < 1e-9);
        assert!((trap.low_breakpoint - 30.0).abs() < 1e-9);
        assert!((trap.high_breakpoint - 30.0).abs() < 1e-9);
        assert_eq!(trap.enablement_max, 60.0);
    }

    #[test]
    fn zero_or_looser_limits_are_ignored() {
        let original = Trapezium::new(&geometry(10.0, 20.0, 80.0, 90.0), 15.0);
        let mut trap = original;
        trap.scale_lhs(Some(0.0));
        trap.scale_lhs(Some(5.0));
        trap.scale_rhs(None);
        trap.scale_rhs(Some(95.0));
        trap.scale_ramp(Some(0.0), 12.0);
        assert_eq!(trap, original);
    }

    #[test]
    fn ramp_scaling_caps_at_one_interval() {
        let mut trap = Trapezium::new(&geometry(0.0, 100.0, 200.0, 300.0), 100.0);
        trap.scale_ramp(Some(120.0), 12.0);
        assert!((trap.max_avail - 10.0).abs() < 1e-9);
        assert!((trap.low_breakpoint - 10.0).abs() < 1e-9);
        assert!((trap.high_breakpoint - 290.0).abs() < 1e-9);
    }

    #[test]
    fn vertical_sides_keep_breakpoints() {
        let mut trap = Trapezium::new(&geometry(0.0, 0.0, 100.0, 100.0), 20.0);
        trap.scale_rhs(Some(80.0));
        assert_eq!(trap.max_avail, 20.0);
        assert_eq!(trap.low_breakpoint, 0.0);
        assert_eq!(trap.high_breakpoint, 80.0);
    }

    #[test]
    fn slope_coefficients_follow_trapezium() {
        let trap = Trapezium::new(&geometry(100.0, 150.0, 250.0, 300.0), 50.0);
        assert_eq!(trap.upper_slope_coefficient(), 1.0);
        assert_eq!(trap.lower_slope_coefficient(), 1.0);
        let flat = Trapezium::new(&geometry(100.0, 150.0, 250.0, 300.0), 0.0);
        assert_eq!(flat.upper_slope_coefficient(), 0.0);
    }

    #[test]
    fn regulation_needs_agc() {
        let offer = fcas_offer(TradeType::RaiseReg, 20.0, geometry(50.0, 70.0, 200.0, 250.0));
        let mut initial = TraderInitialConditions {
            initial_mw: 100.0,
            ..Default::default()
        };
        let trader = generator(vec![offer.clone()], initial);
        let resolved = resolve_trader_fcas(&trader, 12.0).unwrap();
        assert_eq!(resolved[0].unavailable, Some(Unavailability::AgcDisabled));

        initial.agc_status = true;
        let trader = generator(vec![offer], initial);
        let resolved = resolve_trader_fcas(&trader, 12.0).unwrap();
        assert!(resolved[0].is_available());
    }

    #[test]
    fn regulation_uses_role_ramp_direction() {
        let offer = fcas_offer(TradeType::LowerReg, 50.0, geometry(0.0, 50.0, 250.0, 300.0));
        let initial = TraderInitialConditions {
            initial_mw: 100.0,
            agc_status: true,
            scada_ramp_up_rate: Some(600.0),
            scada_ramp_down_rate: Some(240.0),
            ..Default::default()
        };
        let trader = generator(vec![offer], initial);
        let trap = scale_trapezium(&trader, &trader.offers[1], 12.0).unwrap();
        assert!((trap.max_avail - 20.0).abs() < 1e-9);

        let mut load = trader.clone();
        load.trader_type = TraderType::Load;
        let trap = scale_trapezium(&load, &load.offers[1], 12.0).unwrap();
        assert!((trap.max_avail - 50.0).abs() < 1e-9);
    }

    #[test]
    fn initial_outside_enablement_is_unavailable() {
        let offer = fcas_offer(TradeType::Raise6Sec, 20.0, geometry(50.0, 70.0, 200.0, 250.0));
        let trader = generator(
            vec![offer],
            TraderInitialConditions {
                initial_mw: 10.0,
                ..Default::default()
            },
        );
        let resolved = resolve_trader_fcas(&trader, 12.0).unwrap();
        assert_eq!(
            resolved[0].unavailable,
            Some(Unavailability::InitialOutsideEnablement)
        );
    }

    #[test]
    fn crossed_breakpoints_are_degenerate() {
        // low breakpoint above the high breakpoint
        let offer = fcas_offer(TradeType::Raise60Sec, 20.0, geometry(50.0, 220.0, 120.0, 250.0));
        let trader = generator(
            vec![offer],
            TraderInitialConditions {
                initial_mw: 100.0,
                ..Default::default()
            },
        );
        let resolved = resolve_trader_fcas(&trader, 12.0).unwrap();
        assert_eq!(resolved[0].unavailable, Some(Unavailability::Degenerate));
        assert!(!resolved[0].is_available());
    }

    #[test]
    fn missing_trapezium_is_an_error() {
        let mut offer = fcas_offer(TradeType::Lower60Sec, 20.0, geometry(0.0, 0.0, 1.0, 1.0));
        offer.trapezium = None;
        let trader = generator(vec![offer], TraderInitialConditions::default());
        assert!(resolve_trader_fcas(&trader, 12.0).is_err());
    }
}

//! Small hand-built casefiles shared by unit and integration tests.

use nemde_core::{
    Case, Casefile, ConstraintType, FastStartMode, FastStartProfile, FcasTrapezium,
    GenericConstraint, Interconnector, InterconnectorFactor, LhsTerms, LossModel, LossSegment,
    Mnsp, MnspOffer, Offer, PenaltyPrices, PriceBand, Region, RegionFactor, RhsSource,
    TradeType, Trader, TraderFactor, TraderInitialConditions, TraderType,
};

pub fn case(case_id: &str) -> Case {
    Case {
        case_id: case_id.to_string(),
        interval_start: None,
        voll: 15_000.0,
        market_price_floor: -1_000.0,
        intervention: false,
        use_convex_loss_model: false,
        tie_break_price: None,
        penalties: PenaltyPrices::default(),
    }
}

pub fn region(id: &str, initial_demand: f64) -> Region {
    Region {
        id: id.into(),
        initial_demand,
        ade: 0.0,
        demand_forecast: 0.0,
    }
}

pub fn bands(pairs: &[(f64, f64)]) -> Vec<PriceBand> {
    pairs
        .iter()
        .map(|&(price, quantity)| PriceBand { price, quantity })
        .collect()
}

pub fn energy_offer(trade_type: TradeType, pairs: &[(f64, f64)], max_avail: f64) -> Offer {
    Offer {
        trade_type,
        bands: bands(pairs),
        max_avail,
        trapezium: None,
        ramp_up_rate: None,
        ramp_down_rate: None,
    }
}

/// FCAS offer with trapezium `[enablement_min, low, high, enablement_max]`.
pub fn fcas_offer(
    trade_type: TradeType,
    pairs: &[(f64, f64)],
    max_avail: f64,
    trapezium: [f64; 4],
) -> Offer {
    Offer {
        trade_type,
        bands: bands(pairs),
        max_avail,
        trapezium: Some(FcasTrapezium {
            enablement_min: trapezium[0],
            low_breakpoint: trapezium[1],
            high_breakpoint: trapezium[2],
            enablement_max: trapezium[3],
        }),
        ramp_up_rate: None,
        ramp_down_rate: None,
    }
}

pub fn trader(
    id: &str,
    region_id: &str,
    trader_type: TraderType,
    initial_mw: f64,
    offers: Vec<Offer>,
) -> Trader {
    Trader {
        id: id.into(),
        region_id: region_id.into(),
        trader_type,
        semi_dispatch: false,
        uigf: None,
        fast_start: None,
        initial: TraderInitialConditions {
            initial_mw,
            ..TraderInitialConditions::default()
        },
        offers,
    }
}

pub fn generator(id: &str, region_id: &str, initial_mw: f64, offers: Vec<Offer>) -> Trader {
    trader(id, region_id, TraderType::Generator, initial_mw, offers)
}

pub fn casefile(case: Case, regions: Vec<Region>, traders: Vec<Trader>) -> Casefile {
    Casefile {
        case,
        regions,
        traders,
        interconnectors: Vec::new(),
        constraints: Vec::new(),
        equations: Vec::new(),
        historical: None,
    }
}

pub fn literal_constraint(
    id: &str,
    constraint_type: ConstraintType,
    rhs: f64,
    lhs: LhsTerms,
) -> GenericConstraint {
    GenericConstraint {
        id: id.into(),
        version: None,
        constraint_type,
        rhs: RhsSource::Literal { value: rhs },
        violation_price: 1_000_000.0,
        lhs,
        intervention: false,
    }
}

/// One region, one generator offering 100 MW at $50, 80 MW of demand.
pub fn single_region() -> Casefile {
    casefile(
        case("SINGLE"),
        vec![region("NSW1", 80.0)],
        vec![generator(
            "G1",
            "NSW1",
            80.0,
            vec![energy_offer(TradeType::EnergyOffer, &[(50.0, 100.0)], 100.0)],
        )],
    )
}

/// Two regions joined by a convex two-segment link, a raise 6 second
/// offer from each region and a shared raise 6 second requirement.
pub fn two_region_with_fcas() -> Casefile {
    let mut cf = casefile(
        case("TWO_REGION"),
        vec![region("NSW1", 200.0), region("VIC1", 100.0)],
        vec![
            generator(
                "G1",
                "NSW1",
                150.0,
                vec![
                    energy_offer(TradeType::EnergyOffer, &[(20.0, 150.0), (60.0, 100.0)], 250.0),
                    fcas_offer(TradeType::Raise6Sec, &[(5.0, 30.0)], 30.0, [0.0, 20.0, 220.0, 250.0]),
                ],
            ),
            generator(
                "G2",
                "VIC1",
                150.0,
                vec![
                    energy_offer(TradeType::EnergyOffer, &[(40.0, 200.0)], 200.0),
                    fcas_offer(TradeType::Raise6Sec, &[(8.0, 20.0)], 20.0, [0.0, 10.0, 190.0, 200.0]),
                ],
            ),
        ],
    );
    cf.interconnectors.push(Interconnector {
        id: "N-V".into(),
        from_region: "NSW1".into(),
        to_region: "VIC1".into(),
        upper_limit: 100.0,
        lower_limit: 100.0,
        initial_mw: 0.0,
        loss_model: LossModel {
            loss_share: 0.5,
            loss_lower_limit: 100.0,
            segments: vec![
                LossSegment {
                    limit: 0.0,
                    factor: -0.02,
                },
                LossSegment {
                    limit: 100.0,
                    factor: 0.02,
                },
            ],
        },
        mnsp: None,
    });
    cf.constraints.push(literal_constraint(
        "MAIN_R6",
        ConstraintType::Ge,
        25.0,
        LhsTerms {
            regions: vec![
                RegionFactor {
                    region_id: "NSW1".into(),
                    trade_type: TradeType::Raise6Sec,
                    factor: 1.0,
                },
                RegionFactor {
                    region_id: "VIC1".into(),
                    trade_type: TradeType::Raise6Sec,
                    factor: 1.0,
                },
            ],
            ..LhsTerms::default()
        },
    ));
    cf
}

/// Two generators in one region offering at the same price.
pub fn tied_generators() -> Casefile {
    casefile(
        case("TIED"),
        vec![region("NSW1", 100.0)],
        vec![
            generator(
                "G1",
                "NSW1",
                50.0,
                vec![energy_offer(TradeType::EnergyOffer, &[(30.0, 100.0)], 100.0)],
            ),
            generator(
                "G2",
                "NSW1",
                50.0,
                vec![energy_offer(TradeType::EnergyOffer, &[(30.0, 100.0)], 100.0)],
            ),
        ],
    )
}

/// A $30 generator and a scheduled load bidding 50 MW at $300.
pub fn generator_and_load() -> Casefile {
    casefile(
        case("LOAD"),
        vec![region("NSW1", 100.0)],
        vec![
            generator(
                "G1",
                "NSW1",
                100.0,
                vec![energy_offer(TradeType::EnergyOffer, &[(30.0, 200.0)], 200.0)],
            ),
            trader(
                "L1",
                "NSW1",
                TraderType::Load,
                0.0,
                vec![energy_offer(TradeType::LoadOffer, &[(300.0, 50.0)], 50.0)],
            ),
        ],
    )
}

/// A cheap uncommitted fast-start unit next to an expensive baseload unit.
pub fn fast_start_unit() -> Casefile {
    let mut fast = generator(
        "FS1",
        "NSW1",
        0.0,
        vec![energy_offer(TradeType::EnergyOffer, &[(10.0, 50.0)], 50.0)],
    );
    fast.fast_start = Some(FastStartProfile {
        t1: 0.0,
        t2: 5.0,
        t3: 10.0,
        t4: 20.0,
        min_loading_mw: 30.0,
        current_mode: FastStartMode::Uncommitted,
        current_mode_time: 0.0,
    });
    casefile(
        case("FAST_START"),
        vec![region("NSW1", 100.0)],
        vec![
            generator(
                "G1",
                "NSW1",
                100.0,
                vec![energy_offer(TradeType::EnergyOffer, &[(100.0, 200.0)], 200.0)],
            ),
            fast,
        ],
    )
}

/// A direction forcing the $50 unit to at least 60 MW ahead of a $20 unit
/// limited to 100 MW.
pub fn intervention() -> Casefile {
    let mut cf = casefile(
        case("INTERVENTION"),
        vec![region("NSW1", 100.0)],
        vec![
            generator(
                "G1",
                "NSW1",
                50.0,
                vec![energy_offer(TradeType::EnergyOffer, &[(20.0, 100.0)], 100.0)],
            ),
            generator(
                "G2",
                "NSW1",
                50.0,
                vec![energy_offer(TradeType::EnergyOffer, &[(50.0, 200.0)], 200.0)],
            ),
        ],
    );
    cf.case.intervention = true;
    let mut direction = literal_constraint(
        "DIRECT_G2",
        ConstraintType::Ge,
        60.0,
        LhsTerms {
            traders: vec![TraderFactor {
                trader_id: "G2".into(),
                trade_type: TradeType::EnergyOffer,
                factor: 1.0,
            }],
            ..LhsTerms::default()
        },
    );
    direction.intervention = true;
    cf.constraints.push(direction);
    cf
}

/// Two regions joined by a market network service with priced offers at
/// both ends and a flow limit in a generic constraint.
pub fn mnsp_link() -> Casefile {
    let mut cf = casefile(
        case("MNSP"),
        vec![region("TAS1", 50.0), region("VIC1", 150.0)],
        vec![
            generator(
                "HYDRO1",
                "TAS1",
                100.0,
                vec![energy_offer(TradeType::EnergyOffer, &[(10.0, 300.0)], 300.0)],
            ),
            generator(
                "COAL1",
                "VIC1",
                100.0,
                vec![energy_offer(TradeType::EnergyOffer, &[(80.0, 300.0)], 300.0)],
            ),
        ],
    );
    let offer = |region: &str, price: f64| MnspOffer {
        region_id: region.into(),
        bands: bands(&[(price, 200.0)]),
        max_avail: 200.0,
        ramp_up_rate: None,
        ramp_down_rate: None,
    };
    cf.interconnectors.push(Interconnector {
        id: "T-V-MNSP1".into(),
        from_region: "TAS1".into(),
        to_region: "VIC1".into(),
        upper_limit: 478.0,
        lower_limit: 478.0,
        initial_mw: 50.0,
        loss_model: LossModel {
            loss_share: 1.0,
            loss_lower_limit: 478.0,
            segments: vec![
                LossSegment {
                    limit: 0.0,
                    factor: -0.01,
                },
                LossSegment {
                    limit: 478.0,
                    factor: 0.01,
                },
            ],
        },
        mnsp: Some(Mnsp {
            from_region_offer: offer("TAS1", 1.0),
            to_region_offer: offer("VIC1", 1.0),
        }),
    });
    cf.constraints.push(literal_constraint(
        "T_V_LIMIT",
        ConstraintType::Le,
        80.0,
        LhsTerms {
            interconnectors: vec![InterconnectorFactor {
                interconnector_id: "T-V-MNSP1".into(),
                factor: 1.0,
            }],
            ..LhsTerms::default()
        },
    ));
    cf
}

//! Casefile ingestion from disk: parsing, patching and validation.

use std::fs;
use std::path::PathBuf;

use nemde_core::{
    Casefile, CasefilePatch, ConstraintType, DispatchSolution, NemdeError, RegionSolution,
    RhsSource, TradeType,
};
use serde_json::{json, Value};
use tempfile::TempDir;

fn two_region_json() -> Value {
    json!({
        "case": {
            "case_id": "20201101001",
            "voll": 15000.0,
            "market_price_floor": -1000.0,
            "penalties": {}
        },
        "regions": [
            {"id": "NSW1", "initial_demand": 200.0, "ade": 1.5},
            {"id": "VIC1", "initial_demand": 100.0}
        ],
        "traders": [
            {
                "id": "G1", "region_id": "NSW1", "trader_type": "generator",
                "initial": {"initial_mw": 150.0},
                "offers": [
                    {"trade_type": "ENOF", "max_avail": 250.0,
                     "bands": [{"price": 20.0, "quantity": 150.0},
                               {"price": 60.0, "quantity": 100.0}]},
                    {"trade_type": "R6SE", "max_avail": 30.0,
                     "bands": [{"price": 5.0, "quantity": 30.0}],
                     "trapezium": {"enablement_min": 0.0, "low_breakpoint": 20.0,
                                   "high_breakpoint": 220.0, "enablement_max": 250.0}}
                ]
            },
            {
                "id": "G2", "region_id": "VIC1", "trader_type": "generator",
                "initial": {"initial_mw": 150.0},
                "offers": [
                    {"trade_type": "ENOF", "max_avail": 200.0,
                     "bands": [{"price": 40.0, "quantity": 200.0}]}
                ]
            }
        ],
        "interconnectors": [{
            "id": "N-V", "from_region": "NSW1", "to_region": "VIC1",
            "upper_limit": 100.0, "lower_limit": 100.0,
            "loss_model": {
                "loss_share": 0.5, "loss_lower_limit": 100.0,
                "segments": [{"limit": 0.0, "factor": -0.02}, {"limit": 100.0, "factor": 0.02}]
            }
        }],
        "constraints": [{
            "id": "N_V_LIMIT",
            "constraint_type": "LE",
            "rhs": {"kind": "equation", "equation_id": "EQ1", "default": 80.0},
            "violation_price": 360000.0,
            "lhs": {"interconnectors": [{"interconnector_id": "N-V", "factor": 1.0}]}
        }],
        "equations": [{
            "id": "EQ1",
            "terms": [
                {"operand": {"kind": "constant", "value": 60.0}},
                {"operand": {"kind": "telemetry", "tag": "N-V.RATING", "default": 30.0}}
            ]
        }]
    })
}

fn write_case(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

#[test]
fn casefile_loads_from_disk_and_validates() {
    let dir = TempDir::new().unwrap();
    let path = write_case(&dir, "20201101001.json", &two_region_json());

    let casefile = Casefile::from_path(&path).unwrap();
    let report = casefile.validate().unwrap();

    assert_eq!(casefile.case_id(), "20201101001");
    assert_eq!(report.stats.regions, 2);
    assert_eq!(report.stats.traders, 2);
    assert_eq!(report.stats.offers, 3);
    assert_eq!(report.stats.interconnectors, 1);
    assert_eq!(report.stats.mnsps, 0);
    assert_eq!(report.stats.constraints, 1);
    assert_eq!(report.stats.equations, 1);
    assert!(!report.diagnostics.has_errors());

    assert_eq!(casefile.region("NSW1").unwrap().ade, 1.5);
    assert_eq!(casefile.region("VIC1").unwrap().demand_forecast, 0.0);
    let g1 = casefile.trader("G1").unwrap();
    assert!(g1.offers.iter().any(|o| o.trade_type == TradeType::Raise6Sec));
    let limit = casefile.constraint("N_V_LIMIT").unwrap();
    assert_eq!(limit.constraint_type, ConstraintType::Le);
    assert!(matches!(limit.rhs, RhsSource::Equation { .. }));
    assert_eq!(casefile.equation("EQ1").unwrap().terms.len(), 2);
    assert!(casefile.historical.is_none());
}

#[test]
fn patches_apply_before_typed_parsing() {
    let dir = TempDir::new().unwrap();
    let path = write_case(&dir, "case.json", &two_region_json());
    let patches = [
        CasefilePatch::new("/regions/1/initial_demand", 180.0),
        CasefilePatch::new("/traders/0/offers/0/max_avail", 120.0),
        CasefilePatch::new("/regions/1/demand_forecast", 12.0),
    ];

    let casefile = Casefile::from_path_with_patches(&path, &patches).unwrap();
    assert_eq!(casefile.region("VIC1").unwrap().initial_demand, 180.0);
    assert_eq!(casefile.region("VIC1").unwrap().demand_forecast, 12.0);
    assert_eq!(casefile.trader("G1").unwrap().offers[0].max_avail, 120.0);
}

#[test]
fn unresolvable_patch_path_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_case(&dir, "case.json", &two_region_json());
    let patches = [CasefilePatch::new("/regions/7/initial_demand", 1.0)];

    let err = Casefile::from_path_with_patches(&path, &patches).unwrap_err();
    assert!(matches!(err, NemdeError::Parse(_)));
    assert!(err.is_input_defect());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = Casefile::from_path(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, NemdeError::Io(_)));
    assert!(!err.is_input_defect());
}

#[test]
fn missing_equation_is_a_warning_not_a_failure() {
    let mut value = two_region_json();
    value["equations"] = json!([]);
    let casefile = Casefile::from_value(value).unwrap();
    let report = casefile.validate().unwrap();
    assert!(report.diagnostics.warning_count() >= 1);
    assert!(!report.diagnostics.has_errors());
}

#[test]
fn unknown_interconnector_in_constraint_is_rejected() {
    let mut value = two_region_json();
    value["constraints"][0]["lhs"]["interconnectors"][0]["interconnector_id"] = json!("T-V");
    let err = Casefile::from_value(value).unwrap().validate().unwrap_err();
    assert!(
        matches!(err, NemdeError::Input { ref field, .. } if field == "lhs.interconnectors"),
        "{err}"
    );
}

#[test]
fn interconnector_between_one_region_is_rejected() {
    let mut value = two_region_json();
    value["interconnectors"][0]["to_region"] = json!("NSW1");
    let err = Casefile::from_value(value).unwrap().validate().unwrap_err();
    assert!(err.to_string().contains("Interconnector N-V"));
}

#[test]
fn flow_limits_beyond_the_loss_curve_are_warned() {
    let value = two_region_json();
    let report = Casefile::from_value(value.clone()).unwrap().validate().unwrap();
    assert_eq!(report.diagnostics.issues_by_category("loss_model").count(), 0);

    let mut value = value;
    value["interconnectors"][0]["upper_limit"] = json!(150.0);
    value["interconnectors"][0]["lower_limit"] = json!(120.0);
    let report = Casefile::from_value(value).unwrap().validate().unwrap();
    let warnings: Vec<_> = report.diagnostics.issues_by_category("loss_model").collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].message.contains("upper_limit 150"));
    assert!(warnings[1].message.contains("lower_limit 120"));
    assert_eq!(warnings[0].entity.as_deref(), Some("Interconnector N-V"));
    assert!(!report.diagnostics.has_errors());
}

#[test]
fn historical_solution_rides_along_with_the_inputs() {
    let historical = DispatchSolution {
        region_solution: vec![RegionSolution {
            region_id: "NSW1".into(),
            energy_price: 41.2,
            ..RegionSolution::default()
        }],
        ..DispatchSolution::default()
    };
    let mut value = two_region_json();
    value["historical"] = serde_json::to_value(&historical).unwrap();
    assert!(value["historical"]["RegionSolution"][0]["RegionID"].is_string());

    let casefile = Casefile::from_value(value).unwrap();
    let parsed = casefile.historical.as_ref().unwrap();
    assert_eq!(parsed.region("NSW1").unwrap().energy_price, 41.2);
    assert!(parsed.region("VIC1").is_none());
}

//! Field-by-field comparison of a computed solution against the historical
//! record.
//!
//! A field passes when `|computed - expected| <= absolute + relative·|expected|`
//! using the tolerance of its [`FieldClass`]. Entities in the historical
//! record that the computed solution lacks fail as `missing`. Comparison
//! walks the historical record in order, so the same inputs always produce
//! the same report.

use nemde_core::DispatchSolution;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub absolute: f64,
    #[serde(default)]
    pub relative: f64,
}

impl Tolerance {
    pub const fn new(absolute: f64, relative: f64) -> Self {
        Self { absolute, relative }
    }

    pub fn accepts(&self, computed: f64, expected: f64) -> bool {
        (computed - expected).abs() <= self.absolute + self.relative * expected.abs()
    }
}

/// Tolerance per field class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationTolerances {
    pub price: Tolerance,
    pub dispatch: Tolerance,
    pub flow: Tolerance,
    pub violation: Tolerance,
    pub marginal_value: Tolerance,
    pub objective: Tolerance,
}

impl Default for ValidationTolerances {
    fn default() -> Self {
        Self {
            price: Tolerance::new(0.05, 1e-4),
            dispatch: Tolerance::new(0.01, 0.0),
            flow: Tolerance::new(0.01, 0.0),
            violation: Tolerance::new(0.001, 0.0),
            marginal_value: Tolerance::new(0.05, 1e-4),
            objective: Tolerance::new(1.0, 1e-6),
        }
    }
}

impl ValidationTolerances {
    pub fn for_class(&self, class: FieldClass) -> Tolerance {
        match class {
            FieldClass::Price => self.price,
            FieldClass::Dispatch => self.dispatch,
            FieldClass::Flow => self.flow,
            FieldClass::Violation => self.violation,
            FieldClass::MarginalValue => self.marginal_value,
            FieldClass::Objective => self.objective,
            FieldClass::Mode => Tolerance::new(0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    Price,
    Dispatch,
    Flow,
    Violation,
    MarginalValue,
    Objective,
    /// Exact match (fast-start modes).
    Mode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResult {
    /// `RegionSolution NSW1`, `TraderSolution BW01`, ...
    pub entity: String,
    pub field: String,
    pub class: FieldClass,
    pub expected: f64,
    /// `None` when the entity is missing from the computed solution.
    pub computed: Option<f64>,
    pub passed: bool,
}

impl FieldResult {
    pub fn difference(&self) -> Option<f64> {
        self.computed.map(|c| c - self.expected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub case_id: String,
    pub passed: bool,
    pub fields: Vec<FieldResult>,
    /// Historical entities with no computed counterpart.
    pub missing: Vec<String>,
}

impl ValidationReport {
    pub fn failures(&self) -> impl Iterator<Item = &FieldResult> {
        self.fields.iter().filter(|f| !f.passed)
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Largest absolute difference among compared fields of `class`.
    pub fn max_difference(&self, class: FieldClass) -> f64 {
        self.fields
            .iter()
            .filter(|f| f.class == class)
            .filter_map(|f| f.difference())
            .fold(0.0, |acc, d| acc.max(d.abs()))
    }
}

struct Comparer<'t> {
    tolerances: &'t ValidationTolerances,
    fields: Vec<FieldResult>,
    missing: Vec<String>,
}

impl Comparer<'_> {
    fn field(&mut self, entity: &str, field: &str, class: FieldClass, computed: f64, expected: f64) {
        let passed = self.tolerances.for_class(class).accepts(computed, expected);
        self.fields.push(FieldResult {
            entity: entity.to_string(),
            field: field.to_string(),
            class,
            expected,
            computed: Some(computed),
            passed,
        });
    }

    /// A field the computed entity does not carry.
    fn absent(&mut self, entity: &str, field: &str, class: FieldClass, expected: f64) {
        self.fields.push(FieldResult {
            entity: entity.to_string(),
            field: field.to_string(),
            class,
            expected,
            computed: None,
            passed: false,
        });
    }

    fn missing(&mut self, entity: String, fields: &[(&str, FieldClass, f64)]) {
        for &(field, class, expected) in fields {
            self.absent(&entity, field, class, expected);
        }
        self.missing.push(entity);
    }
}

pub fn validate_solution(
    computed: &DispatchSolution,
    expected: &DispatchSolution,
    tolerances: &ValidationTolerances,
) -> ValidationReport {
    use FieldClass::*;

    let mut cmp = Comparer {
        tolerances,
        fields: Vec::new(),
        missing: Vec::new(),
    };

    let period = &computed.period_solution;
    let hist = &expected.period_solution;
    cmp.field(
        "PeriodSolution",
        "TotalObjective",
        Objective,
        period.total_objective,
        hist.total_objective,
    );
    for ((name, value), (_, expected_value)) in period
        .violation_totals()
        .into_iter()
        .zip(hist.violation_totals())
    {
        cmp.field("PeriodSolution", name, Violation, value, expected_value);
    }

    for hist in &expected.region_solution {
        let entity = format!("RegionSolution {}", hist.region_id);
        let Some(region) = computed.region(hist.region_id.as_str()) else {
            cmp.missing(entity, &[("EnergyPrice", Price, hist.energy_price)]);
            continue;
        };
        cmp.field(&entity, "EnergyPrice", Price, region.energy_price, hist.energy_price);
        for (field, value, expected_value) in [
            ("DispatchedGeneration", region.dispatched_generation, hist.dispatched_generation),
            ("DispatchedLoad", region.dispatched_load, hist.dispatched_load),
            ("FixedDemand", region.fixed_demand, hist.fixed_demand),
            ("ClearedDemand", region.cleared_demand, hist.cleared_demand),
            ("AvailableGeneration", region.available_generation, hist.available_generation),
            ("AvailableLoad", region.available_load, hist.available_load),
            ("SurplusGeneration", region.surplus_generation, hist.surplus_generation),
        ] {
            cmp.field(&entity, field, Dispatch, value, expected_value);
        }
        cmp.field(&entity, "NetExport", Flow, region.net_export, hist.net_export);
        for (tt, hist_fcas) in &hist.fcas {
            let fcas = region.fcas.get(tt).copied().unwrap_or_default();
            let prefix = tt.solution_prefix();
            cmp.field(&entity, &format!("{prefix}Dispatch"), Dispatch, fcas.dispatch, hist_fcas.dispatch);
            cmp.field(&entity, &format!("{prefix}Price"), Price, fcas.price, hist_fcas.price);
        }
    }

    for hist in &expected.interconnector_solution {
        let entity = format!("InterconnectorSolution {}", hist.interconnector_id);
        let Some(ic) = computed.interconnector(hist.interconnector_id.as_str()) else {
            cmp.missing(entity, &[("Flow", Flow, hist.flow)]);
            continue;
        };
        cmp.field(&entity, "Flow", Flow, ic.flow, hist.flow);
        cmp.field(&entity, "Losses", Flow, ic.losses, hist.losses);
        cmp.field(&entity, "Deficit", Violation, ic.deficit, hist.deficit);
        cmp.field(&entity, "Price", MarginalValue, ic.price, hist.price);
    }

    for hist in &expected.trader_solution {
        let entity = format!("TraderSolution {}", hist.trader_id);
        let Some(trader) = computed.trader(hist.trader_id.as_str()) else {
            cmp.missing(entity, &[("EnergyTarget", Dispatch, hist.energy_target)]);
            continue;
        };
        cmp.field(&entity, "EnergyTarget", Dispatch, trader.energy_target, hist.energy_target);
        for (tt, outcome) in &hist.fcas {
            let computed_outcome = trader.fcas.get(tt).copied().unwrap_or_default();
            let prefix = tt.solution_prefix();
            cmp.field(&entity, &format!("{prefix}Target"), Dispatch, computed_outcome.target, outcome.target);
            cmp.field(
                &entity,
                &format!("{prefix}Violation"),
                Violation,
                computed_outcome.violation,
                outcome.violation,
            );
        }
        if let Some(mode) = hist.fs_target_mode {
            match trader.fs_target_mode {
                Some(computed_mode) => cmp.field(
                    &entity,
                    "FSTargetMode",
                    Mode,
                    f64::from(computed_mode),
                    f64::from(mode),
                ),
                None => cmp.absent(&entity, "FSTargetMode", Mode, f64::from(mode)),
            }
        }
        cmp.field(&entity, "RampDeficit", Violation, trader.ramp_deficit, hist.ramp_deficit);
        cmp.field(&entity, "UIGFViolation", Violation, trader.uigf_violation, hist.uigf_violation);
    }

    for hist in &expected.constraint_solution {
        let entity = format!("ConstraintSolution {}", hist.constraint_id);
        let Some(constraint) = computed.constraint(hist.constraint_id.as_str()) else {
            cmp.missing(entity, &[("MarginalValue", MarginalValue, hist.marginal_value)]);
            continue;
        };
        cmp.field(&entity, "RHS", Dispatch, constraint.rhs, hist.rhs);
        cmp.field(&entity, "MarginalValue", MarginalValue, constraint.marginal_value, hist.marginal_value);
        cmp.field(&entity, "Deficit", Violation, constraint.deficit, hist.deficit);
    }

    let passed = cmp.fields.iter().all(|f| f.passed) && cmp.missing.is_empty();
    ValidationReport {
        case_id: expected.case_solution.case_id.clone(),
        passed,
        fields: cmp.fields,
        missing: cmp.missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nemde_core::{RegionSolution, TraderSolution};

    fn solution(price: f64, target: f64) -> DispatchSolution {
        let mut s = DispatchSolution::default();
        s.case_solution.case_id = "CASE".to_string();
        s.region_solution.push(RegionSolution {
            region_id: "NSW1".into(),
            energy_price: price,
            ..Default::default()
        });
        s.trader_solution.push(TraderSolution {
            trader_id: "G1".into(),
            energy_target: target,
            ..Default::default()
        });
        s
    }

    #[test]
    fn tolerance_combines_absolute_and_relative() {
        let tol = Tolerance::new(0.05, 1e-4);
        assert!(tol.accepts(15_001.0, 15_000.0));
        assert!(!tol.accepts(15_003.0, 15_000.0));
        assert!(tol.accepts(0.04, 0.0));
        assert!(!tol.accepts(0.06, 0.0));
    }

    #[test]
    fn identical_solutions_pass() {
        let s = solution(50.0, 80.0);
        let report = validate_solution(&s, &s, &ValidationTolerances::default());
        assert!(report.passed);
        assert_eq!(report.failure_count(), 0);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn dispatch_outside_tolerance_fails_that_field_only() {
        let expected = solution(50.0, 80.0);
        let computed = solution(50.01, 80.5);
        let report = validate_solution(&computed, &expected, &ValidationTolerances::default());
        assert!(!report.passed);
        let failures: Vec<_> = report.failures().map(|f| f.field.as_str()).collect();
        assert_eq!(failures, vec!["EnergyTarget"]);
        assert!((report.max_difference(FieldClass::Dispatch) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_entity_is_reported() {
        let expected = solution(50.0, 80.0);
        let mut computed = expected.clone();
        computed.trader_solution.clear();
        let report = validate_solution(&computed, &expected, &ValidationTolerances::default());
        assert!(!report.passed);
        assert_eq!(report.missing, vec!["TraderSolution G1".to_string()]);
    }

    #[test]
    fn absent_fast_start_mode_is_a_missing_field() {
        let mut expected = solution(50.0, 80.0);
        expected.trader_solution[0].fs_target_mode = Some(3);
        let computed = solution(50.0, 80.0);
        let tol = ValidationTolerances::default();
        let report = validate_solution(&computed, &expected, &tol);
        assert!(!report.passed);
        let mode = report
            .fields
            .iter()
            .find(|f| f.field == "FSTargetMode")
            .unwrap();
        assert_eq!(mode.computed, None);
        assert!(!mode.passed);
        assert!(report.missing.is_empty());
        assert_eq!(report, validate_solution(&computed, &expected, &tol));
    }

    #[test]
    fn validating_twice_gives_the_same_report() {
        let expected = solution(50.0, 80.0);
        let computed = solution(49.0, 80.0);
        let tol = ValidationTolerances::default();
        assert_eq!(
            validate_solution(&computed, &expected, &tol),
            validate_solution(&computed, &expected, &tol)
        );
    }
}

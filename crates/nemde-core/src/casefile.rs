//! Casefile loading and one-time ingestion validation.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    apply_patches, Case, CasefilePatch, Diagnostics, DispatchSolution, GenericConstraint,
    GenericEquation, IngestReport, IngestStats, Interconnector, NemdeError, NemdeResult, Operand,
    PriceBand, Region, RhsSource, Trader, MAX_BANDS,
};

/// All inputs for one dispatch interval, plus the historical solution when
/// the casefile carries one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Casefile {
    pub case: Case,
    pub regions: Vec<Region>,
    pub traders: Vec<Trader>,
    #[serde(default)]
    pub interconnectors: Vec<Interconnector>,
    #[serde(default)]
    pub constraints: Vec<GenericConstraint>,
    #[serde(default)]
    pub equations: Vec<GenericEquation>,
    #[serde(default)]
    pub historical: Option<DispatchSolution>,
}

impl Casefile {
    pub fn from_json_str(json: &str) -> NemdeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> NemdeResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_path(path: &Path) -> NemdeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
            .map_err(|e| NemdeError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Load a casefile and apply scenario patches to the raw value first.
    pub fn from_path_with_patches(path: &Path, patches: &[CasefilePatch]) -> NemdeResult<Self> {
        if patches.is_empty() {
            return Self::from_path(path);
        }
        let text = std::fs::read_to_string(path)?;
        let mut value: Value = serde_json::from_str(&text)?;
        apply_patches(&mut value, patches)?;
        Self::from_value(value)
    }

    pub fn case_id(&self) -> &str {
        &self.case.case_id
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id.as_str() == id)
    }

    pub fn trader(&self, id: &str) -> Option<&Trader> {
        self.traders.iter().find(|t| t.id.as_str() == id)
    }

    pub fn interconnector(&self, id: &str) -> Option<&Interconnector> {
        self.interconnectors.iter().find(|i| i.id.as_str() == id)
    }

    pub fn constraint(&self, id: &str) -> Option<&GenericConstraint> {
        self.constraints.iter().find(|c| c.id.as_str() == id)
    }

    pub fn equation(&self, id: &str) -> Option<&GenericEquation> {
        self.equations.iter().find(|e| e.id.as_str() == id)
    }

    /// Check shapes and cross references once, at the boundary.
    ///
    /// Hard defects return [`NemdeError::Input`] naming the entity and field;
    /// anything the model can work around is collected as a warning.
    pub fn validate(&self) -> NemdeResult<IngestReport> {
        let mut diag = Diagnostics::new();

        finite("Case", "voll", self.case.voll)?;
        finite("Case", "market_price_floor", self.case.market_price_floor)?;
        for (name, price) in self.case.penalties.named() {
            finite("Case", name, price)?;
        }
        if self.regions.is_empty() {
            return Err(NemdeError::input("Case", "regions", "must not be empty"));
        }

        let regions = unique_ids("Region", self.regions.iter().map(|r| r.id.as_str()))?;
        for region in &self.regions {
            let entity = format!("Region {}", region.id);
            finite(&entity, "initial_demand", region.initial_demand)?;
            finite(&entity, "ade", region.ade)?;
            finite(&entity, "demand_forecast", region.demand_forecast)?;
        }

        unique_ids("Trader", self.traders.iter().map(|t| t.id.as_str()))?;
        let mut offers = 0;
        for trader in &self.traders {
            self.validate_trader(trader, &regions, &mut diag)?;
            offers += trader.offers.len();
        }

        unique_ids(
            "Interconnector",
            self.interconnectors.iter().map(|i| i.id.as_str()),
        )?;
        for ic in &self.interconnectors {
            validate_interconnector(ic, &regions, &mut diag)?;
        }

        let equations = unique_ids("Equation", self.equations.iter().map(|e| e.id.as_str()))?;
        unique_ids(
            "Constraint",
            self.constraints.iter().map(|c| c.id.as_str()),
        )?;
        for constraint in &self.constraints {
            self.validate_constraint(constraint, &regions, &equations, &mut diag)?;
        }
        for equation in &self.equations {
            self.validate_equation(equation, &equations, &mut diag)?;
        }

        let stats = IngestStats {
            regions: self.regions.len(),
            traders: self.traders.len(),
            offers,
            interconnectors: self.interconnectors.len(),
            mnsps: self.interconnectors.iter().filter(|i| i.is_mnsp()).count(),
            constraints: self.constraints.len(),
            equations: self.equations.len(),
        };
        Ok(IngestReport {
            stats,
            diagnostics: diag,
        })
    }

    fn validate_trader(
        &self,
        trader: &Trader,
        regions: &HashSet<&str>,
        diag: &mut Diagnostics,
    ) -> NemdeResult<()> {
        let entity = format!("Trader {}", trader.id);
        if !regions.contains(trader.region_id.as_str()) {
            return Err(NemdeError::input(
                &entity,
                "region_id",
                format!("references unknown region '{}'", trader.region_id),
            ));
        }
        finite(&entity, "initial_mw", trader.initial.initial_mw)?;
        if let Some(uigf) = trader.uigf {
            finite(&entity, "uigf", uigf)?;
        }
        if trader.semi_dispatch && trader.uigf.is_none() {
            diag.add_warning_with_entity(
                "uigf",
                "semi-dispatch trader without UIGF; energy offer availability used",
                &entity,
            );
        }
        if let Some(fs) = &trader.fast_start {
            for (field, value) in [
                ("t1", fs.t1),
                ("t2", fs.t2),
                ("t3", fs.t3),
                ("t4", fs.t4),
                ("min_loading_mw", fs.min_loading_mw),
                ("current_mode_time", fs.current_mode_time),
            ] {
                finite(&entity, field, value)?;
                if value < 0.0 {
                    return Err(NemdeError::input(&entity, field, "must be non-negative"));
                }
            }
        }

        let mut seen = HashSet::new();
        for offer in &trader.offers {
            let offer_entity = format!("{} offer {}", entity, offer.trade_type);
            if !seen.insert(offer.trade_type) {
                return Err(NemdeError::input(&entity, "offers", format!(
                    "duplicate {} offer",
                    offer.trade_type
                )));
            }
            if offer.trade_type.is_energy() && offer.trade_type != trader.energy_trade_type() {
                return Err(NemdeError::input(
                    &offer_entity,
                    "trade_type",
                    format!("not valid for a {:?} trader", trader.trader_type),
                ));
            }
            finite(&offer_entity, "max_avail", offer.max_avail)?;
            validate_bands(&offer_entity, &offer.bands)?;
            if offer.trade_type.is_fcas() {
                let trap = offer.trapezium.ok_or_else(|| {
                    NemdeError::input(&offer_entity, "trapezium", "required for FCAS offers")
                })?;
                for (field, value) in [
                    ("enablement_min", trap.enablement_min),
                    ("enablement_max", trap.enablement_max),
                    ("low_breakpoint", trap.low_breakpoint),
                    ("high_breakpoint", trap.high_breakpoint),
                ] {
                    finite(&offer_entity, field, value)?;
                }
                if offer.trade_type.is_regulation() && !trader.initial.agc_status {
                    diag.add_warning_with_entity(
                        "fcas",
                        "regulation offer with AGC off",
                        &offer_entity,
                    );
                }
            }
        }
        if trader.energy_offer().is_none() {
            diag.add_warning_with_entity("offer", "no energy offer", &entity);
        }
        Ok(())
    }

    fn validate_constraint(
        &self,
        constraint: &GenericConstraint,
        regions: &HashSet<&str>,
        equations: &HashSet<&str>,
        diag: &mut Diagnostics,
    ) -> NemdeResult<()> {
        let entity = format!("Constraint {}", constraint.id);
        finite(&entity, "violation_price", constraint.violation_price)?;
        match &constraint.rhs {
            RhsSource::Literal { value } => finite(&entity, "rhs", *value)?,
            RhsSource::Equation {
                equation_id,
                default,
            } => {
                finite(&entity, "rhs.default", *default)?;
                if !equations.contains(equation_id.as_str()) {
                    diag.add_warning_with_entity(
                        "equation",
                        &format!("equation '{}' absent; RHS uses its default", equation_id),
                        &entity,
                    );
                }
            }
        }
        for term in &constraint.lhs.traders {
            finite(&entity, "lhs.traders.factor", term.factor)?;
            match self.trader(term.trader_id.as_str()) {
                None => diag.add_warning_with_entity(
                    "reference",
                    &format!("unknown trader '{}'", term.trader_id),
                    &entity,
                ),
                Some(trader) if trader.offer(term.trade_type).is_none() => {
                    diag.add_warning_with_entity(
                        "reference",
                        &format!("trader '{}' has no {} offer", term.trader_id, term.trade_type),
                        &entity,
                    )
                }
                Some(_) => {}
            }
        }
        for term in &constraint.lhs.interconnectors {
            finite(&entity, "lhs.interconnectors.factor", term.factor)?;
            if self.interconnector(term.interconnector_id.as_str()).is_none() {
                return Err(NemdeError::input(
                    &entity,
                    "lhs.interconnectors",
                    format!("references unknown interconnector '{}'", term.interconnector_id),
                ));
            }
        }
        for term in &constraint.lhs.regions {
            finite(&entity, "lhs.regions.factor", term.factor)?;
            if !regions.contains(term.region_id.as_str()) {
                return Err(NemdeError::input(
                    &entity,
                    "lhs.regions",
                    format!("references unknown region '{}'", term.region_id),
                ));
            }
        }
        if constraint.lhs.is_empty() {
            diag.add_warning_with_entity("constraint", "empty left-hand side", &entity);
        }
        Ok(())
    }

    fn validate_equation(
        &self,
        equation: &GenericEquation,
        equations: &HashSet<&str>,
        diag: &mut Diagnostics,
    ) -> NemdeResult<()> {
        let entity = format!("Equation {}", equation.id);
        for term in &equation.terms {
            finite(&entity, "terms.multiplier", term.multiplier)?;
            match &term.operand {
                Some(Operand::Equation { equation_id })
                    if !equations.contains(equation_id.as_str()) =>
                {
                    return Err(NemdeError::input(
                        &entity,
                        "terms.operand",
                        format!("references unknown equation '{equation_id}'"),
                    ));
                }
                Some(Operand::Constraint { constraint_id, .. })
                    if self.constraint(constraint_id.as_str()).is_none() =>
                {
                    diag.add_warning_with_entity(
                        "equation",
                        &format!("constraint '{}' absent; default used", constraint_id),
                        &entity,
                    )
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn finite(entity: &str, field: &str, value: f64) -> NemdeResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(NemdeError::input(entity, field, "must be a finite number"))
    }
}

fn unique_ids<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
) -> NemdeResult<HashSet<&'a str>> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(NemdeError::input(
                format!("{kind} {id}"),
                "id",
                "is duplicated",
            ));
        }
    }
    Ok(seen)
}

fn validate_bands(entity: &str, bands: &[PriceBand]) -> NemdeResult<()> {
    if bands.len() > MAX_BANDS {
        return Err(NemdeError::input(
            entity,
            "bands",
            format!("has {} bands, at most {MAX_BANDS} allowed", bands.len()),
        ));
    }
    let mut previous = f64::NEG_INFINITY;
    for band in bands {
        finite(entity, "bands.price", band.price)?;
        finite(entity, "bands.quantity", band.quantity)?;
        if band.quantity < 0.0 {
            return Err(NemdeError::input(
                entity,
                "bands.quantity",
                "must be non-negative",
            ));
        }
        if band.price < previous {
            return Err(NemdeError::input(
                entity,
                "bands.price",
                "must be non-decreasing",
            ));
        }
        previous = band.price;
    }
    Ok(())
}

fn validate_interconnector(
    ic: &Interconnector,
    regions: &HashSet<&str>,
    diag: &mut Diagnostics,
) -> NemdeResult<()> {
    let entity = format!("Interconnector {}", ic.id);
    for (field, region) in [("from_region", &ic.from_region), ("to_region", &ic.to_region)] {
        if !regions.contains(region.as_str()) {
            return Err(NemdeError::input(
                &entity,
                field,
                format!("references unknown region '{region}'"),
            ));
        }
    }
    if ic.from_region == ic.to_region {
        return Err(NemdeError::input(&entity, "to_region", "equals from_region"));
    }
    finite(&entity, "upper_limit", ic.upper_limit)?;
    finite(&entity, "lower_limit", ic.lower_limit)?;
    finite(&entity, "initial_mw", ic.initial_mw)?;

    let loss = &ic.loss_model;
    finite(&entity, "loss_model.loss_share", loss.loss_share)?;
    finite(&entity, "loss_model.loss_lower_limit", loss.loss_lower_limit)?;
    if !(0.0..=1.0).contains(&loss.loss_share) {
        return Err(NemdeError::input(
            &entity,
            "loss_model.loss_share",
            "must lie in [0, 1]",
        ));
    }
    if loss.segments.is_empty() {
        return Err(NemdeError::input(
            &entity,
            "loss_model.segments",
            "must not be empty",
        ));
    }
    let mut previous = -loss.loss_lower_limit;
    for segment in &loss.segments {
        finite(&entity, "loss_model.segments.limit", segment.limit)?;
        finite(&entity, "loss_model.segments.factor", segment.factor)?;
        if segment.limit <= previous {
            return Err(NemdeError::input(
                &entity,
                "loss_model.segments.limit",
                "must be strictly increasing from -loss_lower_limit",
            ));
        }
        previous = segment.limit;
    }
    // Flows past the curve ends are cut by the loss encoding, not the limit.
    if ic.upper_limit > previous {
        diag.add_warning_with_entity(
            "loss_model",
            &format!(
                "upper_limit {} exceeds the last loss breakpoint {}; forward flow capped there",
                ic.upper_limit, previous
            ),
            &entity,
        );
    }
    if ic.lower_limit > loss.loss_lower_limit {
        diag.add_warning_with_entity(
            "loss_model",
            &format!(
                "lower_limit {} exceeds loss_lower_limit {}; reverse flow capped there",
                ic.lower_limit, loss.loss_lower_limit
            ),
            &entity,
        );
    }

    if let Some(mnsp) = &ic.mnsp {
        for (field, offer, expected) in [
            ("mnsp.from_region_offer", &mnsp.from_region_offer, &ic.from_region),
            ("mnsp.to_region_offer", &mnsp.to_region_offer, &ic.to_region),
        ] {
            if &offer.region_id != expected {
                return Err(NemdeError::input(
                    &entity,
                    field,
                    format!("region '{}' does not match link end '{}'", offer.region_id, expected),
                ));
            }
            finite(&entity, field, offer.max_avail)?;
            validate_bands(&format!("{entity} {field}"), &offer.bands)?;
        }
    }
    Ok(())
}

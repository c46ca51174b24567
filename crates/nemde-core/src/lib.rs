//! # nemde-core: casefile entity model
//!
//! Typed, immutable representation of one five-minute dispatch interval: the
//! inputs the dispatch engine consumes and the historical outputs it is judged
//! against.
//!
//! ## Design Philosophy
//!
//! The raw casefile is a loosely typed attribute bag. Here it becomes a closed
//! set of entities with strict numeric fields, checked once at ingestion by
//! [`Casefile::validate`]. Nothing downstream re-checks shapes or parses
//! strings.
//!
//! - [`Case`] - interval identity, price cap/floor, penalty prices, intervention flag
//! - [`Region`] - demand inputs
//! - [`Trader`] - generators and loads with their [`Offer`]s (energy + 8 FCAS markets)
//! - [`Interconnector`] - flow limits, [`LossModel`], optional MNSP offers
//! - [`GenericConstraint`] / [`GenericEquation`] - network constraints and their dynamic RHS
//! - [`DispatchSolution`] - output schema shared by computed and historical solutions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nemde_core::Casefile;
//!
//! let casefile = Casefile::from_path(std::path::Path::new("20201101001.json"))?;
//! let report = casefile.validate()?;
//! println!("{} traders, {}", report.stats.traders, report.diagnostics.summary());
//! # Ok::<(), nemde_core::NemdeError>(())
//! ```
//!
//! ## ID System
//!
//! Every entity is keyed by a string newtype ([`RegionId`], [`TraderId`],
//! [`InterconnectorId`], [`ConstraintId`], [`EquationId`]) so a trader id can
//! never be passed where a region id is expected.

use serde::{Deserialize, Serialize};

pub mod case;
pub mod casefile;
pub mod constraint;
pub mod diagnostics;
pub mod error;
pub mod interconnector;
pub mod patch;
pub mod region;
pub mod solution;
pub mod trade;
pub mod trader;

pub use case::{Case, PenaltyPrices};
pub use casefile::Casefile;
pub use constraint::{
    ConstraintType, EquationTerm, GenericConstraint, GenericEquation, InterconnectorAttribute,
    InterconnectorFactor, LhsTerms, Operand, Operation, RegionAttribute, RegionFactor, RhsSource,
    TraderAttribute, TraderFactor,
};
pub use diagnostics::{DiagnosticIssue, Diagnostics, IngestReport, IngestStats, Severity};
pub use error::{NemdeError, NemdeResult};
pub use interconnector::{Interconnector, LossModel, LossSegment, Mnsp, MnspOffer};
pub use patch::{apply_patches, CasefilePatch};
pub use region::Region;
pub use solution::{
    CaseSolution, ConstraintSolution, DispatchSolution, FcasOutcome, InterconnectorSolution,
    PeriodSolution, RegionFcas, RegionSolution, TraderSolution,
};
pub use trade::{TradeType, TraderType};
pub use trader::{
    FastStartMode, FastStartProfile, FcasTrapezium, Offer, PriceBand, Trader,
    TraderInitialConditions, MAX_BANDS,
};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Market region identifier (e.g. `NSW1`).
    RegionId
);
string_id!(
    /// Dispatchable unit identifier (DUID).
    TraderId
);
string_id!(
    /// Interconnector or MNSP link identifier.
    InterconnectorId
);
string_id!(
    /// Generic constraint identifier.
    ConstraintId
);
string_id!(
    /// Generic equation identifier.
    EquationId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn ids_serialize_transparently() {
        let id = TraderId::new("BW01");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"BW01\"");
        let parsed: RegionId = serde_json::from_str("\"NSW1\"").unwrap();
        assert_eq!(parsed.as_str(), "NSW1");
    }

    #[test]
    fn ids_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(RegionId::from("VIC1"), 1.0);
        assert_eq!(map.get("VIC1"), Some(&1.0));
    }
}

//! Dispatch run configuration.

use nemde_solver_common::{SolverConfig, SolverId};
use serde::{Deserialize, Serialize};

use crate::validation::ValidationTolerances;

/// How fast-start units are handled across solves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Solve with fast-start profiles inactive, commit uncommitted units that
    /// were dispatched, then re-solve with profiles active.
    #[default]
    Default,
    /// One solve per pass with fast-start profiles active.
    DispatchOnly,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Default => write!(f, "default"),
            Algorithm::DispatchOnly => write!(f, "dispatch_only"),
        }
    }
}

/// Solver encoding of interconnector loss curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossEncoding {
    SegmentSelection,
    ConvexCombination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub backend: SolverId,
    pub time_limit_secs: u64,
    pub max_iterations: u32,
    pub tolerance: f64,
    /// Allow continuous backends to solve the relaxation of integer models.
    pub relax_integrality: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            backend: SolverId::Clarabel,
            time_limit_secs: 300,
            max_iterations: 200,
            tolerance: 1e-8,
            relax_integrality: true,
        }
    }
}

impl SolverSettings {
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            timeout_seconds: self.time_limit_secs,
            relax_integrality: self.relax_integrality,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Tie-break price ($/MWh, scaled by VoLL); a casefile value overrides it.
    pub tie_break_price: f64,
    /// Energy target (MW) above which an uncommitted fast-start unit is committed.
    pub fast_start_threshold: f64,
    pub algorithm: Algorithm,
    /// Overrides the casefile's loss model flag when set.
    pub loss_encoding: Option<LossEncoding>,
    pub interval_minutes: f64,
    pub solver: SolverSettings,
    pub validation: ValidationTolerances,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tie_break_price: 1e-6,
            fast_start_threshold: 0.005,
            algorithm: Algorithm::Default,
            loss_encoding: None,
            interval_minutes: 5.0,
            solver: SolverSettings::default(),
            validation: ValidationTolerances::default(),
        }
    }
}

impl DispatchConfig {
    pub fn tie_break_price_for(&self, case: &nemde_core::Case) -> f64 {
        case.tie_break_price.unwrap_or(self.tie_break_price)
    }

    pub fn loss_encoding_for(&self, case: &nemde_core::Case) -> LossEncoding {
        self.loss_encoding.unwrap_or(if case.use_convex_loss_model {
            LossEncoding::ConvexCombination
        } else {
            LossEncoding::SegmentSelection
        })
    }

    /// Dispatch intervals per hour, used to turn MW/h ramp rates into MW.
    pub fn intervals_per_hour(&self) -> f64 {
        60.0 / self.interval_minutes
    }
}

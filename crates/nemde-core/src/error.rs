//! Unified error types for the dispatch workspace
//!
//! [`NemdeError`] is the error surfaced at crate boundaries. Resolver and
//! solver errors from `nemde-algo` convert into it so callers that only care
//! about "which interval failed and why" can use one type.
//!
//! # Example
//!
//! ```ignore
//! use nemde_core::{Casefile, NemdeResult};
//!
//! fn load(path: &std::path::Path) -> NemdeResult<Casefile> {
//!     let casefile = Casefile::from_path(path)?;
//!     casefile.validate()?;
//!     Ok(casefile)
//! }
//! ```

use thiserror::Error;

/// Unified error type for casefile handling and dispatch runs.
#[derive(Error, Debug)]
pub enum NemdeError {
    /// I/O errors (reading casefiles, writing solutions)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// A casefile field is missing or malformed.
    #[error("Input error in {entity}: field '{field}' {message}")]
    Input {
        entity: String,
        field: String,
        message: String,
    },

    /// Cross-entity validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Solver/algorithm errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl NemdeError {
    /// Build an [`NemdeError::Input`] for a named entity and field.
    pub fn input(
        entity: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        NemdeError::Input {
            entity: entity.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for defects in the casefile itself (category (a) outcomes).
    pub fn is_input_defect(&self) -> bool {
        matches!(
            self,
            NemdeError::Input { .. } | NemdeError::Parse(_) | NemdeError::Validation(_)
        )
    }
}

/// Convenience type alias for Results using NemdeError.
pub type NemdeResult<T> = Result<T, NemdeError>;

impl From<anyhow::Error> for NemdeError {
    fn from(err: anyhow::Error) -> Self {
        NemdeError::Other(err.to_string())
    }
}

impl From<String> for NemdeError {
    fn from(s: String) -> Self {
        NemdeError::Other(s)
    }
}

impl From<&str> for NemdeError {
    fn from(s: &str) -> Self {
        NemdeError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for NemdeError {
    fn from(err: serde_json::Error) -> Self {
        NemdeError::Parse(err.to_string())
    }
}

//! Error types for the scenario model

use thiserror::Error;

/// Result type alias using storecheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// Scenario-model errors. Both variants are programmer errors: they are
/// raised immediately and are not runtime conditions to recover from.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unrecognized scenario kind: {0}")]
    InvalidScenarioKind(String),

    #[error("Unknown form field: {0}")]
    UnknownField(String),
}

//! Error types for the scenario harness

use thiserror::Error;

use crate::driver::DriverError;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Form at {url} did not appear within {waited_ms} ms")]
    NavigationTimeout { url: String, waited_ms: u64 },

    #[error("Target unreachable at {url} after {attempts} attempts")]
    TargetUnreachable { url: String, attempts: usize },

    #[error("Scenario {kind} [{email}] failed at {last_url}: {reason}")]
    ScenarioFailed {
        kind: String,
        email: String,
        last_url: String,
        reason: String,
    },

    #[error("Stage order violation: {0}")]
    StageOrder(String),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Fixture error: {0}")]
    Fixture(#[from] storecheck_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

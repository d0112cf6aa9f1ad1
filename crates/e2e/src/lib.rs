//! Storecheck E2E Scenario Harness
//!
//! This crate turns the declarative scenario model from
//! `storecheck-common` into browser-driven runs against a storefront:
//! - Drives a browser session behind the [`PageDriver`] abstraction
//! - Walks each scenario through a fixed stage machine
//! - Classifies the settled page state and reduces it to a verdict
//! - Aggregates per-scenario reports into a JSON suite report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Harness (Rust)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner<D: PageDriver>                              │
//! │    ├── run_registration(scenario) -> SettledState           │
//! │    ├── run_login(email, password)  -> SettledState          │
//! │    ├── run_search(query, sort)     -> SearchOutcome         │
//! │    └── stages: NotStarted -> FormLoaded -> FieldsFilled     │
//! │                 -> Submitted -> Settled                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageDriver implementations                                 │
//! │    ├── PlaywrightDriver  (Node script generation)           │
//! │    └── SimStorefront     (in-process model, hermetic tests) │
//! ├─────────────────────────────────────────────────────────────┤
//! │  verifier::verify(settled, expected) -> Verdict             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod driver;
pub mod error;
pub mod pages;
pub mod playwright;
pub mod runner;
pub mod sim;
pub mod target;
pub mod verifier;

pub use driver::{Cookie, DriverError, DriverResult, PageDriver};
pub use error::{E2eError, E2eResult};
pub use runner::{RunnerConfig, ScenarioRunner, SettledState, SuiteReport};
pub use verifier::{verify, OutcomeKind, Verdict};

//! Storecheck Common Library
//!
//! Shared scenario model for the storecheck harness: synthetic identity
//! generation, fixture building, and the declarative scenario types the
//! runner consumes.

pub mod error;
pub mod fixture;
pub mod identity;
pub mod scenario;

// Re-export commonly used types
pub use error::{Error, Result};
pub use fixture::{build_fixture, FieldAction, FieldValues, FormField, FIELD_ORDER};
pub use identity::{
    DateOfBirth, Gender, Identity, IdentityGenerator, IdentityOptions, DEFAULT_EMAIL_DOMAIN,
};
pub use scenario::{ExpectedOutcome, FieldOverride, Scenario, ScenarioKind};

/// Storecheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

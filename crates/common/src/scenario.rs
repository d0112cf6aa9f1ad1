//! Declarative scenario model
//!
//! A scenario is data: a kind selecting the fixture variant, the identity
//! it owns, field overrides for corrupting individual inputs, and the
//! outcome the calling test expects. Scenarios are in-process values,
//! never files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fixture::{FieldAction, FormField};
use crate::identity::Identity;

/// Fixture variant selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Required fields only, all valid.
    Minimal,
    /// Minimal plus the three date-of-birth selects.
    WithDateOfBirth,
    /// Minimal plus the newsletter opt-in checkbox.
    WithNewsletter,
    /// Every text field saturated to its documented maximum length.
    MaxLength,
    /// Names containing non-ASCII characters.
    InternationalChars,
    /// Names with runs of interior whitespace.
    MultipleSpaces,
    /// A password the storefront's policy should reject.
    WeakPassword,
    /// All fields valid except one, forced empty. Isolates a single
    /// required-ness check.
    EmptyField { field: FormField },
    /// Confirmation field deliberately differing from the password.
    MismatchedConfirmation,
    /// Submit twice to probe idempotence. Never the default behavior.
    DoubleSubmit,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKind::Minimal => write!(f, "minimal"),
            ScenarioKind::WithDateOfBirth => write!(f, "with_date_of_birth"),
            ScenarioKind::WithNewsletter => write!(f, "with_newsletter"),
            ScenarioKind::MaxLength => write!(f, "max_length"),
            ScenarioKind::InternationalChars => write!(f, "international_chars"),
            ScenarioKind::MultipleSpaces => write!(f, "multiple_spaces"),
            ScenarioKind::WeakPassword => write!(f, "weak_password"),
            ScenarioKind::EmptyField { field } => write!(f, "empty_field:{field}"),
            ScenarioKind::MismatchedConfirmation => write!(f, "mismatched_confirmation"),
            ScenarioKind::DoubleSubmit => write!(f, "double_submit"),
        }
    }
}

impl FromStr for ScenarioKind {
    type Err = Error;

    /// Parse a kind name as given on the command line, e.g. `minimal` or
    /// `empty_field:email`. Unrecognized text is a programmer error and
    /// fails immediately.
    fn from_str(s: &str) -> Result<Self> {
        let kind = match s {
            "minimal" => ScenarioKind::Minimal,
            "with_date_of_birth" => ScenarioKind::WithDateOfBirth,
            "with_newsletter" => ScenarioKind::WithNewsletter,
            "max_length" => ScenarioKind::MaxLength,
            "international_chars" => ScenarioKind::InternationalChars,
            "multiple_spaces" => ScenarioKind::MultipleSpaces,
            "weak_password" => ScenarioKind::WeakPassword,
            "mismatched_confirmation" => ScenarioKind::MismatchedConfirmation,
            "double_submit" => ScenarioKind::DoubleSubmit,
            other => match other.strip_prefix("empty_field:") {
                Some(field) => ScenarioKind::EmptyField {
                    field: field.parse()?,
                },
                None => return Err(Error::InvalidScenarioKind(other.to_string())),
            },
        };
        Ok(kind)
    }
}

/// What the calling test expects the settled state to look like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExpectedOutcome {
    Success,
    /// An error indicator; `message` is matched case-normalized and
    /// substring-based when present.
    ValidationError { message: Option<String> },
    Indeterminate,
    /// Any listed outcome satisfies the expectation. Encodes source
    /// scenarios whose intended policy is genuinely ambiguous.
    AnyOf { outcomes: Vec<ExpectedOutcome> },
}

impl ExpectedOutcome {
    pub fn validation_error(message: impl Into<String>) -> Self {
        ExpectedOutcome::ValidationError {
            message: Some(message.into()),
        }
    }
}

/// Per-field override applied on top of the built fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOverride {
    pub field: FormField,
    pub action: FieldAction,
}

/// One test case's inputs and expected outcome. Owns exactly one identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub identity: Identity,
    #[serde(default)]
    pub overrides: Vec<FieldOverride>,
    pub expected: ExpectedOutcome,
}

impl Scenario {
    pub fn new(kind: ScenarioKind, identity: Identity, expected: ExpectedOutcome) -> Self {
        Self {
            kind,
            identity,
            overrides: Vec::new(),
            expected,
        }
    }

    /// Add an override; later overrides win over earlier ones.
    pub fn with_override(mut self, field: FormField, action: FieldAction) -> Self {
        self.overrides.push(FieldOverride { field, action });
        self
    }

    /// Stable one-line description used in failure reports, carrying the
    /// kind and the generated email so failures reproduce without extra
    /// logging.
    pub fn describe(&self) -> String {
        format!("{} [{}]", self.kind, self.identity.email())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("minimal", ScenarioKind::Minimal)]
    #[test_case("weak_password", ScenarioKind::WeakPassword)]
    #[test_case("double_submit", ScenarioKind::DoubleSubmit)]
    #[test_case("empty_field:email", ScenarioKind::EmptyField { field: FormField::Email })]
    fn kind_parses(input: &str, expected: ScenarioKind) {
        assert_eq!(input.parse::<ScenarioKind>().unwrap(), expected);
    }

    #[test]
    fn unrecognized_kind_is_fatal() {
        let err = "definitely_not_a_kind".parse::<ScenarioKind>().unwrap_err();
        assert!(matches!(err, Error::InvalidScenarioKind(_)));
    }

    #[test]
    fn unrecognized_empty_field_target_is_fatal() {
        let err = "empty_field:shoe_size".parse::<ScenarioKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownField(_)));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let kind = ScenarioKind::EmptyField {
            field: FormField::Password,
        };
        assert_eq!(kind.to_string().parse::<ScenarioKind>().unwrap(), kind);
    }
}

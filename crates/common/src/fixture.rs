//! Fixture building: scenario kind -> ordered form field values
//!
//! A fixture is the complete, ordered set of actions to apply to the
//! account form. The order is fixed (email before password before
//! secondary attributes) so any field-level validation in the
//! application observes a consistent sequence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::identity::{DateOfBirth, Identity};
use crate::scenario::ScenarioKind;

/// Documented maximum accepted by the storefront's name inputs.
pub const NAME_MAX_LEN: usize = 50;
/// Documented maximum accepted by the password input.
pub const PASSWORD_MAX_LEN: usize = 64;

/// The account form's named inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Email,
    Password,
    ConfirmPassword,
    FirstName,
    LastName,
    Gender,
    BirthDay,
    BirthMonth,
    BirthYear,
    Newsletter,
}

/// Canonical fill order: identifying fields, then credentials, then
/// secondary attributes.
pub const FIELD_ORDER: [FormField; 10] = [
    FormField::Email,
    FormField::Password,
    FormField::ConfirmPassword,
    FormField::FirstName,
    FormField::LastName,
    FormField::Gender,
    FormField::BirthDay,
    FormField::BirthMonth,
    FormField::BirthYear,
    FormField::Newsletter,
];

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormField::Email => "email",
            FormField::Password => "password",
            FormField::ConfirmPassword => "confirm_password",
            FormField::FirstName => "first_name",
            FormField::LastName => "last_name",
            FormField::Gender => "gender",
            FormField::BirthDay => "birth_day",
            FormField::BirthMonth => "birth_month",
            FormField::BirthYear => "birth_year",
            FormField::Newsletter => "newsletter",
        };
        write!(f, "{name}")
    }
}

impl FromStr for FormField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let field = match s {
            "email" => FormField::Email,
            "password" => FormField::Password,
            "confirm_password" => FormField::ConfirmPassword,
            "first_name" => FormField::FirstName,
            "last_name" => FormField::LastName,
            "gender" => FormField::Gender,
            "birth_day" => FormField::BirthDay,
            "birth_month" => FormField::BirthMonth,
            "birth_year" => FormField::BirthYear,
            "newsletter" => FormField::Newsletter,
            other => return Err(Error::UnknownField(other.to_string())),
        };
        Ok(field)
    }
}

/// What to do with one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FieldAction {
    /// Type a value into a text input.
    Fill { value: String },
    /// Tick a checkbox or radio group member; `value` selects the member.
    Check { value: Option<String> },
    /// Pick an option from a dropdown.
    Select { value: String },
    /// Do not touch the field.
    Leave,
}

impl FieldAction {
    pub fn fill(value: impl Into<String>) -> Self {
        FieldAction::Fill {
            value: value.into(),
        }
    }

    /// The action that forces a field to its empty state, used by
    /// empty-field scenarios.
    fn emptied(field: FormField) -> Self {
        match field {
            FormField::Gender | FormField::Newsletter => FieldAction::Leave,
            FormField::BirthDay | FormField::BirthMonth | FormField::BirthYear => {
                FieldAction::Select {
                    value: String::new(),
                }
            }
            _ => FieldAction::fill(""),
        }
    }
}

/// A complete ordered fixture for the account form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValues {
    entries: Vec<(FormField, FieldAction)>,
}

impl FieldValues {
    /// Every field in canonical order, all untouched.
    fn untouched() -> Self {
        Self {
            entries: FIELD_ORDER
                .iter()
                .map(|f| (*f, FieldAction::Leave))
                .collect(),
        }
    }

    /// Replace the action for a field, keeping its canonical position.
    pub fn set(&mut self, field: FormField, action: FieldAction) {
        for entry in &mut self.entries {
            if entry.0 == field {
                entry.1 = action;
                return;
            }
        }
    }

    pub fn action_for(&self, field: FormField) -> &FieldAction {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, a)| a)
            .unwrap_or(&FieldAction::Leave)
    }

    /// Fields in application order, untouched ones skipped.
    pub fn iter(&self) -> impl Iterator<Item = (FormField, &FieldAction)> {
        self.entries
            .iter()
            .filter(|(_, a)| !matches!(a, FieldAction::Leave))
            .map(|(f, a)| (*f, a))
    }

    /// The value that will be typed into a text field, if any.
    pub fn fill_value(&self, field: FormField) -> Option<&str> {
        match self.action_for(field) {
            FieldAction::Fill { value } => Some(value),
            _ => None,
        }
    }
}

/// Date used when a scenario wants a date of birth but the identity
/// carries none.
fn default_dob() -> DateOfBirth {
    DateOfBirth::new(10, 5, 1990)
}

/// Repeat `base` up to `target` length, then append the unique tag so
/// successive fixtures never collide even at saturation length.
fn saturated(base: char, target: usize, unique: &str) -> String {
    let fill = target.saturating_sub(unique.len());
    let mut s: String = std::iter::repeat(base).take(fill).collect();
    s.push_str(&unique[..unique.len().min(target)]);
    s
}

/// Assemble the ordered field values for one scenario kind.
pub fn build_fixture(identity: &Identity, kind: &ScenarioKind) -> FieldValues {
    let mut values = FieldValues::untouched();

    // Valid baseline shared by every kind.
    values.set(FormField::Email, FieldAction::fill(identity.email()));
    values.set(FormField::Password, FieldAction::fill(&identity.password));
    values.set(
        FormField::ConfirmPassword,
        FieldAction::fill(&identity.password),
    );
    values.set(FormField::FirstName, FieldAction::fill(&identity.first_name));
    values.set(FormField::LastName, FieldAction::fill(&identity.last_name));
    if let Some(gender) = identity.gender {
        values.set(
            FormField::Gender,
            FieldAction::Check {
                value: Some(gender.form_value().to_string()),
            },
        );
    }

    match kind {
        ScenarioKind::Minimal | ScenarioKind::DoubleSubmit => {}

        ScenarioKind::WithDateOfBirth => {
            let dob = identity.date_of_birth.unwrap_or_else(default_dob);
            values.set(
                FormField::BirthDay,
                FieldAction::Select {
                    value: dob.day.to_string(),
                },
            );
            values.set(
                FormField::BirthMonth,
                FieldAction::Select {
                    value: dob.month.to_string(),
                },
            );
            values.set(
                FormField::BirthYear,
                FieldAction::Select {
                    value: dob.year.to_string(),
                },
            );
        }

        ScenarioKind::WithNewsletter => {
            values.set(FormField::Newsletter, FieldAction::Check { value: None });
        }

        ScenarioKind::MaxLength => {
            let tag = identity.unique_tag();
            values.set(
                FormField::FirstName,
                FieldAction::fill(saturated('a', NAME_MAX_LEN, tag)),
            );
            values.set(
                FormField::LastName,
                FieldAction::fill(saturated('b', NAME_MAX_LEN, tag)),
            );
            let password = saturated('P', PASSWORD_MAX_LEN - 4, tag) + "a1@Z";
            values.set(FormField::Password, FieldAction::fill(&password));
            values.set(FormField::ConfirmPassword, FieldAction::fill(&password));
        }

        ScenarioKind::InternationalChars => {
            values.set(FormField::FirstName, FieldAction::fill("Яна"));
            values.set(FormField::LastName, FieldAction::fill("Müller-Łukasz"));
        }

        ScenarioKind::MultipleSpaces => {
            values.set(FormField::FirstName, FieldAction::fill("Anna  Maria"));
            values.set(FormField::LastName, FieldAction::fill("De  La  Cruz"));
        }

        ScenarioKind::WeakPassword => {
            values.set(FormField::Password, FieldAction::fill("123"));
            values.set(FormField::ConfirmPassword, FieldAction::fill("123"));
        }

        ScenarioKind::EmptyField { field } => {
            // Populate the full form with valid defaults first, so the
            // single emptied field is the only thing under test.
            let dob = identity.date_of_birth.unwrap_or_else(default_dob);
            values.set(
                FormField::BirthDay,
                FieldAction::Select {
                    value: dob.day.to_string(),
                },
            );
            values.set(
                FormField::BirthMonth,
                FieldAction::Select {
                    value: dob.month.to_string(),
                },
            );
            values.set(
                FormField::BirthYear,
                FieldAction::Select {
                    value: dob.year.to_string(),
                },
            );
            values.set(FormField::Newsletter, FieldAction::Check { value: None });
            if values.action_for(FormField::Gender) == &FieldAction::Leave {
                values.set(
                    FormField::Gender,
                    FieldAction::Check {
                        value: Some("1".to_string()),
                    },
                );
            }
            values.set(*field, FieldAction::emptied(*field));
        }

        ScenarioKind::MismatchedConfirmation => {
            let mismatch = format!("{}X", identity.password);
            values.set(FormField::ConfirmPassword, FieldAction::fill(mismatch));
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityGenerator, IdentityOptions};
    use test_case::test_case;

    fn identity() -> Identity {
        IdentityGenerator::new().generate("fixture.test", &IdentityOptions::default())
    }

    #[test]
    fn email_precedes_password_precedes_secondary() {
        let fixture = build_fixture(&identity(), &ScenarioKind::WithNewsletter);
        let order: Vec<FormField> = fixture.iter().map(|(f, _)| f).collect();

        let email = order.iter().position(|f| *f == FormField::Email).unwrap();
        let password = order.iter().position(|f| *f == FormField::Password).unwrap();
        let newsletter = order
            .iter()
            .position(|f| *f == FormField::Newsletter)
            .unwrap();

        assert!(email < password);
        assert!(password < newsletter);
    }

    #[test]
    fn empty_field_isolates_exactly_one_field() {
        let fixture = build_fixture(
            &identity(),
            &ScenarioKind::EmptyField {
                field: FormField::Email,
            },
        );
        assert_eq!(fixture.fill_value(FormField::Email), Some(""));
        // Everything else keeps a valid value.
        assert_ne!(fixture.fill_value(FormField::Password), Some(""));
        assert_ne!(fixture.fill_value(FormField::FirstName), Some(""));
        assert!(matches!(
            fixture.action_for(FormField::BirthDay),
            FieldAction::Select { value } if !value.is_empty()
        ));
    }

    #[test]
    fn max_length_fixtures_never_collide() {
        let a = build_fixture(&identity(), &ScenarioKind::MaxLength);
        let b = build_fixture(&identity(), &ScenarioKind::MaxLength);
        assert_ne!(
            a.fill_value(FormField::FirstName),
            b.fill_value(FormField::FirstName)
        );
        assert_eq!(
            a.fill_value(FormField::FirstName).unwrap().len(),
            NAME_MAX_LEN
        );
    }

    #[test]
    fn weak_password_is_the_documented_probe_value() {
        let fixture = build_fixture(&identity(), &ScenarioKind::WeakPassword);
        assert_eq!(fixture.fill_value(FormField::Password), Some("123"));
        assert_eq!(fixture.fill_value(FormField::ConfirmPassword), Some("123"));
    }

    #[test]
    fn mismatched_confirmation_differs_from_password() {
        let fixture = build_fixture(&identity(), &ScenarioKind::MismatchedConfirmation);
        assert_ne!(
            fixture.fill_value(FormField::Password),
            fixture.fill_value(FormField::ConfirmPassword)
        );
    }

    #[test_case(FormField::Password)]
    #[test_case(FormField::FirstName)]
    #[test_case(FormField::LastName)]
    fn emptied_text_fields_fill_empty_string(field: FormField) {
        let fixture = build_fixture(&identity(), &ScenarioKind::EmptyField { field });
        assert_eq!(fixture.fill_value(field), Some(""));
    }

    #[test]
    fn multiple_spaces_fixture_contains_runs_of_spaces() {
        let fixture = build_fixture(&identity(), &ScenarioKind::MultipleSpaces);
        assert!(fixture
            .fill_value(FormField::FirstName)
            .unwrap()
            .contains("  "));
    }
}

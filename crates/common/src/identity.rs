//! Synthetic user identities with a process-wide uniqueness guarantee
//!
//! Every generated email local part combines a millisecond timestamp, a
//! process-wide monotonic sequence number, and a random hex suffix. The
//! sequence number makes two generations within the same millisecond
//! distinct even before the randomness is considered.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Process-wide generation sequence. Never reset.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Reserved domain (RFC 2606) so generated addresses stay inert.
pub const DEFAULT_EMAIL_DOMAIN: &str = "example.com";

/// Gender as the storefront's account form encodes it (radio group value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// The value attribute carried by the corresponding radio input.
    pub fn form_value(&self) -> &'static str {
        match self {
            Gender::Male => "1",
            Gender::Female => "2",
        }
    }
}

/// Date of birth as three separate form fields.
///
/// Calendar validity is deliberately not enforced: combinations like
/// Feb 30 must be constructible so the application's own validation can
/// be exercised. Only the numeric field ranges are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateOfBirth {
    pub day: u8,
    pub month: u8,
    pub year: i32,
}

impl DateOfBirth {
    pub fn new(day: u8, month: u8, year: i32) -> Self {
        debug_assert!((1..=31).contains(&day), "day out of range: {day}");
        debug_assert!((1..=12).contains(&month), "month out of range: {month}");
        Self { day, month, year }
    }
}

/// A synthetic user record used as test input. Never a real credential.
///
/// Immutable after construction; the application under test is the sole
/// durable store for anything derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email_local: String,
    pub email_domain: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<DateOfBirth>,
}

impl Identity {
    /// Full address, `local@domain`.
    pub fn email(&self) -> String {
        format!("{}@{}", self.email_local, self.email_domain)
    }

    /// Name as the storefront displays it after login.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The unique tail of the local part (timestamp + sequence + random
    /// suffix). Fixture builders reuse it to keep derived values unique.
    pub fn unique_tag(&self) -> &str {
        self.email_local
            .rsplit('.')
            .next()
            .unwrap_or(&self.email_local)
    }
}

/// Knobs for identity generation. All off by default.
#[derive(Debug, Clone, Default)]
pub struct IdentityOptions {
    /// Render the whole address in uppercase.
    pub uppercase_email: bool,

    /// Append a `+tag` sub-address to the local part.
    pub sub_address: Option<String>,

    /// Use names with non-ASCII characters.
    pub international: bool,

    /// Pad the local part with filler to at least this length.
    pub pad_to: Option<usize>,

    /// Override the email domain.
    pub domain: Option<String>,
}

/// Produces collision-free identities from a human-readable base label.
#[derive(Debug, Clone)]
pub struct IdentityGenerator {
    default_domain: String,
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Names drawn from when `international` is requested, cycled by sequence
/// number so repeated generations vary.
const INTERNATIONAL_NAMES: &[(&str, &str)] = &[
    ("José", "García"),
    ("Zoë", "Müller"),
    ("François", "Lefèvre"),
    ("Åsa", "Sjöberg"),
    ("美咲", "佐藤"),
];

impl IdentityGenerator {
    pub fn new() -> Self {
        Self {
            default_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
        }
    }

    pub fn with_domain(domain: impl Into<String>) -> Self {
        Self {
            default_domain: domain.into(),
        }
    }

    /// Construct a fresh identity. Pure construction, no failure modes.
    ///
    /// Two identities generated in the same process never compare equal
    /// on email, regardless of how close together the calls land.
    pub fn generate(&self, base_label: &str, options: &IdentityOptions) -> Identity {
        debug_assert!(!base_label.is_empty(), "base label must be non-empty");

        let stamp = chrono::Utc::now().timestamp_millis();
        let seq = SEQUENCE.fetch_add(1, Ordering::SeqCst);
        let noise: u32 = rand::thread_rng().gen();

        let prefix = slugify(base_label);
        let mut local = format!("{prefix}.{stamp}{seq}{noise:08x}");

        if let Some(tag) = &options.sub_address {
            local.push('+');
            local.push_str(tag);
        }

        if let Some(target) = options.pad_to {
            while local.len() < target {
                local.push('x');
            }
        }

        if options.uppercase_email {
            local = local.to_uppercase();
        }

        let (first_name, last_name) = if options.international {
            let (f, l) = INTERNATIONAL_NAMES[(seq as usize) % INTERNATIONAL_NAMES.len()];
            (f.to_string(), l.to_string())
        } else {
            names_from_label(base_label)
        };

        let identity = Identity {
            email_local: local,
            email_domain: options
                .domain
                .clone()
                .unwrap_or_else(|| self.default_domain.clone()),
            first_name,
            last_name,
            // Satisfies the usual storefront policy: mixed case, digit, symbol.
            password: format!("Aa1@{noise:08x}"),
            gender: None,
            date_of_birth: None,
        };

        tracing::debug!(email = %identity.email(), seq, "generated identity");
        identity
    }
}

/// Lowercase the label and keep only email-safe characters, collapsing
/// everything else to dots.
fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut last_dot = true;
    for c in label.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            slug.push(c);
            last_dot = false;
        } else if !last_dot {
            slug.push('.');
            last_dot = true;
        }
    }
    while slug.ends_with('.') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("user");
    }
    slug
}

/// Derive first/last name from a label like `john.doe` or `jane_smith`.
fn names_from_label(label: &str) -> (String, String) {
    let mut parts = label
        .split(|c: char| c == '.' || c == '_' || c == ' ' || c == '-')
        .filter(|p| !p.is_empty());

    let first = parts.next().map(capitalize).unwrap_or_else(|| "Test".into());
    let last = parts.next().map(capitalize).unwrap_or_else(|| "User".into());
    (first, last)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn emails_never_collide_in_one_process() {
        let generator = IdentityGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let identity = generator.generate("collide", &IdentityOptions::default());
            assert!(seen.insert(identity.email()), "duplicate email generated");
        }
    }

    #[test]
    fn same_label_different_instants_differ() {
        let generator = IdentityGenerator::new();
        let a = generator.generate("john.doe", &IdentityOptions::default());
        let b = generator.generate("john.doe", &IdentityOptions::default());
        assert_ne!(a.email(), b.email());
    }

    #[test]
    fn names_derive_from_label() {
        let generator = IdentityGenerator::new();
        let identity = generator.generate("john.doe", &IdentityOptions::default());
        assert_eq!(identity.first_name, "John");
        assert_eq!(identity.last_name, "Doe");
        assert_eq!(identity.display_name(), "John Doe");
    }

    #[test]
    fn sub_address_lands_before_domain() {
        let generator = IdentityGenerator::new();
        let options = IdentityOptions {
            sub_address: Some("orders".into()),
            ..Default::default()
        };
        let identity = generator.generate("tagged", &options);
        assert!(identity.email_local.contains("+orders"));
        assert!(identity.email().ends_with("@example.com"));
    }

    #[test]
    fn uppercase_option_uppercases_local_part() {
        let generator = IdentityGenerator::new();
        let options = IdentityOptions {
            uppercase_email: true,
            ..Default::default()
        };
        let identity = generator.generate("shouty", &options);
        assert_eq!(identity.email_local, identity.email_local.to_uppercase());
    }

    #[test]
    fn padding_reaches_requested_length() {
        let generator = IdentityGenerator::new();
        let options = IdentityOptions {
            pad_to: Some(64),
            ..Default::default()
        };
        let identity = generator.generate("pad", &options);
        assert!(identity.email_local.len() >= 64);
    }

    #[test]
    fn padded_identities_stay_unique() {
        let generator = IdentityGenerator::new();
        let options = IdentityOptions {
            pad_to: Some(64),
            ..Default::default()
        };
        let a = generator.generate("pad", &options);
        let b = generator.generate("pad", &options);
        assert_ne!(a.email(), b.email());
    }

    #[test]
    fn slug_strips_unsafe_characters() {
        assert_eq!(slugify("John Doe!"), "john.doe");
        assert_eq!(slugify("a@@b"), "a.b");
        assert_eq!(slugify("***"), "user");
    }

    #[test]
    fn feb_30_is_constructible() {
        let dob = DateOfBirth::new(30, 2, 1990);
        assert_eq!(dob.day, 30);
        assert_eq!(dob.month, 2);
    }
}

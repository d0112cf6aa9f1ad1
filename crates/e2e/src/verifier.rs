//! Outcome verification: settled page state -> verdict
//!
//! Verification never fails silently: a mismatch still produces a
//! Verdict, and the calling test decides whether that is a failure.
//! Error-message comparison is case-normalized and substring-based —
//! the exact wording belongs to the application, not this layer.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use storecheck_common::ExpectedOutcome;

use crate::runner::{SearchOutcome, SettledState};

/// Classified outcome of a settled scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    ValidationError,
    NavigatedAway,
    Indeterminate,
}

/// Verdict for one scenario. Produced once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub outcome: OutcomeKind,
    /// Whether the observed outcome satisfied the expectation.
    pub matched: bool,
    pub observed_message: Option<String>,
    pub observed_url: Option<String>,
}

/// Reduce a settled state against the expectation.
pub fn verify(settled: &SettledState, expected: &ExpectedOutcome) -> Verdict {
    let outcome = classify(settled);
    let matched = outcome_matches(settled, expected);

    let observed_message = match settled {
        SettledState::ValidationError { message, .. } => Some(message.clone()),
        _ => None,
    };

    Verdict {
        outcome,
        matched,
        observed_message,
        observed_url: Some(settled.url().to_string()),
    }
}

fn classify(settled: &SettledState) -> OutcomeKind {
    match settled {
        SettledState::Success { .. } => OutcomeKind::Success,
        SettledState::ValidationError { .. } => OutcomeKind::ValidationError,
        SettledState::NavigatedAway { .. } => OutcomeKind::NavigatedAway,
        SettledState::Indeterminate { .. } => OutcomeKind::Indeterminate,
    }
}

fn outcome_matches(settled: &SettledState, expected: &ExpectedOutcome) -> bool {
    match expected {
        ExpectedOutcome::Success => matches!(settled, SettledState::Success { .. }),
        ExpectedOutcome::ValidationError { message } => match settled {
            SettledState::ValidationError {
                message: observed, ..
            } => message
                .as_ref()
                .map_or(true, |needle| contains_normalized(observed, needle)),
            _ => false,
        },
        ExpectedOutcome::Indeterminate => {
            matches!(settled, SettledState::Indeterminate { .. })
        }
        ExpectedOutcome::AnyOf { outcomes } => {
            outcomes.iter().any(|o| outcome_matches(settled, o))
        }
    }
}

/// Case-normalized substring containment.
fn contains_normalized(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Requested result ordering for search verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceOrdering {
    Ascending,
    Descending,
}

/// Structured detail for a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchVerdict {
    pub product_count: usize,
    pub prices: Vec<f64>,
    pub count_nonzero: bool,
    /// `None` when no ordering was requested.
    pub ordering_ok: Option<bool>,
}

/// Check product count and, when requested, price monotonicity.
pub fn verify_search(outcome: &SearchOutcome, ordering: Option<PriceOrdering>) -> SearchVerdict {
    let prices: Vec<f64> = outcome
        .price_texts
        .iter()
        .filter_map(|t| parse_price(t))
        .collect();

    let ordering_ok = ordering.map(|o| {
        prices.windows(2).all(|w| match o {
            PriceOrdering::Ascending => w[0] <= w[1],
            PriceOrdering::Descending => w[0] >= w[1],
        })
    });

    SearchVerdict {
        product_count: outcome.product_count,
        count_nonzero: outcome.product_count > 0,
        prices,
        ordering_ok,
    }
}

/// Pull the first decimal number out of a rendered price such as
/// `"Rs. 500"` or `"$12.99"`.
fn parse_price(text: &str) -> Option<f64> {
    static PRICE: OnceLock<Regex> = OnceLock::new();
    let re = PRICE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("static regex"));
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

//! Login and search flows against the simulated storefront, including
//! the cross-session properties: case-folded login, unique identities
//! under concurrency, isolated sessions.

use std::collections::HashSet;
use std::time::Duration;

use storecheck_common::{
    ExpectedOutcome, IdentityGenerator, IdentityOptions, Scenario, ScenarioKind,
};
use storecheck_e2e::runner::{RunnerConfig, ScenarioRunner, SettledState};
use storecheck_e2e::sim::SimStorefront;
use storecheck_e2e::verifier::{verify_search, PriceOrdering};
use storecheck_e2e::PageDriver;

fn config() -> RunnerConfig {
    RunnerConfig {
        base_url: "http://shop.test".to_string(),
        form_timeout: Duration::from_millis(100),
        settle_timeout: Duration::from_millis(100),
    }
}

/// Register an identity and hand back the shared store for follow-up
/// sessions.
async fn register(scenario: &Scenario) -> storecheck_e2e::sim::SharedAccounts {
    let mut sim = SimStorefront::new();
    let accounts = sim.accounts();
    let settled = ScenarioRunner::new(&mut sim, config())
        .run_registration(scenario)
        .await
        .unwrap();
    assert!(
        matches!(settled, SettledState::Success { .. }),
        "registration must succeed first: {settled:?}"
    );
    accounts
}

#[tokio::test]
async fn login_is_case_insensitive_on_email() {
    // Register with an uppercased address, then log in lowercased.
    let identity = IdentityGenerator::new().generate(
        "case.fold",
        &IdentityOptions {
            uppercase_email: true,
            ..Default::default()
        },
    );
    let password = identity.password.clone();
    let email = identity.email();
    assert_ne!(email, email.to_lowercase());

    let scenario = Scenario::new(ScenarioKind::Minimal, identity, ExpectedOutcome::Success);
    let accounts = register(&scenario).await;

    let mut sim = SimStorefront::with_accounts(accounts);
    let settled = ScenarioRunner::new(&mut sim, config())
        .run_login(&email.to_lowercase(), &password)
        .await
        .unwrap();

    assert!(matches!(settled, SettledState::Success { .. }));
}

#[tokio::test]
async fn wrong_password_settles_as_validation_error() {
    let identity = IdentityGenerator::new().generate("wrong.pass", &IdentityOptions::default());
    let email = identity.email();
    let scenario = Scenario::new(ScenarioKind::Minimal, identity, ExpectedOutcome::Success);
    let accounts = register(&scenario).await;

    let mut sim = SimStorefront::with_accounts(accounts);
    let settled = ScenarioRunner::new(&mut sim, config())
        .run_login(&email, "Not@TheRight1")
        .await
        .unwrap();

    match settled {
        SettledState::ValidationError { message, .. } => {
            assert!(message.to_lowercase().contains("incorrect"));
        }
        other => panic!("expected a validation error, settled as {other:?}"),
    }
}

#[tokio::test]
async fn login_establishes_a_hardened_session_cookie() {
    let identity = IdentityGenerator::new().generate("cookie.check", &IdentityOptions::default());
    let email = identity.email();
    let password = identity.password.clone();
    let scenario = Scenario::new(ScenarioKind::Minimal, identity, ExpectedOutcome::Success);
    let accounts = register(&scenario).await;

    let mut sim = SimStorefront::with_accounts(accounts);
    let settled = ScenarioRunner::new(&mut sim, config())
        .run_login(&email, &password)
        .await
        .unwrap();
    assert!(matches!(settled, SettledState::Success { .. }));

    let cookies = sim.cookies().await.unwrap();
    let session = cookies
        .iter()
        .find(|c| c.name == "storefront_session")
        .expect("session cookie after login");
    assert!(session.secure);
    assert!(session.http_only);
    assert_eq!(session.same_site.as_deref(), Some("Lax"));
    assert!(session.expires.is_none(), "session cookie must not persist");
}

#[tokio::test]
async fn sessions_are_isolated_between_scenarios() {
    let identity = IdentityGenerator::new().generate("isolated", &IdentityOptions::default());
    let scenario = Scenario::new(ScenarioKind::Minimal, identity, ExpectedOutcome::Success);
    let accounts = register(&scenario).await;

    // A sibling session over the same store starts unauthenticated.
    let mut sibling = SimStorefront::with_accounts(accounts);
    sibling.navigate("http://shop.test/login").await.unwrap();
    assert!(sibling.cookies().await.unwrap().is_empty());
}

#[tokio::test]
async fn search_returns_results_with_ascending_prices() {
    let mut sim = SimStorefront::new();
    let outcome = ScenarioRunner::new(&mut sim, config())
        .run_search("top", Some("price_asc"))
        .await
        .unwrap();

    let verdict = verify_search(&outcome, Some(PriceOrdering::Ascending));
    assert!(verdict.count_nonzero);
    assert_eq!(verdict.prices.len(), outcome.product_count);
    assert_eq!(verdict.ordering_ok, Some(true));
}

#[tokio::test]
async fn search_with_no_matches_settles_with_zero_count() {
    let mut sim = SimStorefront::new();
    let outcome = ScenarioRunner::new(&mut sim, config())
        .run_search("zzzz-no-such-product", None)
        .await
        .unwrap();

    let verdict = verify_search(&outcome, None);
    assert_eq!(verdict.product_count, 0);
    assert!(!verdict.count_nonzero);
    assert_eq!(verdict.ordering_ok, None);
}

#[tokio::test]
async fn concurrent_scenarios_never_collide_on_identity() {
    let store = SimStorefront::new().accounts();
    let generator = IdentityGenerator::new();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let identity = generator.generate("parallel", &IdentityOptions::default());
        let scenario = Scenario::new(ScenarioKind::Minimal, identity, ExpectedOutcome::Success);
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut sim = SimStorefront::with_accounts(store);
            let settled = ScenarioRunner::new(&mut sim, config())
                .run_registration(&scenario)
                .await
                .unwrap();
            (scenario.identity.email(), settled)
        }));
    }

    let mut emails = HashSet::new();
    for handle in handles {
        let (email, settled) = handle.await.unwrap();
        assert!(
            matches!(settled, SettledState::Success { .. }),
            "every independently-keyed scenario must succeed"
        );
        assert!(emails.insert(email), "two scenarios shared an email");
    }
    assert_eq!(store.lock().unwrap().len(), 8);
}

//! Registration scenarios driven end to end against the simulated
//! storefront.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use storecheck_common::{
    ExpectedOutcome, FieldAction, FormField, Gender, IdentityGenerator, IdentityOptions, Scenario,
    ScenarioKind,
};
use storecheck_e2e::pages;
use storecheck_e2e::runner::{run_suite, RunnerConfig, ScenarioRunner, SettledState};
use storecheck_e2e::sim::{SimBehavior, SimStorefront};
use storecheck_e2e::verifier::{verify, OutcomeKind};
use storecheck_e2e::{E2eError, PageDriver};

fn config() -> RunnerConfig {
    RunnerConfig {
        base_url: "http://shop.test".to_string(),
        form_timeout: Duration::from_millis(100),
        settle_timeout: Duration::from_millis(100),
    }
}

fn scenario(kind: ScenarioKind, expected: ExpectedOutcome) -> Scenario {
    let identity = IdentityGenerator::new().generate("reg.test", &IdentityOptions::default());
    Scenario::new(kind, identity, expected)
}

#[tokio::test]
async fn john_doe_registration_succeeds_and_displays_name() {
    let mut identity =
        IdentityGenerator::new().generate("john.doe", &IdentityOptions::default());
    identity.gender = Some(Gender::Male);
    identity.password = "Test@1234".to_string();
    let scenario = Scenario::new(ScenarioKind::Minimal, identity, ExpectedOutcome::Success);

    let mut sim = SimStorefront::new();
    let mut runner = ScenarioRunner::new(&mut sim, config());
    let settled = runner.run_registration(&scenario).await.unwrap();

    match &settled {
        SettledState::Success { displayed_name, .. } => {
            assert_eq!(displayed_name.as_deref(), Some("John Doe"));
        }
        other => panic!("expected success, settled as {other:?}"),
    }

    // A successful settle shows the success indicator and no error
    // indicator.
    assert!(sim.is_visible(pages::account::SUCCESS_BANNER).await.unwrap());
    assert!(!sim.is_visible(pages::account::ERROR_BANNER).await.unwrap());

    let verdict = verify(&settled, &scenario.expected);
    assert!(verdict.matched);
    assert_eq!(verdict.outcome, OutcomeKind::Success);
}

#[tokio::test]
async fn empty_email_shows_exactly_one_error_indicator() {
    let scenario = scenario(
        ScenarioKind::EmptyField {
            field: FormField::Email,
        },
        ExpectedOutcome::ValidationError { message: None },
    );

    let mut sim = SimStorefront::new();
    let mut runner = ScenarioRunner::new(&mut sim, config());
    let settled = runner.run_registration(&scenario).await.unwrap();

    match &settled {
        SettledState::ValidationError { message, .. } => {
            assert!(!message.is_empty(), "error indicator text must be non-empty");
        }
        other => panic!("expected a validation error, settled as {other:?}"),
    }

    assert!(sim.is_visible(pages::signup::ERROR_BANNER).await.unwrap());
    assert!(!sim.is_visible(pages::account::ERROR_BANNER).await.unwrap());
    assert!(!sim.is_visible(pages::login::ERROR_BANNER).await.unwrap());
    assert!(!sim
        .is_visible(pages::account::SUCCESS_BANNER)
        .await
        .unwrap());

    assert!(verify(&settled, &scenario.expected).matched);
}

#[tokio::test]
async fn weak_password_records_one_of_two_recognized_outcomes() {
    // The application's weak-password policy is ambiguous on purpose:
    // either the documented error or a success is acceptable, and the
    // verdict records which branch actually occurred.
    let expected = ExpectedOutcome::AnyOf {
        outcomes: vec![
            ExpectedOutcome::validation_error("passwd is invalid."),
            ExpectedOutcome::Success,
        ],
    };
    let scenario = scenario(ScenarioKind::WeakPassword, expected);

    let mut sim = SimStorefront::new();
    let mut runner = ScenarioRunner::new(&mut sim, config());
    let settled = runner.run_registration(&scenario).await.unwrap();

    let verdict = verify(&settled, &scenario.expected);
    assert!(verdict.matched);
    assert!(matches!(
        verdict.outcome,
        OutcomeKind::Success | OutcomeKind::ValidationError
    ));
}

#[tokio::test]
async fn single_char_names_and_five_char_password_register() {
    let mut identity =
        IdentityGenerator::new().generate("boundary", &IdentityOptions::default());
    identity.first_name = "A".to_string();
    identity.last_name = "B".to_string();
    identity.password = "Aa1@2".to_string();
    let scenario = Scenario::new(ScenarioKind::Minimal, identity, ExpectedOutcome::Success);

    let mut sim = SimStorefront::new();
    let mut runner = ScenarioRunner::new(&mut sim, config());
    let settled = runner.run_registration(&scenario).await.unwrap();

    assert!(matches!(settled, SettledState::Success { .. }));
}

#[tokio::test]
async fn mismatched_confirmation_is_rejected() {
    let scenario = scenario(
        ScenarioKind::MismatchedConfirmation,
        ExpectedOutcome::ValidationError { message: None },
    );

    let mut sim = SimStorefront::new();
    let mut runner = ScenarioRunner::new(&mut sim, config());
    let settled = runner.run_registration(&scenario).await.unwrap();

    assert!(verify(&settled, &scenario.expected).matched);
}

#[tokio::test]
async fn field_override_corrupts_a_single_field() {
    let base = scenario(ScenarioKind::Minimal, ExpectedOutcome::ValidationError {
        message: Some("first name".to_string()),
    });
    let scenario = base.with_override(FormField::FirstName, FieldAction::fill(""));

    let mut sim = SimStorefront::new();
    let mut runner = ScenarioRunner::new(&mut sim, config());
    let settled = runner.run_registration(&scenario).await.unwrap();

    assert!(verify(&settled, &scenario.expected).matched);
}

#[tokio::test]
async fn second_registration_with_same_email_is_rejected() {
    let first = scenario(ScenarioKind::Minimal, ExpectedOutcome::Success);
    let duplicate = Scenario::new(
        ScenarioKind::Minimal,
        first.identity.clone(),
        ExpectedOutcome::validation_error("already exist"),
    );

    let mut sim = SimStorefront::new();
    let accounts = sim.accounts();
    let settled = ScenarioRunner::new(&mut sim, config())
        .run_registration(&first)
        .await
        .unwrap();
    assert!(matches!(settled, SettledState::Success { .. }));

    // Fresh session, same durable store.
    let mut sim = SimStorefront::with_accounts(accounts);
    let settled = ScenarioRunner::new(&mut sim, config())
        .run_registration(&duplicate)
        .await
        .unwrap();
    assert!(verify(&settled, &duplicate.expected).matched);
}

#[tokio::test]
async fn double_submit_creates_exactly_one_account() {
    let scenario = scenario(ScenarioKind::DoubleSubmit, ExpectedOutcome::Success);

    let mut sim = SimStorefront::new();
    let accounts = sim.accounts();
    let settled = ScenarioRunner::new(&mut sim, config())
        .run_registration(&scenario)
        .await
        .unwrap();

    assert!(matches!(settled, SettledState::Success { .. }));
    assert_eq!(accounts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn form_that_never_loads_is_a_navigation_timeout() {
    let scenario = scenario(ScenarioKind::Minimal, ExpectedOutcome::Success);

    let mut sim = SimStorefront::new().with_behavior(SimBehavior {
        offline: true,
        ..Default::default()
    });
    let err = ScenarioRunner::new(&mut sim, config())
        .run_registration(&scenario)
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::NavigationTimeout { .. }));
}

#[tokio::test]
async fn aborted_wait_settles_as_indeterminate() {
    let scenario = scenario(ScenarioKind::Minimal, ExpectedOutcome::Indeterminate);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut sim = SimStorefront::new();
    let settled = ScenarioRunner::new(&mut sim, config())
        .with_cancellation(cancel)
        .run_registration(&scenario)
        .await
        .unwrap();

    assert!(matches!(settled, SettledState::Indeterminate { .. }));
    assert!(verify(&settled, &scenario.expected).matched);
}

#[tokio::test]
async fn swallowed_submission_settles_as_indeterminate_not_an_error() {
    let scenario = scenario(ScenarioKind::Minimal, ExpectedOutcome::Success);

    let mut sim = SimStorefront::new().with_behavior(SimBehavior {
        silent_after_submit: true,
        ..Default::default()
    });
    let settled = ScenarioRunner::new(&mut sim, config())
        .run_registration(&scenario)
        .await
        .unwrap();

    assert!(matches!(settled, SettledState::Indeterminate { .. }));
    let verdict = verify(&settled, &scenario.expected);
    assert!(!verdict.matched);
    assert_eq!(verdict.outcome, OutcomeKind::Indeterminate);
}

#[tokio::test]
async fn redirecting_submission_settles_as_navigated_away() {
    let scenario = scenario(ScenarioKind::Minimal, ExpectedOutcome::Success);

    let mut sim = SimStorefront::new().with_behavior(SimBehavior {
        redirect_after_submit: Some("/unexpected".to_string()),
        ..Default::default()
    });
    let settled = ScenarioRunner::new(&mut sim, config())
        .run_registration(&scenario)
        .await
        .unwrap();

    match settled {
        SettledState::NavigatedAway { url } => assert!(url.ends_with("/unexpected")),
        other => panic!("expected navigated-away, settled as {other:?}"),
    }
}

#[tokio::test]
async fn suite_aggregates_reports_with_session_cookies() {
    let scenarios = vec![
        scenario(ScenarioKind::Minimal, ExpectedOutcome::Success),
        scenario(
            ScenarioKind::EmptyField {
                field: FormField::Email,
            },
            ExpectedOutcome::ValidationError { message: None },
        ),
        scenario(ScenarioKind::WithNewsletter, ExpectedOutcome::Success),
    ];

    let store = SimStorefront::new().accounts();
    let report = run_suite(&scenarios, &config(), || {
        Ok(SimStorefront::with_accounts(store.clone()))
    })
    .await;

    assert_eq!(report.total, 3);
    assert_eq!(report.passed, 3);
    assert_eq!(report.failed, 0);

    // Failure reports must reproduce without rerunning: kind, email and
    // last URL all present.
    for r in &report.scenarios {
        assert!(!r.kind.is_empty());
        assert!(r.email.contains('@'));
        assert!(!r.last_url.is_empty());
    }

    // Registered sessions hold a hardened session cookie.
    let minimal = &report.scenarios[0];
    let cookie = minimal
        .cookies
        .iter()
        .find(|c| c.name == "storefront_session")
        .expect("session cookie after registration");
    assert!(cookie.secure);
    assert!(cookie.http_only);

    let dir = tempfile::tempdir().unwrap();
    let path = report.write(dir.path()).unwrap();
    let json = std::fs::read_to_string(path).unwrap();
    assert!(json.contains("\"passed\": 3"));
}

#[tokio::test]
async fn max_length_and_international_fixtures_register() {
    let scenarios = vec![
        scenario(ScenarioKind::MaxLength, ExpectedOutcome::Success),
        scenario(ScenarioKind::InternationalChars, ExpectedOutcome::Success),
        scenario(ScenarioKind::MultipleSpaces, ExpectedOutcome::Success),
        scenario(ScenarioKind::WithDateOfBirth, ExpectedOutcome::Success),
    ];

    let store = SimStorefront::new().accounts();
    let report = run_suite(&scenarios, &config(), || {
        Ok(SimStorefront::with_accounts(store.clone()))
    })
    .await;

    assert_eq!(report.passed, 4, "failures: {:?}", report.scenarios);
}

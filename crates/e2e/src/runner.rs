//! Scenario runner: a fixed stage machine over one browser session
//!
//! Stages run strictly in sequence within a scenario:
//! `NotStarted -> FormLoaded -> FieldsFilled -> Submitted -> Settled`.
//! Every wait is bounded and abortable; an expired or aborted settle
//! yields `Indeterminate` rather than an error so the caller can assert
//! on the ambiguity explicitly.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use storecheck_common::{build_fixture, FieldAction, FieldValues, FormField, Scenario, ScenarioKind};

use crate::driver::{Cookie, PageDriver};
use crate::error::{E2eError, E2eResult};
use crate::pages;
use crate::verifier::{verify, Verdict};

/// Terminal page state of one scenario execution, before verdict
/// comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SettledState {
    Success {
        url: String,
        displayed_name: Option<String>,
    },
    ValidationError {
        message: String,
        url: String,
    },
    /// The page left the form without showing either indicator.
    NavigatedAway {
        url: String,
    },
    /// Neither indicator appeared within the timeout, or the wait was
    /// aborted.
    Indeterminate {
        url: String,
    },
}

impl SettledState {
    pub fn url(&self) -> &str {
        match self {
            SettledState::Success { url, .. }
            | SettledState::ValidationError { url, .. }
            | SettledState::NavigatedAway { url }
            | SettledState::Indeterminate { url } => url,
        }
    }
}

/// Result of one search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub query: String,
    pub url: String,
    pub product_count: usize,
    pub price_texts: Vec<String>,
}

/// Configuration shared by all scenarios in a run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Storefront base URL, no trailing slash.
    pub base_url: String,

    /// Bounded wait for a form marker after navigation.
    pub form_timeout: Duration,

    /// Bounded wait for the settle race after submission.
    pub settle_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            form_timeout: Duration::from_secs(10),
            settle_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    NotStarted,
    FormLoaded,
    FieldsFilled,
    Submitted,
    Settled,
}

enum WaitOutcome {
    Visible(usize),
    TimedOut,
    Aborted,
}

/// Drives one scenario over one exclusively-owned browser session.
pub struct ScenarioRunner<'d, D: PageDriver> {
    driver: &'d mut D,
    config: RunnerConfig,
    cancel: CancellationToken,
    stage: Stage,
}

impl<'d, D: PageDriver> ScenarioRunner<'d, D> {
    pub fn new(driver: &'d mut D, config: RunnerConfig) -> Self {
        Self {
            driver,
            config,
            cancel: CancellationToken::new(),
            stage: Stage::NotStarted,
        }
    }

    /// Use a caller-held token; cancelling it aborts any in-flight wait
    /// and settles the scenario as `Indeterminate`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn advance(&mut self, from: Stage, to: Stage) -> E2eResult<()> {
        if self.stage != from {
            return Err(E2eError::StageOrder(format!(
                "expected {from:?} before {to:?}, found {:?}",
                self.stage
            )));
        }
        debug!(?from, ?to, "stage transition");
        self.stage = to;
        Ok(())
    }

    /// Race the given selectors against the timeout and the caller's
    /// cancellation token. This is the only wait primitive; the session
    /// stays single-owner because the race is one driver call.
    async fn race(&mut self, selectors: &[&str], timeout: Duration) -> E2eResult<WaitOutcome> {
        let raced = tokio::select! {
            // Abort always wins over a simultaneously-ready wait.
            biased;
            _ = self.cancel.cancelled() => return Ok(WaitOutcome::Aborted),
            raced = self.driver.wait_for_any(selectors, timeout) => raced?,
        };
        Ok(match raced {
            Some(index) => WaitOutcome::Visible(index),
            None => WaitOutcome::TimedOut,
        })
    }

    /// `NotStarted -> FormLoaded`: navigate and wait for the form marker.
    async fn load_form(&mut self, path: &str, marker: &str) -> E2eResult<Option<SettledState>> {
        let url = self.url(path);
        self.driver.navigate(&url).await?;

        match self.race(&[marker], self.config.form_timeout).await? {
            WaitOutcome::Visible(_) => {
                self.advance(Stage::NotStarted, Stage::FormLoaded)?;
                Ok(None)
            }
            WaitOutcome::TimedOut => Err(E2eError::NavigationTimeout {
                url,
                waited_ms: self.config.form_timeout.as_millis() as u64,
            }),
            WaitOutcome::Aborted => Ok(Some(self.settle_indeterminate().await?)),
        }
    }

    /// Apply fixture values in canonical order, skipping `skip` (fields
    /// already consumed by an earlier step).
    async fn fill_fields(&mut self, fixture: &FieldValues, skip: &[FormField]) -> E2eResult<()> {
        for (field, action) in fixture.iter() {
            if skip.contains(&field) {
                continue;
            }
            match (field, action) {
                (FormField::Gender, FieldAction::Check { value }) => {
                    let selector = pages::gender_selector(value.as_deref().unwrap_or("1"));
                    self.driver.check(selector).await?;
                }
                (_, FieldAction::Fill { value }) => {
                    self.driver.fill(pages::field_selector(field), value).await?;
                }
                (_, FieldAction::Check { .. }) => {
                    self.driver.check(pages::field_selector(field)).await?;
                }
                (_, FieldAction::Select { value }) => {
                    self.driver
                        .select_option(pages::field_selector(field), value)
                        .await?;
                }
                (_, FieldAction::Leave) => {}
            }
        }
        self.advance(Stage::FormLoaded, Stage::FieldsFilled)
    }

    /// Trigger submission. Exactly once unless the scenario kind is an
    /// intentional double-submit probe.
    async fn submit(&mut self, selector: &str, times: u32) -> E2eResult<()> {
        self.advance(Stage::FieldsFilled, Stage::Submitted)?;
        for _ in 0..times.max(1) {
            self.driver.click(selector).await?;
        }
        Ok(())
    }

    /// `Submitted -> Settled`: race the success indicator, the error
    /// indicator, and unrelated navigation under one bounded timeout.
    async fn settle(
        &mut self,
        success_selector: &str,
        error_selector: &str,
        submitted_at: &str,
    ) -> E2eResult<SettledState> {
        let raced = self
            .race(&[success_selector, error_selector], self.config.settle_timeout)
            .await?;

        let settled = match raced {
            WaitOutcome::Visible(0) => {
                let url = self.driver.current_url().await?;
                let displayed_name = if self.driver.is_visible(pages::session::LOGGED_IN_AS).await?
                {
                    Some(self.driver.text_of(pages::session::LOGGED_IN_AS).await?)
                } else {
                    None
                };
                SettledState::Success { url, displayed_name }
            }
            WaitOutcome::Visible(_) => {
                let message = self.driver.text_of(error_selector).await?;
                let url = self.driver.current_url().await?;
                SettledState::ValidationError { message, url }
            }
            WaitOutcome::TimedOut => {
                let url = self.driver.current_url().await?;
                if url != submitted_at {
                    SettledState::NavigatedAway { url }
                } else {
                    SettledState::Indeterminate { url }
                }
            }
            WaitOutcome::Aborted => return self.settle_indeterminate().await,
        };

        self.stage = Stage::Settled;
        Ok(settled)
    }

    async fn settle_indeterminate(&mut self) -> E2eResult<SettledState> {
        let url = self.driver.current_url().await.unwrap_or_default();
        self.stage = Stage::Settled;
        Ok(SettledState::Indeterminate { url })
    }

    /// Run a registration scenario to its settled state.
    ///
    /// The storefront splits registration in two: a signup entry taking
    /// name and email, then the full account form. The entry step may
    /// settle early when the application rejects the email before ever
    /// showing the account form.
    pub async fn run_registration(&mut self, scenario: &Scenario) -> E2eResult<SettledState> {
        let mut fixture = build_fixture(&scenario.identity, &scenario.kind);
        for o in &scenario.overrides {
            fixture.set(o.field, o.action.clone());
        }

        debug!(scenario = %scenario.describe(), "starting registration");

        if let Some(settled) = self
            .load_form(pages::signup::URL, pages::signup::FORM_MARKER)
            .await?
        {
            return Ok(settled);
        }

        // Signup entry: name + email, taken from the fixture so email
        // overrides and empty-field forcing apply here.
        let email = fixture.fill_value(FormField::Email).unwrap_or_default();
        self.driver
            .fill(pages::signup::NAME_INPUT, &scenario.identity.first_name)
            .await?;
        self.driver.fill(pages::signup::EMAIL_INPUT, email).await?;
        self.driver.click(pages::signup::SUBMIT).await?;

        let entry_url = self.driver.current_url().await?;
        match self
            .race(
                &[pages::account::FORM_MARKER, pages::signup::ERROR_BANNER],
                self.config.form_timeout,
            )
            .await?
        {
            WaitOutcome::Visible(0) => {}
            WaitOutcome::Visible(_) => {
                let message = self.driver.text_of(pages::signup::ERROR_BANNER).await?;
                let url = self.driver.current_url().await?;
                self.stage = Stage::Settled;
                return Ok(SettledState::ValidationError { message, url });
            }
            WaitOutcome::TimedOut => {
                return Err(E2eError::NavigationTimeout {
                    url: entry_url,
                    waited_ms: self.config.form_timeout.as_millis() as u64,
                })
            }
            WaitOutcome::Aborted => return self.settle_indeterminate().await,
        }

        self.fill_fields(&fixture, &[FormField::Email]).await?;

        let submissions = if scenario.kind == ScenarioKind::DoubleSubmit {
            2
        } else {
            1
        };
        let submitted_at = self.driver.current_url().await?;
        self.submit(pages::account::SUBMIT, submissions).await?;

        self.settle(
            pages::account::SUCCESS_BANNER,
            pages::account::ERROR_BANNER,
            &submitted_at,
        )
        .await
    }

    /// Run a login attempt to its settled state. Email before password,
    /// matching the fixed fill order of registration.
    pub async fn run_login(&mut self, email: &str, password: &str) -> E2eResult<SettledState> {
        if let Some(settled) = self
            .load_form(pages::login::URL, pages::login::FORM_MARKER)
            .await?
        {
            return Ok(settled);
        }

        self.driver.fill(pages::login::EMAIL_INPUT, email).await?;
        self.driver
            .fill(pages::login::PASSWORD_INPUT, password)
            .await?;
        self.advance(Stage::FormLoaded, Stage::FieldsFilled)?;

        let submitted_at = self.driver.current_url().await?;
        self.submit(pages::login::SUBMIT, 1).await?;

        self.settle(
            pages::session::LOGGED_IN_AS,
            pages::login::ERROR_BANNER,
            &submitted_at,
        )
        .await
    }

    /// Run a product search and collect the observable result shape.
    pub async fn run_search(
        &mut self,
        query: &str,
        sort: Option<&str>,
    ) -> E2eResult<SearchOutcome> {
        let path = pages::search_url(query, sort);
        let url = self.url(&path);
        self.driver.navigate(&url).await?;

        match self
            .race(&[pages::search::RESULTS_MARKER], self.config.form_timeout)
            .await?
        {
            WaitOutcome::Visible(_) => {}
            WaitOutcome::TimedOut => {
                return Err(E2eError::NavigationTimeout {
                    url,
                    waited_ms: self.config.form_timeout.as_millis() as u64,
                })
            }
            WaitOutcome::Aborted => {
                return Ok(SearchOutcome {
                    query: query.to_string(),
                    url: self.driver.current_url().await.unwrap_or_default(),
                    product_count: 0,
                    price_texts: Vec::new(),
                })
            }
        }

        let cards = self.driver.text_of_all(pages::search::PRODUCT_CARD).await?;
        let price_texts = self
            .driver
            .text_of_all(pages::search::PRODUCT_PRICE)
            .await?;
        let url = self.driver.current_url().await?;

        Ok(SearchOutcome {
            query: query.to_string(),
            url,
            product_count: cards.len(),
            price_texts,
        })
    }
}

/// Report for one executed scenario. Carries the kind, the generated
/// email, and the last observed URL so failures reproduce without
/// rerunning with extra logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub kind: String,
    pub email: String,
    pub verdict: Option<Verdict>,
    pub last_url: String,
    pub cookies: Vec<Cookie>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Aggregate of one suite run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub generated_at: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub indeterminate: usize,
    pub duration_ms: u64,
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    /// Write the report as pretty JSON under `dir`.
    pub fn write(&self, dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("suite-report.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        info!("Report written to: {}", path.display());
        Ok(path)
    }
}

/// Run a batch of registration scenarios, one fresh session each.
///
/// `new_session` is called once per scenario; the returned driver is
/// exclusively owned by that scenario and dropped afterwards, so
/// concurrent callers never share cookies or storage.
pub async fn run_suite<D, F>(
    scenarios: &[Scenario],
    config: &RunnerConfig,
    mut new_session: F,
) -> SuiteReport
where
    D: PageDriver,
    F: FnMut() -> E2eResult<D>,
{
    let start = Instant::now();
    let mut reports = Vec::new();
    let mut passed = 0;
    let mut failed = 0;
    let mut indeterminate = 0;

    info!("Running {} scenario(s)...", scenarios.len());

    for scenario in scenarios {
        match run_one(scenario, config, &mut new_session).await {
            Ok(report) => {
                let outcome = report.verdict.as_ref().map(|v| v.outcome);
                if outcome == Some(crate::verifier::OutcomeKind::Indeterminate) {
                    indeterminate += 1;
                }
                if report.verdict.as_ref().is_some_and(|v| v.matched) {
                    passed += 1;
                    info!("✓ {} ({} ms)", scenario.describe(), report.duration_ms);
                } else {
                    failed += 1;
                    error!(
                        "✗ {} - expected {:?}, observed {:?}",
                        scenario.describe(),
                        scenario.expected,
                        outcome
                    );
                }
                reports.push(report);
            }
            Err(e) => {
                failed += 1;
                error!("✗ {} - {}", scenario.describe(), e);
                reports.push(ScenarioReport {
                    kind: scenario.kind.to_string(),
                    email: scenario.identity.email(),
                    verdict: None,
                    last_url: String::new(),
                    cookies: Vec::new(),
                    duration_ms: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Scenario results: {} passed, {} failed, {} indeterminate ({} ms)",
        passed, failed, indeterminate, duration_ms
    );

    SuiteReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        total: scenarios.len(),
        passed,
        failed,
        indeterminate,
        duration_ms,
        scenarios: reports,
    }
}

async fn run_one<D, F>(
    scenario: &Scenario,
    config: &RunnerConfig,
    new_session: &mut F,
) -> E2eResult<ScenarioReport>
where
    D: PageDriver,
    F: FnMut() -> E2eResult<D>,
{
    let start = Instant::now();
    let mut driver = new_session()?;

    let settled = {
        let mut runner = ScenarioRunner::new(&mut driver, config.clone());
        match runner.run_registration(scenario).await {
            Ok(settled) => settled,
            Err(e) => {
                let last_url = driver.current_url().await.unwrap_or_default();
                return Err(E2eError::ScenarioFailed {
                    kind: scenario.kind.to_string(),
                    email: scenario.identity.email(),
                    last_url,
                    reason: e.to_string(),
                });
            }
        }
    };

    let verdict = verify(&settled, &scenario.expected);
    let cookies = driver.cookies().await.unwrap_or_default();

    Ok(ScenarioReport {
        kind: scenario.kind.to_string(),
        email: scenario.identity.email(),
        last_url: settled.url().to_string(),
        verdict: Some(verdict),
        cookies,
        duration_ms: start.elapsed().as_millis() as u64,
        error: None,
    })
}

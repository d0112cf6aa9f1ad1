//! In-process simulated storefront
//!
//! A small model of the target application's signup, login, and search
//! surfaces implementing [`PageDriver`], so runner and verifier tests
//! run hermetically with no browser or network. One `SimStorefront` is
//! one browser session; the account store can be shared between
//! sessions to model the application's durable state.
//!
//! The simulation's validation policy mirrors the storefront it stands
//! in for: required fields, password complexity, duplicate emails, and
//! case-insensitive email lookup on login.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{Cookie, DriverError, DriverResult, PageDriver};
use crate::pages::{account, login, search, session, signup};

/// Durable application state shared between sessions.
pub type SharedAccounts = Arc<Mutex<HashMap<String, AccountRecord>>>;

#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Fault knobs for exercising the runner's unhappy paths.
#[derive(Debug, Clone, Default)]
pub struct SimBehavior {
    /// No page ever renders; form markers never appear.
    pub offline: bool,

    /// Submission is swallowed: no banner, no navigation.
    pub silent_after_submit: bool,

    /// Submission navigates to this path with no indicator shown.
    pub redirect_after_submit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Blank,
    Login,
    Account,
    Created,
    Home,
    Products,
    NotFound,
}

const CATALOG: &[(&str, f64)] = &[
    ("Blue Top", 500.0),
    ("Men Tshirt", 400.0),
    ("Sleeveless Dress", 1000.0),
    ("Stylish Dress", 1500.0),
    ("Winter Top", 600.0),
    ("Summer White Top", 400.0),
    ("Fancy Green Top", 700.0),
];

/// One simulated browser session against the storefront model.
pub struct SimStorefront {
    accounts: SharedAccounts,
    behavior: SimBehavior,
    origin: String,
    path: String,
    location: Location,
    signup_error: Option<String>,
    login_error: Option<String>,
    account_error: Option<String>,
    pending_email: String,
    inputs: HashMap<String, String>,
    checked: HashSet<String>,
    selected: HashMap<String, String>,
    logged_in: Option<String>,
    products: Vec<(String, f64)>,
    cookie_seq: u64,
}

impl Default for SimStorefront {
    fn default() -> Self {
        Self::new()
    }
}

impl SimStorefront {
    pub fn new() -> Self {
        Self::with_accounts(Arc::new(Mutex::new(HashMap::new())))
    }

    /// A session sharing another session's durable account store.
    pub fn with_accounts(accounts: SharedAccounts) -> Self {
        Self {
            accounts,
            behavior: SimBehavior::default(),
            origin: String::new(),
            path: String::new(),
            location: Location::Blank,
            signup_error: None,
            login_error: None,
            account_error: None,
            pending_email: String::new(),
            inputs: HashMap::new(),
            checked: HashSet::new(),
            selected: HashMap::new(),
            logged_in: None,
            products: Vec::new(),
            cookie_seq: 0,
        }
    }

    pub fn with_behavior(mut self, behavior: SimBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Handle to the durable store, for starting sibling sessions.
    pub fn accounts(&self) -> SharedAccounts {
        Arc::clone(&self.accounts)
    }

    fn input(&self, selector: &str) -> String {
        self.inputs.get(selector).cloned().unwrap_or_default()
    }

    fn visible(&self, selector: &str) -> bool {
        match selector {
            signup::FORM_MARKER | signup::NAME_INPUT | signup::EMAIL_INPUT | signup::SUBMIT => {
                self.location == Location::Login
            }
            signup::ERROR_BANNER => self.location == Location::Login && self.signup_error.is_some(),
            login::FORM_MARKER | login::EMAIL_INPUT | login::PASSWORD_INPUT | login::SUBMIT => {
                self.location == Location::Login
            }
            login::ERROR_BANNER => self.location == Location::Login && self.login_error.is_some(),
            account::FORM_MARKER
            | account::PASSWORD_INPUT
            | account::CONFIRM_PASSWORD_INPUT
            | account::FIRST_NAME_INPUT
            | account::LAST_NAME_INPUT
            | account::GENDER_MALE
            | account::GENDER_FEMALE
            | account::DAYS_SELECT
            | account::MONTHS_SELECT
            | account::YEARS_SELECT
            | account::NEWSLETTER_CHECKBOX
            | account::SUBMIT => self.location == Location::Account,
            account::SUCCESS_BANNER => self.location == Location::Created,
            account::ERROR_BANNER => {
                self.location == Location::Account && self.account_error.is_some()
            }
            session::LOGGED_IN_AS => self.logged_in.is_some(),
            session::LOGOUT_LINK => self.logged_in.is_some(),
            search::RESULTS_MARKER => self.location == Location::Products,
            _ => false,
        }
    }

    fn reset_page_state(&mut self) {
        self.signup_error = None;
        self.login_error = None;
        self.account_error = None;
        self.inputs.clear();
        self.checked.clear();
        self.selected.clear();
    }

    fn open_products(&mut self, query_string: &str) {
        let mut query = String::new();
        let mut sort = None;
        for pair in query_string.split('&') {
            match pair.split_once('=') {
                Some(("search", v)) => query = decode(v),
                Some((k, v)) if k == search::SORT_PARAM => sort = Some(decode(v)),
                _ => {}
            }
        }

        let needle = query.to_lowercase();
        let mut hits: Vec<(String, f64)> = CATALOG
            .iter()
            .filter(|(name, _)| needle.is_empty() || name.to_lowercase().contains(&needle))
            .map(|(name, price)| (name.to_string(), *price))
            .collect();

        match sort.as_deref() {
            Some("price_asc") => hits.sort_by(|a, b| a.1.total_cmp(&b.1)),
            Some("price_desc") => hits.sort_by(|a, b| b.1.total_cmp(&a.1)),
            _ => {}
        }

        self.products = hits;
        self.location = Location::Products;
    }

    fn submit_signup_entry(&mut self) {
        let name = self.input(signup::NAME_INPUT);
        let email = self.input(signup::EMAIL_INPUT);

        if email.trim().is_empty() {
            self.signup_error = Some("Email is required!".to_string());
            return;
        }
        if name.trim().is_empty() {
            self.signup_error = Some("Name is required!".to_string());
            return;
        }
        if self
            .accounts
            .lock()
            .expect("account store poisoned")
            .contains_key(&email.to_lowercase())
        {
            self.signup_error = Some("Email Address already exist!".to_string());
            return;
        }

        self.pending_email = email;
        self.signup_error = None;
        self.location = Location::Account;
        self.path = "/signup".to_string();
    }

    fn submit_account_form(&mut self) {
        if self.behavior.silent_after_submit {
            return;
        }
        if let Some(path) = self.behavior.redirect_after_submit.clone() {
            self.location = Location::NotFound;
            self.path = path;
            self.account_error = None;
            return;
        }

        let first = self.input(account::FIRST_NAME_INPUT);
        let last = self.input(account::LAST_NAME_INPUT);
        let password = self.input(account::PASSWORD_INPUT);
        let confirm = self.input(account::CONFIRM_PASSWORD_INPUT);

        let error = if first.trim().is_empty() {
            Some("First name is required!")
        } else if last.trim().is_empty() {
            Some("Last name is required!")
        } else if password.is_empty() {
            Some("Password is required!")
        } else if confirm != password {
            Some("Password confirmation does not match!")
        } else if weak_password(&password) {
            Some("Passwd is invalid.")
        } else {
            None
        };

        if let Some(message) = error {
            self.account_error = Some(message.to_string());
            return;
        }

        let display = format!("{} {}", first.trim(), last.trim());
        self.accounts
            .lock()
            .expect("account store poisoned")
            .insert(
                self.pending_email.to_lowercase(),
                AccountRecord {
                    first_name: first,
                    last_name: last,
                    password,
                },
            );
        self.logged_in = Some(display);
        self.cookie_seq += 1;
        self.location = Location::Created;
        self.path = "/account_created".to_string();
    }

    fn submit_login(&mut self) {
        let email = self.input(login::EMAIL_INPUT);
        let password = self.input(login::PASSWORD_INPUT);

        if email.trim().is_empty() || password.is_empty() {
            self.login_error = Some("Email and password are required!".to_string());
            return;
        }

        let record = self
            .accounts
            .lock()
            .expect("account store poisoned")
            .get(&email.to_lowercase())
            .cloned();

        match record {
            Some(account) if account.password == password => {
                self.logged_in = Some(format!(
                    "{} {}",
                    account.first_name.trim(),
                    account.last_name.trim()
                ));
                self.cookie_seq += 1;
                self.login_error = None;
                self.location = Location::Home;
                self.path = "/".to_string();
            }
            _ => {
                self.login_error = Some("Your email or password is incorrect!".to_string());
            }
        }
    }
}

/// The storefront's password policy: at least five characters with
/// upper case, lower case, and a digit.
fn weak_password(password: &str) -> bool {
    password.len() < 5
        || !password.chars().any(|c| c.is_ascii_uppercase())
        || !password.chars().any(|c| c.is_ascii_lowercase())
        || !password.chars().any(|c| c.is_ascii_digit())
}

/// Undo the query-string encoding from `pages::search_url`.
fn decode(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = &s[i + 1..i + 3];
                match u8::from_str_radix(hex, 16) {
                    Ok(b) => {
                        out.push(b);
                        i += 3;
                    }
                    Err(_) => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[async_trait]
impl PageDriver for SimStorefront {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        let (origin, path) = split_url(url)?;
        self.origin = origin;
        self.path = path.clone();
        self.reset_page_state();

        if self.behavior.offline {
            self.location = Location::NotFound;
            return Ok(());
        }

        let (route, query) = match path.split_once('?') {
            Some((r, q)) => (r, q),
            None => (path.as_str(), ""),
        };

        match route {
            "/login" => self.location = Location::Login,
            "/" => self.location = Location::Home,
            r if r == search::URL => self.open_products(query),
            _ => self.location = Location::NotFound,
        }
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> DriverResult<()> {
        if !self.visible(selector) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        self.inputs.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn check(&mut self, selector: &str) -> DriverResult<()> {
        if !self.visible(selector) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        self.checked.insert(selector.to_string());
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> DriverResult<()> {
        // The application ignores a duplicate create-account click once
        // the account exists; the success page keeps the old button in
        // the DOM briefly during transition.
        if selector == account::SUBMIT && self.location == Location::Created {
            return Ok(());
        }
        if !self.visible(selector) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        match selector {
            signup::SUBMIT => self.submit_signup_entry(),
            account::SUBMIT => self.submit_account_form(),
            login::SUBMIT => self.submit_login(),
            _ => {}
        }
        Ok(())
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> DriverResult<()> {
        if !self.visible(selector) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        self.selected.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> DriverResult<bool> {
        if self.visible(selector) {
            return Ok(true);
        }
        // Page state only changes through driver calls; honor the bound,
        // then look once more.
        tokio::time::sleep(timeout).await;
        Ok(self.visible(selector))
    }

    async fn wait_for_any(
        &mut self,
        selectors: &[&str],
        timeout: Duration,
    ) -> DriverResult<Option<usize>> {
        if let Some(index) = selectors.iter().position(|s| self.visible(s)) {
            return Ok(Some(index));
        }
        tokio::time::sleep(timeout).await;
        Ok(selectors.iter().position(|s| self.visible(s)))
    }

    async fn text_of(&mut self, selector: &str) -> DriverResult<String> {
        if !self.visible(selector) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        let text = match selector {
            signup::ERROR_BANNER => self.signup_error.clone().unwrap_or_default(),
            login::ERROR_BANNER => self.login_error.clone().unwrap_or_default(),
            account::ERROR_BANNER => self.account_error.clone().unwrap_or_default(),
            account::SUCCESS_BANNER => "Account Created!".to_string(),
            session::LOGGED_IN_AS => self.logged_in.clone().unwrap_or_default(),
            _ => String::new(),
        };
        Ok(text)
    }

    async fn text_of_all(&mut self, selector: &str) -> DriverResult<Vec<String>> {
        if self.location != Location::Products {
            return Ok(Vec::new());
        }
        let texts = match selector {
            search::PRODUCT_CARD => self.products.iter().map(|(name, _)| name.clone()).collect(),
            search::PRODUCT_PRICE => self
                .products
                .iter()
                .map(|(_, price)| format!("Rs. {price}"))
                .collect(),
            _ => Vec::new(),
        };
        Ok(texts)
    }

    async fn is_visible(&mut self, selector: &str) -> DriverResult<bool> {
        Ok(self.visible(selector))
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        Ok(format!("{}{}", self.origin, self.path))
    }

    async fn cookies(&mut self) -> DriverResult<Vec<Cookie>> {
        if self.logged_in.is_none() {
            return Ok(Vec::new());
        }
        Ok(vec![Cookie {
            name: "storefront_session".to_string(),
            value: format!("sim-{:08x}", self.cookie_seq),
            secure: true,
            http_only: true,
            same_site: Some("Lax".to_string()),
            expires: None,
        }])
    }
}

fn split_url(url: &str) -> DriverResult<(String, String)> {
    if let Some(scheme_end) = url.find("://") {
        let after = &url[scheme_end + 3..];
        match after.find('/') {
            Some(slash) => {
                let origin = url[..scheme_end + 3 + slash].to_string();
                let path = url[scheme_end + 3 + slash..].to_string();
                Ok((origin, path))
            }
            None => Ok((url.to_string(), "/".to_string())),
        }
    } else if url.starts_with('/') {
        Ok((String::new(), url.to_string()))
    } else {
        Err(DriverError::Navigation(format!("unparseable url: {url}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn form_elements_gate_on_location() {
        let mut sim = SimStorefront::new();
        assert!(!sim.is_visible(signup::FORM_MARKER).await.unwrap());

        sim.navigate("http://shop.test/login").await.unwrap();
        assert!(sim.is_visible(signup::FORM_MARKER).await.unwrap());
        assert!(sim.is_visible(login::FORM_MARKER).await.unwrap());
        assert!(!sim.is_visible(account::FORM_MARKER).await.unwrap());
    }

    #[tokio::test]
    async fn filling_a_hidden_input_is_an_element_error() {
        let mut sim = SimStorefront::new();
        sim.navigate("http://shop.test/login").await.unwrap();
        let err = sim.fill(account::PASSWORD_INPUT, "x").await.unwrap_err();
        assert!(matches!(err, DriverError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_at_the_entry_step() {
        let mut sim = SimStorefront::new();
        sim.accounts.lock().unwrap().insert(
            "taken@example.com".to_string(),
            AccountRecord {
                first_name: "Already".into(),
                last_name: "There".into(),
                password: "Aa1@abc".into(),
            },
        );

        sim.navigate("http://shop.test/login").await.unwrap();
        sim.fill(signup::NAME_INPUT, "Dup").await.unwrap();
        sim.fill(signup::EMAIL_INPUT, "Taken@Example.com").await.unwrap();
        sim.click(signup::SUBMIT).await.unwrap();

        assert!(sim.is_visible(signup::ERROR_BANNER).await.unwrap());
        let message = sim.text_of(signup::ERROR_BANNER).await.unwrap();
        assert!(message.contains("already exist"));
    }

    #[tokio::test]
    async fn search_filters_and_sorts_the_catalog() {
        let mut sim = SimStorefront::new();
        sim.navigate("http://shop.test/products?search=top&sort=price_asc")
            .await
            .unwrap();
        let prices = sim.text_of_all(search::PRODUCT_PRICE).await.unwrap();
        assert!(!prices.is_empty());
        let values: Vec<f64> = prices
            .iter()
            .map(|p| p.trim_start_matches("Rs. ").parse().unwrap())
            .collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn query_decoding_round_trips() {
        assert_eq!(decode("blue+top"), "blue top");
        assert_eq!(decode("caf%C3%A9"), "café");
    }
}

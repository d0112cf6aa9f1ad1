//! Selector and URL registry for the storefront under test
//!
//! All knowledge about the target application's DOM lives here, so a
//! different deployment only needs to re-point these constants.

use storecheck_common::FormField;

/// Signup entry block on the combined login/signup page. Takes a name
/// and an email to begin account creation.
pub mod signup {
    pub const URL: &str = "/login";
    pub const FORM_MARKER: &str = "[data-qa='signup-form']";
    pub const NAME_INPUT: &str = "[data-qa='signup-name']";
    pub const EMAIL_INPUT: &str = "[data-qa='signup-email']";
    pub const SUBMIT: &str = "[data-qa='signup-button']";
    pub const ERROR_BANNER: &str = "[data-qa='signup-error']";
}

/// Full account-creation form shown after the signup entry step.
pub mod account {
    pub const FORM_MARKER: &str = "[data-qa='account-form']";
    pub const GENDER_MALE: &str = "#id_gender1";
    pub const GENDER_FEMALE: &str = "#id_gender2";
    pub const PASSWORD_INPUT: &str = "[data-qa='password']";
    pub const CONFIRM_PASSWORD_INPUT: &str = "[data-qa='confirm-password']";
    pub const FIRST_NAME_INPUT: &str = "[data-qa='first_name']";
    pub const LAST_NAME_INPUT: &str = "[data-qa='last_name']";
    pub const DAYS_SELECT: &str = "[data-qa='days']";
    pub const MONTHS_SELECT: &str = "[data-qa='months']";
    pub const YEARS_SELECT: &str = "[data-qa='years']";
    pub const NEWSLETTER_CHECKBOX: &str = "#newsletter";
    pub const SUBMIT: &str = "[data-qa='create-account']";
    pub const SUCCESS_BANNER: &str = "[data-qa='account-created']";
    pub const ERROR_BANNER: &str = "[data-qa='account-error']";
}

/// Login block on the combined login/signup page.
pub mod login {
    pub const URL: &str = "/login";
    pub const FORM_MARKER: &str = "[data-qa='login-form']";
    pub const EMAIL_INPUT: &str = "[data-qa='login-email']";
    pub const PASSWORD_INPUT: &str = "[data-qa='login-password']";
    pub const SUBMIT: &str = "[data-qa='login-button']";
    pub const ERROR_BANNER: &str = "[data-qa='login-error']";
}

/// Elements present once a session is established.
pub mod session {
    pub const LOGGED_IN_AS: &str = "[data-qa='logged-in-as']";
    pub const LOGOUT_LINK: &str = "a[href='/logout']";
}

/// Product search surface.
pub mod search {
    pub const URL: &str = "/products";
    pub const QUERY_INPUT: &str = "#search_product";
    pub const SUBMIT: &str = "#submit_search";
    pub const RESULTS_MARKER: &str = ".features_items";
    pub const PRODUCT_CARD: &str = ".product-image-wrapper";
    pub const PRODUCT_PRICE: &str = ".productinfo .price";
    /// Query parameter the storefront accepts for result ordering.
    pub const SORT_PARAM: &str = "sort";
}

/// Selector for a text/select/checkbox form field on the account form.
///
/// Gender is a radio group; its member is chosen by value, see
/// [`gender_selector`].
pub fn field_selector(field: FormField) -> &'static str {
    match field {
        // The account form inherits the email typed at the signup entry;
        // the entry input is the one the fixture fills.
        FormField::Email => signup::EMAIL_INPUT,
        FormField::Password => account::PASSWORD_INPUT,
        FormField::ConfirmPassword => account::CONFIRM_PASSWORD_INPUT,
        FormField::FirstName => account::FIRST_NAME_INPUT,
        FormField::LastName => account::LAST_NAME_INPUT,
        FormField::Gender => account::GENDER_MALE,
        FormField::BirthDay => account::DAYS_SELECT,
        FormField::BirthMonth => account::MONTHS_SELECT,
        FormField::BirthYear => account::YEARS_SELECT,
        FormField::Newsletter => account::NEWSLETTER_CHECKBOX,
    }
}

/// Radio member for a gender form value ("1" = male, "2" = female).
pub fn gender_selector(value: &str) -> &'static str {
    match value {
        "2" => account::GENDER_FEMALE,
        _ => account::GENDER_MALE,
    }
}

/// Search URL for a query and optional sort order, relative to base.
pub fn search_url(query: &str, sort: Option<&str>) -> String {
    let mut url = format!("{}?search={}", search::URL, urlencode(query));
    if let Some(sort) = sort {
        url.push('&');
        url.push_str(search::SORT_PARAM);
        url.push('=');
        url.push_str(sort);
    }
    url
}

/// Minimal percent-encoding for query strings; everything the harness
/// sends is short free text.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_query_and_sort() {
        assert_eq!(search_url("blue top", None), "/products?search=blue+top");
        assert_eq!(
            search_url("tee", Some("price_asc")),
            "/products?search=tee&sort=price_asc"
        );
    }

    #[test]
    fn gender_selectors_map_form_values() {
        assert_eq!(gender_selector("1"), account::GENDER_MALE);
        assert_eq!(gender_selector("2"), account::GENDER_FEMALE);
    }
}

use std::collections::BTreeMap;

use garde::Validate;
use serde::Deserialize;

/// The key of messages that belong to no single field.
pub const GENERIC: &str = "generic";

/// Field-level validation messages shown next to form inputs.
#[derive(Debug, Clone, Default)]
pub struct FormErrors {
    messages: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.messages
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Returns the messages for `field` joined into one line, or an empty string.
    pub fn get(&self, field: &str) -> String {
        self.messages
            .get(field)
            .map(|messages| messages.join(" "))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Collects the messages of a garde report, keyed by field path.
    pub fn from_report(report: &garde::Report) -> Self {
        let mut errors = Self::new();
        for (path, error) in report.iter() {
            let field = path.to_string();
            let field = if field.is_empty() { GENERIC } else { field.as_str() };
            errors.add(field, error.message());
        }
        errors
    }
}

/// Validates a username.
///
/// # Arguments
///
/// * `username` - The username to validate.
/// * `_ctx` - Unused validation context.
///
/// # Returns
///
/// A `garde::Result` indicating whether the username is valid.
pub fn validate_username(username: &str, _ctx: &()) -> garde::Result {
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(garde::Error::new(
            "Username can only contain letters, numbers, underscores, and hyphens",
        ));
    }
    Ok(())
}

/// Validates a password.
///
/// # Arguments
///
/// * `password` - The password to validate.
/// * `_ctx` - Unused validation context.
///
/// # Returns
///
/// A `garde::Result` indicating whether the password is valid.
pub fn validate_password(password: &str, _ctx: &()) -> garde::Result {
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(garde::Error::new(
            "Password must contain at least one letter and one digit",
        ));
    }
    Ok(())
}

/// The login form posted from the front page.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[garde(length(min = 1, max = 255))]
    #[serde(default)]
    pub username: String,

    #[garde(length(min = 1, max = 128))]
    #[serde(default)]
    pub password: String,

    #[garde(skip)]
    #[serde(rename = "_csrf", default)]
    pub csrf: String,
}

/// The signup form posted from the front page.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SignupForm {
    #[garde(length(min = 3, max = 255), custom(validate_username))]
    #[serde(default)]
    pub username: String,

    #[garde(email)]
    #[serde(default)]
    pub email: String,

    #[garde(length(min = 8, max = 128), custom(validate_password))]
    #[serde(default)]
    pub password: String,

    #[garde(length(min = 1, max = 255))]
    #[serde(default)]
    pub first_name: String,

    #[garde(length(max = 255))]
    #[serde(default)]
    pub middle_name: String,

    #[garde(length(max = 255))]
    #[serde(default)]
    pub last_name: String,

    #[garde(skip)]
    #[serde(rename = "_csrf", default)]
    pub csrf: String,
}

impl SignupForm {
    /// Runs the field validators.
    pub fn check(&self) -> FormErrors {
        match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(report) => FormErrors::from_report(&report),
        }
    }
}

impl LoginForm {
    pub fn check(&self) -> FormErrors {
        match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(report) => FormErrors::from_report(&report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> SignupForm {
        SignupForm {
            username: "loveless".into(),
            email: "loveless@example.com".into(),
            password: "hunter22".into(),
            first_name: "Love".into(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_signup_has_no_errors() {
        assert!(signup().check().is_empty());
    }

    #[test]
    fn signup_errors_are_keyed_by_field() {
        let form = SignupForm {
            username: "a b".into(),
            email: "not-an-email".into(),
            password: "short".into(),
            ..signup()
        };

        let errors = form.check();

        assert!(!errors.get("username").is_empty());
        assert!(!errors.get("email").is_empty());
        assert!(!errors.get("password").is_empty());
        assert!(errors.get("first_name").is_empty());
    }

    #[test]
    fn password_needs_letters_and_digits() {
        assert!(validate_password("hunter22", &()).is_ok());
        assert!(validate_password("12345678", &()).is_err());
        assert!(validate_password("abcdefgh", &()).is_err());
    }

    #[test]
    fn empty_login_is_rejected() {
        let errors = LoginForm::default().check();
        assert!(!errors.get("username").is_empty());
        assert!(!errors.get("password").is_empty());
    }

    #[test]
    fn generic_messages_collect() {
        let mut errors = FormErrors::new();
        errors.add(GENERIC, "Please Try Again.");
        errors.add(GENERIC, "Really.");
        assert_eq!(errors.get(GENERIC), "Please Try Again. Really.");
    }
}

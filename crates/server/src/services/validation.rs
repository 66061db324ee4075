//! Input validation for user and store forms.
//!
//! Each check pushes a human-readable message; callers return all messages at
//! once as `DomainError::Validation`.

use std::ops::RangeInclusive;

use storerate_core::Email;

use super::DomainError;

/// Allowed length of a user's name, in characters.
pub const USER_NAME_LENGTH: RangeInclusive<usize> = 6..=60;
/// Allowed length of a store's name, in characters.
pub const STORE_NAME_LENGTH: RangeInclusive<usize> = 20..=60;
/// Maximum length of a postal address, in characters.
pub const MAX_ADDRESS_LENGTH: usize = 400;
/// Allowed length of a password, in characters.
pub const PASSWORD_LENGTH: RangeInclusive<usize> = 8..=16;

const PASSWORD_SPECIALS: &[char] = &['!', '@', '#', '$', '%', '^', '&', '*'];

pub const INVALID_EMAIL: &str = "Please provide a valid email address";
pub const INVALID_PASSWORD: &str =
    "Password must be 8-16 characters with at least one uppercase letter and one special character";

/// Collects validation failures.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a user's display name. Names are stored trimmed, so the trimmed
    /// length is what counts.
    pub fn user_name(&mut self, name: &str) -> &mut Self {
        if !USER_NAME_LENGTH.contains(&name.trim().chars().count()) {
            self.errors.push(format!(
                "Name must be between {} and {} characters",
                USER_NAME_LENGTH.start(),
                USER_NAME_LENGTH.end()
            ));
        }
        self
    }

    /// Check a store's name.
    pub fn store_name(&mut self, name: &str) -> &mut Self {
        if !STORE_NAME_LENGTH.contains(&name.trim().chars().count()) {
            self.errors.push(format!(
                "Store name must be between {} and {} characters",
                STORE_NAME_LENGTH.start(),
                STORE_NAME_LENGTH.end()
            ));
        }
        self
    }

    /// Check a postal address: required and bounded.
    pub fn address(&mut self, address: &str) -> &mut Self {
        let address = address.trim();
        if address.is_empty() || address.chars().count() > MAX_ADDRESS_LENGTH {
            self.errors.push(format!(
                "Address is required and must not exceed {MAX_ADDRESS_LENGTH} characters"
            ));
        }
        self
    }

    /// Parse an email, recording a failure if it is invalid.
    pub fn email(&mut self, raw: &str) -> Option<Email> {
        match Email::parse(raw.trim()) {
            Ok(email) => Some(email),
            Err(_) => {
                self.errors.push(INVALID_EMAIL.to_string());
                None
            }
        }
    }

    /// Check a new password against the password policy.
    pub fn password(&mut self, password: &str) -> &mut Self {
        if !password_meets_policy(password) {
            self.errors.push(INVALID_PASSWORD.to_string());
        }
        self
    }

    /// Whether any check failed so far.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Finish validation, returning the raw messages on failure.
    ///
    /// # Errors
    ///
    /// Returns every recorded message if any check failed.
    pub fn into_result(self) -> Result<(), Vec<String>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// Finish validation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` with every recorded message.
    pub fn finish(self) -> Result<(), DomainError> {
        self.into_result().map_err(DomainError::Validation)
    }
}

/// 8-16 characters from `[A-Za-z0-9!@#$%^&*]`, with at least one uppercase
/// letter and one of `!@#$%^&*`.
#[must_use]
pub fn password_meets_policy(password: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(&c);
    PASSWORD_LENGTH.contains(&password.chars().count())
        && password.chars().all(allowed)
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(&c))
}

//! Email addresses for user accounts and store contacts.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was rejected as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    /// Not of the form `local@domain.tld`.
    #[error("email is malformed: {0}")]
    Malformed(&'static str),
}

/// A syntactically valid email address, stored lowercased.
///
/// Both users and stores are unique by email, so addresses are normalized
/// on parse: `Jo@Example.COM` and `jo@example.com` are the same account.
/// The domain must contain a dot with text on both sides.
///
/// ```
/// use storerate_core::Email;
///
/// let email = Email::parse("Owner@Corner-Shop.example").unwrap();
/// assert_eq!(email.as_str(), "owner@corner-shop.example");
/// assert!(Email::parse("owner@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Column width of the email columns (RFC 5321 limit).
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize an address. Surrounding whitespace is not
    /// trimmed; callers trim form input first.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` if the input is empty, longer than
    /// [`Self::MAX_LENGTH`], or not of the form `local@domain.tld`.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Malformed("contains whitespace"));
        }

        let (local, domain) = s
            .split_once('@')
            .ok_or(EmailError::Malformed("missing @"))?;
        if local.is_empty() {
            return Err(EmailError::Malformed("nothing before @"));
        }
        if domain.contains('@') {
            return Err(EmailError::Malformed("more than one @"));
        }
        let has_tld = domain
            .rsplit_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty());
        if !has_tld {
            return Err(EmailError::Malformed("domain needs a dot"));
        }

        Ok(Self(s.to_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_common_addresses() {
        for raw in [
            "rater@example.com",
            "first.last+stores@mail.example.co.uk",
            "a@b.c",
        ] {
            assert!(Email::parse(raw).is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_parse_normalizes_case() {
        let email = Email::parse("Jo.Owner@Example.COM").unwrap();
        assert_eq!(email.as_str(), "jo.owner@example.com");
        assert_eq!(email, Email::parse("jo.owner@example.com").unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        for raw in [
            "no-at-symbol",
            "@example.com",
            "user@",
            "a@b@example.com",
            "us er@example.com",
            "user@localhost",
            "user@.com",
            "user@example.",
        ] {
            assert!(
                matches!(Email::parse(raw), Err(EmailError::Malformed(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: 254 })
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let email: Email = serde_json::from_str("\"Store@Example.com\"").unwrap();
        assert_eq!(email.to_string(), "store@example.com");
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}

//! Business logic services.
//!
//! # Services
//!
//! - [`ownership`] - Store create/update/delete and the role changes they imply
//! - [`ledger`] - Rating submission, edits and per-store statistics
//! - [`catalog`] - User and store directory reads and admin user edits
//! - [`auth`] - Registration, login and password changes
//! - [`validation`] - Form field checks
//!
//! Services borrow the pool and open their own transactions; handlers never
//! write to the database directly.

pub mod auth;
pub mod catalog;
pub mod ledger;
pub mod ownership;
pub mod validation;

use thiserror::Error;

use storerate_core::RatingValueError;

use crate::db::RepositoryError;
use ownership::RoleConflict;

/// Errors returned by the domain services.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller has no rights over the target entity.
    #[error("{0}")]
    Forbidden(&'static str),

    /// The user has already rated this store.
    #[error("you have already rated this store; update your rating instead")]
    DuplicateRating,

    /// Another user or store already uses this email.
    #[error("email is already in use")]
    DuplicateEmail,

    /// The rating is not an integer between 1 and 5.
    #[error("invalid rating: {0}")]
    InvalidValue(#[from] RatingValueError),

    /// The requested role contradicts the user's ownership status.
    #[error("invalid role: {0}")]
    InvalidRole(#[from] RoleConflict),

    /// The user chosen as owner already owns another store.
    #[error("user already owns a store")]
    OwnerAlreadyAssigned,

    /// One or more form fields failed validation.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Persistence failure.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for DomainError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(DomainError::NotFound("store").to_string(), "store not found");
        assert_eq!(
            DomainError::Validation(vec!["a".into(), "b".into()]).to_string(),
            "validation failed: a; b"
        );
        let err: DomainError = RatingValueError::NotANumber.into();
        assert_eq!(err.to_string(), "invalid rating: rating must be a number");
    }
}

//! Authentication service.
//!
//! Password accounts with argon2 hashes. Sessions only carry the user ID; see
//! [`crate::middleware::auth`] for how requests are authenticated.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use storerate_core::{Email, Role, UserId};

use super::ownership::resolve_manual_role;
use super::validation::{INVALID_EMAIL, Validator};
use crate::db::users::{self, NewUserRecord};
use crate::db::USER_EMAIL_KEY;
use crate::models::User;

/// Fields for a new account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Self-service registration. New accounts always get `USER`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if any field is invalid.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, account: NewAccount) -> Result<User, AuthError> {
        self.create_account(account, Role::User).await
    }

    /// Create an account with a chosen role (admin only).
    ///
    /// `STORE_OWNER` is rejected: a new account owns no store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if any field is invalid.
    /// Returns `AuthError::InvalidRole` for `STORE_OWNER`.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, account), fields(role = %role))]
    pub async fn create_account(&self, account: NewAccount, role: Role) -> Result<User, AuthError> {
        let role = resolve_manual_role(role, false)?;

        let mut v = Validator::new();
        v.user_name(&account.name)
            .address(&account.address)
            .password(&account.password);
        let email = v.email(&account.email);
        v.into_result().map_err(AuthError::Validation)?;
        let email = email.ok_or_else(|| AuthError::Validation(vec![INVALID_EMAIL.into()]))?;

        let password_hash = hash_password(&account.password)?;

        let user = users::create(
            self.pool,
            NewUserRecord {
                name: account.name.trim(),
                email: &email,
                password_hash: &password_hash,
                address: account.address.trim(),
                role,
            },
        )
        .await
        .map_err(|e| {
            if e.is_conflict_on(USER_EMAIL_KEY) {
                AuthError::UserAlreadyExists
            } else {
                AuthError::Repository(e)
            }
        })?;

        tracing::info!(user_id = %user.id, "account created");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email.trim()).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = users::get_with_password_by_email(self.pool, &email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Change a user's password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong.
    /// Returns `AuthError::Validation` if `new` fails the password policy.
    #[instrument(skip(self, current, new), fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let mut v = Validator::new();
        v.password(new);
        v.into_result().map_err(AuthError::Validation)?;

        let existing = users::get_password_hash(self.pool, user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(current, &existing)?;

        let password_hash = hash_password(new)?;
        users::set_password_hash(self.pool, user_id, &password_hash).await?;

        tracing::info!("password changed");
        Ok(())
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Secret#12").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Secret#12", &hash).is_ok());
        assert!(matches!(
            verify_password("Secret#13", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("Secret#12").unwrap();
        let b = hash_password("Secret#12").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("Secret#12", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}

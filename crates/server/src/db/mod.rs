//! Database operations for the `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `app_user` - Accounts with their role and password hash
//! - `store` - Rated stores, each with at most one owner
//! - `rating` - One row per (user, store) pair
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! Functions take any `PgExecutor`, so the same query runs against the pool
//! or inside a service's transaction.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p storerate-cli -- migrate
//! ```

pub mod ratings;
pub mod stores;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Unique constraint on `app_user.email`.
pub const USER_EMAIL_KEY: &str = "app_user_email_key";
/// Unique constraint on `store.email`.
pub const STORE_EMAIL_KEY: &str = "store_email_key";
/// Unique constraint on `store.owner_id`.
pub const STORE_OWNER_KEY: &str = "store_owner_id_key";
/// Unique constraint on `rating (user_id, store_id)`.
pub const RATING_USER_STORE_KEY: &str = "rating_user_id_store_id_key";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation; carries the constraint name.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether this is a violation of the named unique constraint.
    #[must_use]
    pub fn is_conflict_on(&self, constraint: &str) -> bool {
        matches!(self, Self::Conflict(name) if name == constraint)
    }
}

/// Map unique violations to `RepositoryError::Conflict`, everything else to
/// `RepositoryError::Database`.
pub(crate) fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let constraint = db_err.constraint().unwrap_or("unknown").to_owned();
        return RepositoryError::Conflict(constraint);
    }
    RepositoryError::Database(e)
}

/// `ILIKE` pattern matching `text` anywhere, with `%`, `_` and `\` in the
/// search text taken literally.
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

//! Integration test helpers for Storerate.
//!
//! # Running Tests
//!
//! ```bash
//! export TEST_DATABASE_URL=postgres://localhost/storerate_test
//! cargo test -p storerate-integration-tests -- --ignored
//! ```
//!
//! Migrations are applied on connect. Every helper generates unique emails,
//! so tests can share one database and run in parallel without cleanup.

use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use storerate_core::{Role, UserId};
use storerate_server::config::ServerConfig;
use storerate_server::db::users;
use storerate_server::models::{Store, User};
use storerate_server::services::auth::{AuthService, NewAccount};
use storerate_server::services::ownership::{AdminOwnershipPolicy, NewStore, OwnershipManager};
use storerate_server::state::AppState;

/// Password used by every test account.
pub const TEST_PASSWORD: &str = "Test#Pass1";

/// Connect to `TEST_DATABASE_URL` and apply migrations.
///
/// # Panics
///
/// Panics if the variable is unset or the database is unreachable.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = PgPool::connect(&url)
        .await
        .expect("failed to connect to test database");
    sqlx::migrate!("../server/migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");
    pool
}

/// A unique email address.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@storerate.test", Uuid::new_v4().simple())
}

/// A store name that passes validation and is unique enough to search for.
#[must_use]
pub fn unique_store_name() -> String {
    format!("Test Store {}", Uuid::new_v4().simple())
}

/// Create an account with the given role.
///
/// `STORE_OWNER` cannot be created directly; use [`create_store`] with an owner.
///
/// # Panics
///
/// Panics if the account cannot be created.
pub async fn create_user(pool: &PgPool, role: Role) -> User {
    AuthService::new(pool)
        .create_account(
            NewAccount {
                name: "Integration Tester".to_owned(),
                email: unique_email("user"),
                password: TEST_PASSWORD.to_owned(),
                address: "1 Test Street".to_owned(),
            },
            role,
        )
        .await
        .expect("failed to create user")
}

/// Create a store, optionally owned.
///
/// # Panics
///
/// Panics if the store cannot be created.
pub async fn create_store(pool: &PgPool, owner: Option<UserId>) -> Store {
    OwnershipManager::new(pool, AdminOwnershipPolicy::Preserve)
        .create_store(NewStore {
            name: unique_store_name(),
            email: unique_email("store"),
            address: "2 Market Street".to_owned(),
            owner_id: owner,
        })
        .await
        .expect("failed to create store")
}

/// Current role of a user.
///
/// # Panics
///
/// Panics if the user does not exist.
pub async fn role_of(pool: &PgPool, id: UserId) -> Role {
    users::get_by_id(pool, id)
        .await
        .expect("query failed")
        .expect("user not found")
        .role
}

/// Application state over `pool` with a fixed test configuration.
#[must_use]
pub fn test_state(pool: PgPool) -> AppState {
    let config = ServerConfig {
        database_url: SecretString::from("postgres://unused"),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        base_url: "http://localhost:5173".to_owned(),
        session_secret: SecretString::from("integration-test-session-secret-value-0123456789"),
        admin_policy: AdminOwnershipPolicy::Preserve,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    };
    AppState::new(config, pool)
}

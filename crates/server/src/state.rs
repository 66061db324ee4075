//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::auth::AuthService;
use crate::services::catalog::Catalog;
use crate::services::ledger::RatingLedger;
use crate::services::ownership::{AdminOwnershipPolicy, OwnershipManager};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Services borrow the pool from here for the
/// duration of a request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pool }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// How ownership changes treat administrators.
    #[must_use]
    pub fn admin_policy(&self) -> AdminOwnershipPolicy {
        self.inner.config.admin_policy
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.pool())
    }

    #[must_use]
    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self.pool())
    }

    #[must_use]
    pub fn ledger(&self) -> RatingLedger<'_> {
        RatingLedger::new(self.pool())
    }

    #[must_use]
    pub fn ownership(&self) -> OwnershipManager<'_> {
        OwnershipManager::new(self.pool(), self.admin_policy())
    }
}

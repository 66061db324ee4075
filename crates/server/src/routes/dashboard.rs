//! Dashboard handlers.

use axum::{Json, extract::State};
use serde::Serialize;

use storerate_core::{AverageRating, RatingStats, Role};

use crate::db::{ratings, stores, users};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireStoreOwner};
use crate::models::{RatingWithStore, RatingWithUser, Store};
use crate::state::AppState;

/// Ratings shown in the "recent activity" panels.
const RECENT_RATINGS: i64 = 5;

/// User counts per role. Roles without users count as zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct UsersByRole {
    pub admin: i64,
    pub user: i64,
    pub store_owner: i64,
}

impl FromIterator<(Role, i64)> for UsersByRole {
    fn from_iter<T: IntoIterator<Item = (Role, i64)>>(iter: T) -> Self {
        let mut counts = Self::default();
        for (role, n) in iter {
            match role {
                Role::Admin => counts.admin += n,
                Role::User => counts.user += n,
                Role::StoreOwner => counts.store_owner += n,
            }
        }
        counts
    }
}

/// Platform overview for administrators.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub total_users: i64,
    pub total_stores: i64,
    pub total_ratings: i64,
    pub users_by_role: UsersByRole,
    /// Mean of every rating on the platform.
    pub average_rating: AverageRating,
    pub recent_ratings: Vec<RatingWithStore>,
}

/// Feedback overview for a store owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOwnerDashboard {
    pub store: Store,
    pub statistics: RatingStats,
    pub recent_ratings: Vec<RatingWithUser>,
    /// Every user who rated the store, with their rating.
    pub raters: Vec<RatingWithUser>,
}

/// GET /api/dashboard/admin
pub async fn admin(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<AdminDashboard>> {
    let pool = state.pool();

    let total_users = users::count(pool).await?;
    let total_stores = stores::count(pool).await?;
    let total_ratings = ratings::count(pool).await?;
    let users_by_role = users::count_by_role(pool).await?.into_iter().collect();
    let average_rating = RatingStats::from_counts(ratings::value_counts(pool).await?).average_rating;
    let recent_ratings = state.ledger().recent(Some(RECENT_RATINGS)).await?;

    Ok(Json(AdminDashboard {
        total_users,
        total_stores,
        total_ratings,
        users_by_role,
        average_rating,
        recent_ratings,
    }))
}

/// GET /api/dashboard/store-owner
pub async fn store_owner(
    State(state): State<AppState>,
    RequireStoreOwner(owner): RequireStoreOwner,
) -> Result<Json<StoreOwnerDashboard>> {
    let store = stores::get_by_owner(state.pool(), owner.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No store is assigned to you".to_string()))?;

    let ledger = state.ledger();
    let raters = ledger.ratings_for_store(store.id).await?;
    let statistics = raters.iter().map(|r| r.rating.value).collect();
    let recent_ratings = raters
        .iter()
        .take(usize::try_from(RECENT_RATINGS).unwrap_or_default())
        .cloned()
        .collect();

    Ok(Json(StoreOwnerDashboard {
        store,
        statistics,
        recent_ratings,
        raters,
    }))
}

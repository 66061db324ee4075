//! Store directory and admin store management handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use storerate_core::{RatingStats, StoreId};

use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAdmin, RequireAuth};
use crate::models::{Store, StoreDetail, StoreListing};
use crate::services::catalog::StoreQuery;
use crate::services::ownership::{NewStore, StoreChanges};
use crate::state::AppState;

/// GET /api/stores
///
/// Signed-in callers also get their own rating of each store.
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Query(query): Query<StoreQuery>,
) -> Result<Json<Vec<StoreListing>>> {
    let viewer = viewer.map(|u| u.id);
    Ok(Json(state.catalog().list_stores(query, viewer).await?))
}

/// POST /api/stores
#[instrument(skip(state, admin, new), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(new): Json<NewStore>,
) -> Result<(StatusCode, Json<Store>)> {
    let store = state.ownership().create_store(new).await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// GET /api/stores/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<StoreId>,
) -> Result<Json<StoreDetail>> {
    Ok(Json(state.catalog().get_store(id).await?))
}

/// PUT /api/stores/{id}
#[instrument(skip(state, admin, changes), fields(admin_id = %admin.id, store_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<StoreId>,
    Json(changes): Json<StoreChanges>,
) -> Result<Json<Store>> {
    Ok(Json(state.ownership().update_store(id, changes).await?))
}

/// DELETE /api/stores/{id}
#[instrument(skip(state, admin), fields(admin_id = %admin.id, store_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<StoreId>,
) -> Result<StatusCode> {
    state.ownership().delete_store(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/stores/{id}/statistics
pub async fn statistics(
    State(state): State<AppState>,
    Path(id): Path<StoreId>,
) -> Result<Json<RatingStats>> {
    Ok(Json(state.ledger().statistics(id).await?))
}

/// GET /api/stores/{id}/user-rating
pub async fn user_rating(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
) -> Result<Json<StoreListing>> {
    Ok(Json(state.catalog().get_store_for_viewer(id, user.id).await?))
}

//! Rating handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use storerate_core::{RatingId, StoreId, UserId};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Rating, RatingWithStore, RatingWithUser};
use crate::state::AppState;

/// Body of `POST /api/ratings`.
///
/// `value` is kept as raw JSON so that strings, fractions and out-of-range
/// numbers all reach the ledger and are rejected with one message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRatingRequest {
    pub store_id: StoreId,
    pub value: Value,
}

/// Body of `PUT /api/ratings/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateRatingRequest {
    pub value: Value,
}

/// GET /api/ratings
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<RatingWithStore>>> {
    Ok(Json(state.ledger().recent(None).await?))
}

/// POST /api/ratings
#[instrument(skip(state, user, req), fields(user_id = %user.id, store_id = %req.store_id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<SubmitRatingRequest>,
) -> Result<(StatusCode, Json<Rating>)> {
    let rating = state
        .ledger()
        .submit(user.id, req.store_id, &req.value)
        .await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

/// PUT /api/ratings/{id}
#[instrument(skip(state, user, req), fields(user_id = %user.id, rating_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<RatingId>,
    Json(req): Json<UpdateRatingRequest>,
) -> Result<Json<Rating>> {
    Ok(Json(state.ledger().update(id, user.id, &req.value).await?))
}

/// DELETE /api/ratings/{id}
#[instrument(skip(state, user), fields(user_id = %user.id, rating_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<RatingId>,
) -> Result<StatusCode> {
    state.ledger().delete(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/ratings/store/{store_id}
pub async fn for_store(
    State(state): State<AppState>,
    Path(store_id): Path<StoreId>,
) -> Result<Json<Vec<RatingWithUser>>> {
    Ok(Json(state.ledger().ratings_for_store(store_id).await?))
}

/// GET /api/ratings/user/{user_id}/store/{store_id}
///
/// Users may read their own rating; admins may read anyone's.
pub async fn for_user_and_store(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path((user_id, store_id)): Path<(UserId, StoreId)>,
) -> Result<Json<Rating>> {
    if caller.id != user_id && !caller.is_admin() {
        return Err(AppError::Forbidden(
            "You can only view your own ratings".to_string(),
        ));
    }
    state
        .ledger()
        .rating_for_user(user_id, store_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Rating not found".to_string()))
}

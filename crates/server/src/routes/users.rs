//! Admin user management handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use storerate_core::{Role, UserId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{User, UserDetail};
use crate::services::auth::NewAccount;
use crate::services::catalog::{UserChanges, UserQuery};
use crate::state::AppState;

/// Body of `POST /api/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(flatten)]
    pub account: NewAccount,
    #[serde(default)]
    pub role: Role,
}

/// GET /api/users
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.catalog().list_users(query).await?))
}

/// POST /api/users
#[instrument(skip(state, admin, req), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.auth().create_account(req.account, req.role).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<UserDetail>> {
    Ok(Json(state.catalog().get_user(id).await?))
}

/// PUT /api/users/{id}
#[instrument(skip(state, admin, changes), fields(admin_id = %admin.id, user_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(changes): Json<UserChanges>,
) -> Result<Json<User>> {
    Ok(Json(state.catalog().update_user(id, changes).await?))
}

/// DELETE /api/users/{id}
///
/// An admin cannot delete their own account.
#[instrument(skip(state, admin), fields(admin_id = %admin.id, user_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    if id == admin.id {
        return Err(AppError::Forbidden(
            "You cannot delete your own account".to_string(),
        ));
    }
    state.ownership().delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

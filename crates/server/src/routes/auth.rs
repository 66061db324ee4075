//! Authentication route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user};
use crate::middleware::RequireAuth;
use crate::middleware::session::{begin_user_session, end_user_session};
use crate::models::CurrentUser;
use crate::services::auth::NewAccount;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Password change request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Response of login, registration and `me`.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: CurrentUser,
}

async fn sign_in(session: &Session, user: CurrentUser) -> Result<Json<SessionResponse>> {
    begin_user_session(session, user.id).await.map_err(|e| {
        tracing::error!(error = %e, "failed to start session");
        AppError::Internal("session error".to_string())
    })?;
    Ok(Json(SessionResponse { user }))
}

/// POST /api/auth/register
///
/// Creates a `USER` account and signs it in.
#[instrument(skip(state, session, account), fields(email = %account.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(account): Json<NewAccount>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let user = state.auth().register(account).await?;
    let body = sign_in(&session, user.into()).await?;
    Ok((StatusCode::CREATED, body))
}

/// POST /api/auth/login
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let user = match state.auth().login(&form.email, &form.password).await {
        Ok(user) => user,
        Err(e) => {
            tracing::info!("login failed");
            return Err(e.into());
        }
    };
    tracing::info!(user_id = %user.id, "login succeeded");
    sign_in(&session, user.into()).await
}

/// POST /api/auth/logout
pub async fn logout(session: Session) -> Result<StatusCode> {
    end_user_session(&session).await.map_err(|e| {
        tracing::error!(error = %e, "failed to end session");
        AppError::Internal("session error".to_string())
    })?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
pub async fn me(RequireAuth(user): RequireAuth) -> Json<SessionResponse> {
    Json(SessionResponse { user })
}

/// PUT /api/auth/password
#[instrument(skip(state, form), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    state
        .auth()
        .change_password(user.id, &form.current_password, &form.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

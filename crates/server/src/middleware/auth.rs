//! Authentication extractors.
//!
//! The session stores only the user ID. Every extractor reloads the user so
//! the role seen by a handler is the current one, including changes made by
//! store ownership transitions since login.
//!
//! ```rust,ignore
//! async fn handler(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
//!     format!("Hello, {}!", admin.name)
//! }
//! ```

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use storerate_core::{Role, UserId};

use crate::db::{stores, users};
use crate::error::set_sentry_user;
use crate::models::CurrentUser;
use crate::models::session::keys;
use crate::state::AppState;

/// Rejection from the auth extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// No valid session.
    Unauthorized,
    /// Signed in without the required role.
    Forbidden(&'static str),
    /// The session store or database failed.
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Load the signed-in user, if any.
async fn load_current_user(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<CurrentUser>, AuthRejection> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };

    let user_id = session.get::<UserId>(keys::USER_ID).await.map_err(|e| {
        tracing::error!(error = %e, "failed to read session");
        AuthRejection::Internal
    })?;
    let Some(user_id) = user_id else {
        return Ok(None);
    };

    let user = users::get_by_id(state.pool(), user_id).await.map_err(|e| {
        tracing::error!(error = %e, %user_id, "failed to load session user");
        AuthRejection::Internal
    })?;

    // Deleted while signed in
    let Some(user) = user else {
        tracing::info!(%user_id, "session refers to a deleted user");
        return Ok(None);
    };

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(Some(user.into()))
}

/// Extractor that requires a signed-in user of any role.
pub struct RequireAuth(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        load_current_user(parts, state)
            .await?
            .map(Self)
            .ok_or(AuthRejection::Unauthorized)
    }
}

/// Extractor that requires an `ADMIN`.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        require_role(&user, Role::Admin)?;
        Ok(Self(user))
    }
}

/// Extractor that requires a `STORE_OWNER`, or an `ADMIN` who owns a store
/// (admins keep their role when given a store).
pub struct RequireStoreOwner(pub CurrentUser);

impl FromRequestParts<AppState> for RequireStoreOwner {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        let owns_store = match user.role {
            Role::StoreOwner => true,
            Role::Admin => stores::get_by_owner(state.pool(), user.id)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, user_id = %user.id, "failed to look up owned store");
                    AuthRejection::Internal
                })?
                .is_some(),
            Role::User => false,
        };
        require_store_owner(&user, owns_store)?;
        Ok(Self(user))
    }
}

/// Extractor that loads the signed-in user without requiring one.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        load_current_user(parts, state).await.map(Self)
    }
}

fn require_store_owner(user: &CurrentUser, owns_store: bool) -> Result<(), AuthRejection> {
    match user.role {
        Role::StoreOwner => Ok(()),
        Role::Admin if owns_store => Ok(()),
        _ => require_role(user, Role::StoreOwner),
    }
}

fn require_role(user: &CurrentUser, role: Role) -> Result<(), AuthRejection> {
    if user.role == role {
        return Ok(());
    }
    Err(AuthRejection::Forbidden(match role {
        Role::Admin => "Administrator access required",
        Role::StoreOwner => "Store owner access required",
        Role::User => "Access denied",
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storerate_core::Email;

    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            name: "Jordan Example".into(),
            email: Email::parse("jordan@example.com").unwrap(),
            role,
        }
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&user(Role::Admin), Role::Admin).is_ok());
        assert!(require_role(&user(Role::StoreOwner), Role::StoreOwner).is_ok());
        assert!(matches!(
            require_role(&user(Role::User), Role::Admin),
            Err(AuthRejection::Forbidden(_))
        ));
        assert!(matches!(
            require_role(&user(Role::Admin), Role::StoreOwner),
            Err(AuthRejection::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_owning_a_store_passes_store_owner_check() {
        assert!(require_store_owner(&user(Role::Admin), true).is_ok());
        assert!(require_store_owner(&user(Role::StoreOwner), true).is_ok());
        assert!(matches!(
            require_store_owner(&user(Role::Admin), false),
            Err(AuthRejection::Forbidden(_))
        ));
        assert!(matches!(
            require_store_owner(&user(Role::User), false),
            Err(AuthRejection::Forbidden(_))
        ));
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden("no").into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}

//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/auth/register        - Create a USER account and sign in
//! POST   /api/auth/login           - Sign in
//! POST   /api/auth/logout          - Sign out
//! GET    /api/auth/me              - Current user
//! PUT    /api/auth/password        - Change own password
//!
//! # Users (admin)
//! GET    /api/users                - Filtered, sorted user directory
//! POST   /api/users                - Create a user with a role
//! GET    /api/users/{id}           - User with owned store
//! PUT    /api/users/{id}           - Edit a user
//! DELETE /api/users/{id}           - Delete a user
//!
//! # Stores
//! GET    /api/stores               - Filtered, sorted store directory
//! POST   /api/stores               - Create a store (admin)
//! GET    /api/stores/{id}          - Store with owner and statistics
//! PUT    /api/stores/{id}          - Edit a store (admin)
//! DELETE /api/stores/{id}          - Delete a store (admin)
//! GET    /api/stores/{id}/statistics  - Rating statistics
//! GET    /api/stores/{id}/user-rating - Store with the caller's rating
//!
//! # Ratings
//! GET    /api/ratings              - All ratings (admin)
//! POST   /api/ratings              - Rate a store
//! GET    /api/ratings/store/{id}   - Ratings of a store
//! GET    /api/ratings/user/{userId}/store/{storeId} - One user's rating
//! PUT    /api/ratings/{id}         - Change own rating
//! DELETE /api/ratings/{id}         - Delete own rating
//!
//! # Dashboards
//! GET    /api/dashboard/admin       - Platform totals
//! GET    /api/dashboard/store-owner - The caller's store feedback
//! ```

pub mod auth;
pub mod dashboard;
pub mod ratings;
pub mod stores;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(limited)
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/password", put(auth::change_password))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index).post(users::create))
        .route(
            "/{id}",
            get(users::show).put(users::update).delete(users::destroy),
        )
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index).post(stores::create))
        .route(
            "/{id}",
            get(stores::show).put(stores::update).delete(stores::destroy),
        )
        .route("/{id}/statistics", get(stores::statistics))
        .route("/{id}/user-rating", get(stores::user_rating))
}

/// Create the rating routes router.
pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(ratings::index).post(ratings::submit))
        .route("/store/{store_id}", get(ratings::for_store))
        .route(
            "/user/{user_id}/store/{store_id}",
            get(ratings::for_user_and_store),
        )
        .route("/{id}", put(ratings::update).delete(ratings::destroy))
}

/// Create the dashboard routes router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard::admin))
        .route("/store-owner", get(dashboard::store_owner))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/users", user_routes())
        .nest("/api/stores", store_routes())
        .nest("/api/ratings", rating_routes())
        .nest("/api/dashboard", dashboard_routes())
}

//! Administrator account commands.
//!
//! The HTTP API can only create administrators when one already exists, so
//! the first one is created here.

use storerate_core::{Role, UserId};
use storerate_server::services::auth::{AuthError, AuthService, NewAccount};

use super::{CommandError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a new administrator.
///
/// Fields go through the same validation as the API.
///
/// # Errors
///
/// Returns an error if a field is invalid, the email is taken, or the
/// database is unreachable.
pub async fn create_user(
    email: String,
    name: String,
    address: String,
    password: String,
) -> Result<UserId, AdminError> {
    let pool = connect().await?;

    tracing::info!("Creating administrator: {}", email);

    let user = AuthService::new(&pool)
        .create_account(
            NewAccount {
                name,
                email,
                password,
                address,
            },
            Role::Admin,
        )
        .await?;

    tracing::info!(
        "Administrator created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}

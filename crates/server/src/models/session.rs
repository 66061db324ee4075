//! Session-related types.

use serde::Serialize;

use storerate_core::{Email, Role, UserId};

use super::user::User;

/// The authenticated caller for one request.
///
/// Built by the auth extractors from a fresh database read, so a role change
/// made by an admin takes effect on the user's next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
}

impl CurrentUser {
    /// Whether the caller is an administrator.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the logged-in user's ID.
    pub const USER_ID: &str = "user_id";
}

//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storerate_core::{AverageRating, Email, Role, UserId};

use super::store::StoreSummary;

/// A user account. The password hash never leaves the database layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email address.
    pub email: Email,
    /// Postal address.
    pub address: String,
    /// Current role.
    pub role: Role,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The public subset shown next to ratings.
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Identifying details of a rater or store owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// A user with the store they own, as shown on the admin user page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    /// The owned store, if any.
    pub store: Option<StoreSummary>,
    /// Average rating of the owned store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_average_rating: Option<AverageRating>,
}

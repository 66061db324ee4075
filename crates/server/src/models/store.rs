//! Store domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storerate_core::{AverageRating, Email, RatingId, RatingStats, RatingValue, StoreId, UserId};

use super::user::UserSummary;

/// A rated store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    /// Unique store ID.
    pub id: StoreId,
    /// Store name.
    pub name: String,
    /// Contact email, unique across stores.
    pub email: Email,
    /// Postal address.
    pub address: String,
    /// The user who owns this store, if any.
    pub owner_id: Option<UserId>,
    /// When the store was created.
    pub created_at: DateTime<Utc>,
    /// When the store was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Short form of a store used inside other payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub id: StoreId,
    pub name: String,
    pub email: Email,
    pub address: String,
}

impl From<&Store> for StoreSummary {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            email: store.email.clone(),
            address: store.address.clone(),
        }
    }
}

/// A store in the directory listing with its aggregate rating.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreListing {
    #[serde(flatten)]
    pub store: Store,
    pub average_rating: AverageRating,
    pub rating_count: u64,
    /// The viewer's own rating, when the listing was requested by a signed-in user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<RatingValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating_id: Option<RatingId>,
}

/// A single store with its owner and full statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDetail {
    #[serde(flatten)]
    pub store: Store,
    pub owner: Option<UserSummary>,
    pub statistics: RatingStats,
}

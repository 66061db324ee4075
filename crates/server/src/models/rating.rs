//! Rating domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storerate_core::{RatingId, RatingValue, StoreId, UserId};

use super::user::UserSummary;

/// One user's rating of one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: RatingId,
    pub value: RatingValue,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A rating together with its author, as listed for a store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingWithUser {
    #[serde(flatten)]
    pub rating: Rating,
    pub user: UserSummary,
}

/// A rating with author and store names, for dashboards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingWithStore {
    #[serde(flatten)]
    pub rating: Rating,
    pub user_name: String,
    pub store_name: String,
}

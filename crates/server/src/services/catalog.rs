//! User and store directory reads, plus admin edits of user accounts.
//!
//! Store listings carry aggregate ratings computed by [`RatingStats`] from
//! the raw values, never from stored averages.

use std::cmp::Ordering;

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use storerate_core::{RatingStats, Role, StoreId, UserId};

use super::DomainError;
use super::ownership::resolve_manual_role;
use super::validation::Validator;
use crate::db::stores::{StoreFilter, StoreWithValues};
use crate::db::users::{UserFilter, UserUpdate};
use crate::db::{USER_EMAIL_KEY, ratings, stores, users};
use crate::models::{StoreDetail, StoreListing, StoreSummary, User, UserDetail};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Columns the store directory can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreSortKey {
    #[default]
    Name,
    Email,
    Address,
    Rating,
    CreatedAt,
}

/// Columns the user directory can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserSortKey {
    #[default]
    Name,
    Email,
    Address,
    Role,
    CreatedAt,
}

/// Query string of `GET /api/stores`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreQuery {
    pub name: Option<String>,
    pub address: Option<String>,
    pub sort: StoreSortKey,
    pub order: SortOrder,
}

/// Query string of `GET /api/users`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
    pub sort: UserSortKey,
    pub order: SortOrder,
}

/// Admin edit of a user. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
}

/// Blank filters match everything.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Sort store listings in place; ties fall back to ID.
pub fn sort_stores(listings: &mut [StoreListing], key: StoreSortKey, order: SortOrder) {
    listings.sort_by(|a, b| {
        let primary = match key {
            StoreSortKey::Name => compare_text(&a.store.name, &b.store.name),
            StoreSortKey::Email => a.store.email.as_str().cmp(b.store.email.as_str()),
            StoreSortKey::Address => compare_text(&a.store.address, &b.store.address),
            StoreSortKey::Rating => a.average_rating.cmp(&b.average_rating),
            StoreSortKey::CreatedAt => a.store.created_at.cmp(&b.store.created_at),
        };
        order.apply(primary.then_with(|| a.store.id.cmp(&b.store.id)))
    });
}

/// Sort users in place; ties fall back to ID.
pub fn sort_users(list: &mut [User], key: UserSortKey, order: SortOrder) {
    list.sort_by(|a, b| {
        let primary = match key {
            UserSortKey::Name => compare_text(&a.name, &b.name),
            UserSortKey::Email => a.email.as_str().cmp(b.email.as_str()),
            UserSortKey::Address => compare_text(&a.address, &b.address),
            UserSortKey::Role => a.role.as_str().cmp(b.role.as_str()),
            UserSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        order.apply(primary.then_with(|| a.id.cmp(&b.id)))
    });
}

fn to_listing(row: StoreWithValues) -> StoreListing {
    let stats = RatingStats::from_values(row.values);
    StoreListing {
        store: row.store,
        average_rating: stats.average_rating,
        rating_count: stats.rating_count,
        user_rating: row.user_rating,
        user_rating_id: row.user_rating_id,
    }
}

/// Directory reads over users and stores.
pub struct Catalog<'a> {
    pool: &'a PgPool,
}

impl<'a> Catalog<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Filtered, sorted store directory. With a `viewer`, each listing also
    /// carries that user's own rating.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Repository` if the query fails.
    #[instrument(skip(self, query))]
    pub async fn list_stores(
        &self,
        query: StoreQuery,
        viewer: Option<UserId>,
    ) -> Result<Vec<StoreListing>, DomainError> {
        let filter = StoreFilter {
            name: non_blank(query.name),
            address: non_blank(query.address),
        };
        let mut listings: Vec<StoreListing> = stores::list_with_values(self.pool, &filter, viewer)
            .await?
            .into_iter()
            .map(to_listing)
            .collect();
        sort_stores(&mut listings, query.sort, query.order);
        Ok(listings)
    }

    /// A store with its owner and full rating statistics.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the store does not exist.
    pub async fn get_store(&self, id: StoreId) -> Result<StoreDetail, DomainError> {
        let store = stores::get_by_id(self.pool, id)
            .await?
            .ok_or(DomainError::NotFound("store"))?;
        let owner = match store.owner_id {
            Some(owner_id) => users::get_by_id(self.pool, owner_id)
                .await?
                .map(|u| u.summary()),
            None => None,
        };
        let values = ratings::values_for_store(self.pool, id).await?;
        Ok(StoreDetail {
            store,
            owner,
            statistics: RatingStats::from_values(values),
        })
    }

    /// A store's listing as seen by `viewer`, including their own rating.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the store does not exist.
    pub async fn get_store_for_viewer(
        &self,
        id: StoreId,
        viewer: UserId,
    ) -> Result<StoreListing, DomainError> {
        let store = stores::get_by_id(self.pool, id)
            .await?
            .ok_or(DomainError::NotFound("store"))?;
        let values = ratings::values_for_store(self.pool, id).await?;
        let own = ratings::find_by_user_and_store(self.pool, viewer, id).await?;
        let stats = RatingStats::from_values(values);
        Ok(StoreListing {
            store,
            average_rating: stats.average_rating,
            rating_count: stats.rating_count,
            user_rating: own.as_ref().map(|r| r.value),
            user_rating_id: own.map(|r| r.id),
        })
    }

    /// Filtered, sorted user directory.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Repository` if the query fails.
    #[instrument(skip(self, query))]
    pub async fn list_users(&self, query: UserQuery) -> Result<Vec<User>, DomainError> {
        let filter = UserFilter {
            name: non_blank(query.name),
            email: non_blank(query.email),
            address: non_blank(query.address),
            role: query.role,
        };
        let mut list = users::list(self.pool, &filter).await?;
        sort_users(&mut list, query.sort, query.order);
        Ok(list)
    }

    /// A user with the store they own and its average rating.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the user does not exist.
    pub async fn get_user(&self, id: UserId) -> Result<UserDetail, DomainError> {
        let user = users::get_by_id(self.pool, id)
            .await?
            .ok_or(DomainError::NotFound("user"))?;
        let (store, store_average_rating) = match stores::get_by_owner(self.pool, id).await? {
            Some(store) => {
                let values = ratings::values_for_store(self.pool, store.id).await?;
                (
                    Some(StoreSummary::from(&store)),
                    Some(RatingStats::average_of(values)),
                )
            }
            None => (None, None),
        };
        Ok(UserDetail {
            user,
            store,
            store_average_rating,
        })
    }

    /// Edit a user's profile or role.
    ///
    /// Roles are checked against ownership: `STORE_OWNER` cannot be set by
    /// hand, and an owner cannot be set back to `USER`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    /// - `Validation` for malformed fields
    /// - `InvalidRole` if the role contradicts ownership
    /// - `DuplicateEmail` if the email belongs to another user
    #[instrument(skip(self, changes), fields(user_id = %id))]
    pub async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<User, DomainError> {
        let mut v = Validator::new();
        if let Some(name) = &changes.name {
            v.user_name(name);
        }
        if let Some(address) = &changes.address {
            v.address(address);
        }
        let email = changes.email.as_deref().and_then(|raw| v.email(raw));
        v.finish()?;

        let mut tx = self.pool.begin().await?;

        let current = users::lock_by_id(&mut tx, id)
            .await?
            .ok_or(DomainError::NotFound("user"))?;

        let role = match changes.role {
            Some(requested) if requested != current.role => {
                let owns_store = stores::get_by_owner(&mut *tx, id).await?.is_some();
                Some(resolve_manual_role(requested, owns_store)?)
            }
            _ => None,
        };

        let user = users::update(
            &mut *tx,
            id,
            UserUpdate {
                name: changes.name.as_deref().map(str::trim),
                email: email.as_ref(),
                address: changes.address.as_deref().map(str::trim),
                role,
            },
        )
        .await
        .map_err(|e| {
            if e.is_conflict_on(USER_EMAIL_KEY) {
                DomainError::DuplicateEmail
            } else {
                DomainError::Repository(e)
            }
        })?
        .ok_or(DomainError::NotFound("user"))?;

        tx.commit().await?;

        if let Some(role) = role {
            tracing::info!(from = %current.role, to = %role, "role set by admin");
        }
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use storerate_core::{AverageRating, Email};

    use super::*;
    use crate::models::Store;

    fn listing(id: i32, name: &str, average: (u64, u64), day: u32) -> StoreListing {
        let created = Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap();
        StoreListing {
            store: Store {
                id: StoreId::new(id),
                name: name.into(),
                email: Email::parse(&format!("store{id}@example.com")).unwrap(),
                address: format!("{id} Main Street"),
                owner_id: None,
                created_at: created,
                updated_at: created,
            },
            average_rating: AverageRating::from_sum(average.0, average.1),
            rating_count: average.1,
            user_rating: None,
            user_rating_id: None,
        }
    }

    fn ids(listings: &[StoreListing]) -> Vec<i32> {
        listings.iter().map(|l| l.store.id.as_i32()).collect()
    }

    #[test]
    fn test_default_sort_is_name_ascending() {
        let mut l = vec![
            listing(1, "zeta", (0, 0), 1),
            listing(2, "Alpha", (0, 0), 2),
            listing(3, "beta", (0, 0), 3),
        ];
        let q = StoreQuery::default();
        sort_stores(&mut l, q.sort, q.order);
        assert_eq!(ids(&l), vec![2, 3, 1]);
    }

    #[test]
    fn test_sort_by_rating_desc() {
        let mut l = vec![
            listing(1, "a", (6, 2), 1),
            listing(2, "b", (10, 2), 2),
            listing(3, "c", (0, 0), 3),
        ];
        sort_stores(&mut l, StoreSortKey::Rating, SortOrder::Desc);
        assert_eq!(ids(&l), vec![2, 1, 3]);
    }

    #[test]
    fn test_ties_break_by_id() {
        let mut l = vec![listing(5, "same", (0, 0), 1), listing(2, "same", (0, 0), 1)];
        sort_stores(&mut l, StoreSortKey::Name, SortOrder::Asc);
        assert_eq!(ids(&l), vec![2, 5]);
    }

    #[test]
    fn test_sort_by_created_at() {
        let mut l = vec![listing(1, "a", (0, 0), 3), listing(2, "b", (0, 0), 1)];
        sort_stores(&mut l, StoreSortKey::CreatedAt, SortOrder::Asc);
        assert_eq!(ids(&l), vec![2, 1]);
    }

    #[test]
    fn test_query_parsing() {
        let q: StoreQuery =
            serde_json::from_str(r#"{"name": "mart", "sort": "createdAt", "order": "desc"}"#)
                .unwrap();
        assert_eq!(q.sort, StoreSortKey::CreatedAt);
        assert_eq!(q.order, SortOrder::Desc);
        assert_eq!(q.name.as_deref(), Some("mart"));

        let q: UserQuery = serde_json::from_str(r#"{"role": "STORE_OWNER"}"#).unwrap();
        assert_eq!(q.role, Some(Role::StoreOwner));
        assert_eq!(q.sort, UserSortKey::Name);

        assert!(serde_json::from_str::<StoreQuery>(r#"{"sort": "password"}"#).is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" x ".into())), Some("x".into()));
        assert_eq!(non_blank(None), None);
    }
}

//! Rating queries.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};

use storerate_core::{Email, RatingId, RatingValue, StoreId, UserId};

use super::{RepositoryError, map_unique_violation};
use crate::models::{Rating, RatingWithStore, RatingWithUser, UserSummary};

const RATING_COLUMNS: &str = "id, value, user_id, store_id, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct RatingRow {
    id: RatingId,
    value: i16,
    user_id: UserId,
    store_id: StoreId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RatingRow> for Rating {
    type Error = RepositoryError;

    fn try_from(row: RatingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            value: decode_value(row.value)?,
            user_id: row.user_id,
            store_id: row.store_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RatingWithUserRow {
    #[sqlx(flatten)]
    rating: RatingRow,
    user_name: String,
    user_email: String,
}

impl TryFrom<RatingWithUserRow> for RatingWithUser {
    type Error = RepositoryError;

    fn try_from(row: RatingWithUserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.user_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let user = UserSummary {
            id: row.rating.user_id,
            name: row.user_name,
            email,
        };
        Ok(Self {
            rating: row.rating.try_into()?,
            user,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RatingWithStoreRow {
    #[sqlx(flatten)]
    rating: RatingRow,
    user_name: String,
    store_name: String,
}

impl TryFrom<RatingWithStoreRow> for RatingWithStore {
    type Error = RepositoryError;

    fn try_from(row: RatingWithStoreRow) -> Result<Self, Self::Error> {
        Ok(Self {
            rating: row.rating.try_into()?,
            user_name: row.user_name,
            store_name: row.store_name,
        })
    }
}

fn decode_value(raw: i16) -> Result<RatingValue, RepositoryError> {
    RatingValue::try_from(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid rating in database: {e}")))
}

/// Get a rating by ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_by_id(
    executor: impl PgExecutor<'_>,
    id: RatingId,
) -> Result<Option<Rating>, RepositoryError> {
    let sql = format!("SELECT {RATING_COLUMNS} FROM rating WHERE id = $1");
    sqlx::query_as::<_, RatingRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(Rating::try_from)
        .transpose()
}

/// Get a rating by ID and lock the row until the transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_id(
    conn: &mut PgConnection,
    id: RatingId,
) -> Result<Option<Rating>, RepositoryError> {
    let sql = format!("SELECT {RATING_COLUMNS} FROM rating WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, RatingRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .map(Rating::try_from)
        .transpose()
}

/// The rating a user gave a store, if any.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_user_and_store(
    executor: impl PgExecutor<'_>,
    user_id: UserId,
    store_id: StoreId,
) -> Result<Option<Rating>, RepositoryError> {
    let sql = format!("SELECT {RATING_COLUMNS} FROM rating WHERE user_id = $1 AND store_id = $2");
    sqlx::query_as::<_, RatingRow>(&sql)
        .bind(user_id)
        .bind(store_id)
        .fetch_optional(executor)
        .await?
        .map(Rating::try_from)
        .transpose()
}

/// Insert a rating.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the user already rated the store.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert(
    executor: impl PgExecutor<'_>,
    user_id: UserId,
    store_id: StoreId,
    value: RatingValue,
) -> Result<Rating, RepositoryError> {
    let sql = format!(
        "INSERT INTO rating (value, user_id, store_id)
         VALUES ($1, $2, $3)
         RETURNING {RATING_COLUMNS}"
    );
    sqlx::query_as::<_, RatingRow>(&sql)
        .bind(value)
        .bind(user_id)
        .bind(store_id)
        .fetch_one(executor)
        .await
        .map_err(map_unique_violation)?
        .try_into()
}

/// Overwrite a rating's value and bump `updated_at`.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the rating does not exist.
pub async fn update_value(
    executor: impl PgExecutor<'_>,
    id: RatingId,
    value: RatingValue,
) -> Result<Rating, RepositoryError> {
    let sql = format!(
        "UPDATE rating SET value = $2, updated_at = NOW()
         WHERE id = $1
         RETURNING {RATING_COLUMNS}"
    );
    sqlx::query_as::<_, RatingRow>(&sql)
        .bind(id)
        .bind(value)
        .fetch_optional(executor)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
}

/// Delete a rating. Returns `false` if it did not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete(executor: impl PgExecutor<'_>, id: RatingId) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM rating WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Every rating value of a store, in no particular order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn values_for_store(
    executor: impl PgExecutor<'_>,
    store_id: StoreId,
) -> Result<Vec<RatingValue>, RepositoryError> {
    sqlx::query_scalar::<_, i16>("SELECT value FROM rating WHERE store_id = $1")
        .bind(store_id)
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(decode_value)
        .collect()
}

/// Number of ratings per value across all stores.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn value_counts(
    executor: impl PgExecutor<'_>,
) -> Result<Vec<(RatingValue, u64)>, RepositoryError> {
    sqlx::query_as::<_, (i16, i64)>("SELECT value, COUNT(*) FROM rating GROUP BY value")
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(|(value, n)| {
            let count = u64::try_from(n).map_err(|_| {
                RepositoryError::DataCorruption(format!("negative rating count: {n}"))
            })?;
            Ok((decode_value(value)?, count))
        })
        .collect()
}

/// Ratings of a store with their authors, newest first. `limit` caps the
/// number of rows when set.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_for_store(
    executor: impl PgExecutor<'_>,
    store_id: StoreId,
    limit: Option<i64>,
) -> Result<Vec<RatingWithUser>, RepositoryError> {
    sqlx::query_as::<_, RatingWithUserRow>(
        "SELECT r.id, r.value, r.user_id, r.store_id, r.created_at, r.updated_at,
                u.name AS user_name, u.email AS user_email
         FROM rating r
         JOIN app_user u ON u.id = r.user_id
         WHERE r.store_id = $1
         ORDER BY r.created_at DESC, r.id DESC
         LIMIT $2",
    )
    .bind(store_id)
    .bind(limit)
    .fetch_all(executor)
    .await?
    .into_iter()
    .map(RatingWithUser::try_from)
    .collect()
}

/// Ratings across all stores with author and store names, newest first.
/// `limit` caps the number of rows when set.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_recent(
    executor: impl PgExecutor<'_>,
    limit: Option<i64>,
) -> Result<Vec<RatingWithStore>, RepositoryError> {
    sqlx::query_as::<_, RatingWithStoreRow>(
        "SELECT r.id, r.value, r.user_id, r.store_id, r.created_at, r.updated_at,
                u.name AS user_name, s.name AS store_name
         FROM rating r
         JOIN app_user u ON u.id = r.user_id
         JOIN store s ON s.id = r.store_id
         ORDER BY r.created_at DESC, r.id DESC
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(executor)
    .await?
    .into_iter()
    .map(RatingWithStore::try_from)
    .collect()
}

/// Total number of ratings.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count(executor: impl PgExecutor<'_>) -> Result<i64, RepositoryError> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rating")
        .fetch_one(executor)
        .await?;
    Ok(n)
}

//! Store queries.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};

use storerate_core::{Email, RatingId, RatingValue, StoreId, UserId};

use super::{RepositoryError, contains_pattern, map_unique_violation};
use crate::models::Store;

const STORE_COLUMNS: &str = "id, name, email, address, owner_id, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    name: String,
    email: String,
    address: String,
    owner_id: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid store email in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            address: row.address,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StoreWithValuesRow {
    #[sqlx(flatten)]
    store: StoreRow,
    rating_values: Vec<i16>,
    user_rating: Option<i16>,
    user_rating_id: Option<RatingId>,
}

/// A store together with every rating value it has received.
#[derive(Debug, Clone)]
pub struct StoreWithValues {
    pub store: Store,
    pub values: Vec<RatingValue>,
    /// The requesting user's own rating, if a user was given.
    pub user_rating: Option<RatingValue>,
    pub user_rating_id: Option<RatingId>,
}

impl TryFrom<StoreWithValuesRow> for StoreWithValues {
    type Error = RepositoryError;

    fn try_from(row: StoreWithValuesRow) -> Result<Self, Self::Error> {
        let values = row
            .rating_values
            .into_iter()
            .map(decode_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            store: row.store.try_into()?,
            values,
            user_rating: row.user_rating.map(decode_value).transpose()?,
            user_rating_id: row.user_rating_id,
        })
    }
}

fn decode_value(raw: i16) -> Result<RatingValue, RepositoryError> {
    RatingValue::try_from(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid rating in database: {e}")))
}

/// Fields for inserting a store.
#[derive(Debug, Clone)]
pub struct NewStoreRecord<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub address: &'a str,
    pub owner_id: Option<UserId>,
}

/// Partial update of a store. `None` leaves the column unchanged; for
/// `owner_id`, `Some(None)` clears the owner.
#[derive(Debug, Clone, Default)]
pub struct StoreUpdate<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a Email>,
    pub address: Option<&'a str>,
    pub owner_id: Option<Option<UserId>>,
}

/// Case-insensitive substring filters for the store directory.
#[derive(Debug, Clone, Default)]
pub struct StoreFilter {
    pub name: Option<String>,
    pub address: Option<String>,
}

/// Get a store by ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_by_id(
    executor: impl PgExecutor<'_>,
    id: StoreId,
) -> Result<Option<Store>, RepositoryError> {
    let sql = format!("SELECT {STORE_COLUMNS} FROM store WHERE id = $1");
    sqlx::query_as::<_, StoreRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(Store::try_from)
        .transpose()
}

/// Get a store by ID and lock the row until the transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_id(
    conn: &mut PgConnection,
    id: StoreId,
) -> Result<Option<Store>, RepositoryError> {
    let sql = format!("SELECT {STORE_COLUMNS} FROM store WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, StoreRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .map(Store::try_from)
        .transpose()
}

/// Check whether a store exists, taking a share lock so it cannot be deleted
/// before the transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn exists_for_share(conn: &mut PgConnection, id: StoreId) -> Result<bool, RepositoryError> {
    let found = sqlx::query_scalar::<_, i32>("SELECT 1 FROM store WHERE id = $1 FOR SHARE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

/// Check whether a store exists.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn exists(executor: impl PgExecutor<'_>, id: StoreId) -> Result<bool, RepositoryError> {
    let found = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM store WHERE id = $1)")
        .bind(id)
        .fetch_one(executor)
        .await?;
    Ok(found)
}

/// Lock the store owned by a user, if any.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_owner(
    conn: &mut PgConnection,
    owner_id: UserId,
) -> Result<Option<Store>, RepositoryError> {
    let sql = format!("SELECT {STORE_COLUMNS} FROM store WHERE owner_id = $1 FOR UPDATE");
    sqlx::query_as::<_, StoreRow>(&sql)
        .bind(owner_id)
        .fetch_optional(conn)
        .await?
        .map(Store::try_from)
        .transpose()
}

/// The store owned by a user, if any.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_by_owner(
    executor: impl PgExecutor<'_>,
    owner_id: UserId,
) -> Result<Option<Store>, RepositoryError> {
    let sql = format!("SELECT {STORE_COLUMNS} FROM store WHERE owner_id = $1");
    sqlx::query_as::<_, StoreRow>(&sql)
        .bind(owner_id)
        .fetch_optional(executor)
        .await?
        .map(Store::try_from)
        .transpose()
}

/// Insert a store.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` naming the violated constraint if the
/// email is taken or the owner already owns a store.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn create(
    executor: impl PgExecutor<'_>,
    new: NewStoreRecord<'_>,
) -> Result<Store, RepositoryError> {
    let sql = format!(
        "INSERT INTO store (name, email, address, owner_id)
         VALUES ($1, $2, $3, $4)
         RETURNING {STORE_COLUMNS}"
    );
    sqlx::query_as::<_, StoreRow>(&sql)
        .bind(new.name)
        .bind(new.email)
        .bind(new.address)
        .bind(new.owner_id)
        .fetch_one(executor)
        .await
        .map_err(map_unique_violation)?
        .try_into()
}

/// Apply a partial update and return the new row, or `None` if the store
/// does not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` naming the violated constraint.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn update(
    executor: impl PgExecutor<'_>,
    id: StoreId,
    changes: StoreUpdate<'_>,
) -> Result<Option<Store>, RepositoryError> {
    let sql = format!(
        "UPDATE store SET
             name = COALESCE($2, name),
             email = COALESCE($3, email),
             address = COALESCE($4, address),
             owner_id = CASE WHEN $5 THEN $6 ELSE owner_id END,
             updated_at = NOW()
         WHERE id = $1
         RETURNING {STORE_COLUMNS}"
    );
    sqlx::query_as::<_, StoreRow>(&sql)
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.address)
        .bind(changes.owner_id.is_some())
        .bind(changes.owner_id.flatten())
        .fetch_optional(executor)
        .await
        .map_err(map_unique_violation)?
        .map(Store::try_from)
        .transpose()
}

/// Delete a store; its ratings cascade. Returns `false` if it did not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete(executor: impl PgExecutor<'_>, id: StoreId) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM store WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// List stores matching the filter with all of their rating values, ordered
/// by name. When `viewer` is given, each row also carries that user's rating.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_with_values(
    executor: impl PgExecutor<'_>,
    filter: &StoreFilter,
    viewer: Option<UserId>,
) -> Result<Vec<StoreWithValues>, RepositoryError> {
    let sql = "SELECT s.id, s.name, s.email, s.address, s.owner_id, s.created_at, s.updated_at,
                      COALESCE(array_agg(r.value) FILTER (WHERE r.value IS NOT NULL), '{}') AS rating_values,
                      MAX(r.value) FILTER (WHERE r.user_id = $3) AS user_rating,
                      MAX(r.id) FILTER (WHERE r.user_id = $3) AS user_rating_id
               FROM store s
               LEFT JOIN rating r ON r.store_id = s.id
               WHERE ($1::text IS NULL OR s.name ILIKE $1)
                 AND ($2::text IS NULL OR s.address ILIKE $2)
               GROUP BY s.id
               ORDER BY s.name, s.id";
    sqlx::query_as::<_, StoreWithValuesRow>(sql)
        .bind(filter.name.as_deref().map(contains_pattern))
        .bind(filter.address.as_deref().map(contains_pattern))
        .bind(viewer)
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(StoreWithValues::try_from)
        .collect()
}

/// Total number of stores.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count(executor: impl PgExecutor<'_>) -> Result<i64, RepositoryError> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM store")
        .fetch_one(executor)
        .await?;
    Ok(n)
}

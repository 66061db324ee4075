//! User queries.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};

use storerate_core::{Email, Role, UserId};

use super::{RepositoryError, contains_pattern, map_unique_violation};
use crate::models::User;

const USER_COLUMNS: &str = "id, name, email, address, role, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    address: String,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            address: row.address,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Fields for inserting a user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUserRecord<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub address: &'a str,
    pub role: Role,
}

/// Partial update of a user. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a Email>,
    pub address: Option<&'a str>,
    pub role: Option<Role>,
}

/// Case-insensitive substring filters for the user directory.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
}

/// Get a user by ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_by_id(
    executor: impl PgExecutor<'_>,
    id: UserId,
) -> Result<Option<User>, RepositoryError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM app_user WHERE id = $1");
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(User::try_from)
        .transpose()
}

/// Get a user by ID and lock the row until the transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_id(conn: &mut PgConnection, id: UserId) -> Result<Option<User>, RepositoryError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM app_user WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .map(User::try_from)
        .transpose()
}

/// Get a user and their password hash by email, for login.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_with_password_by_email(
    executor: impl PgExecutor<'_>,
    email: &Email,
) -> Result<Option<(User, String)>, RepositoryError> {
    let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM app_user WHERE email = $1");
    let Some(row) = sqlx::query_as::<_, UserWithPasswordRow>(&sql)
        .bind(email)
        .fetch_optional(executor)
        .await?
    else {
        return Ok(None);
    };
    Ok(Some((User::try_from(row.user)?, row.password_hash)))
}

/// Get the password hash for a user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_password_hash(
    executor: impl PgExecutor<'_>,
    id: UserId,
) -> Result<Option<String>, RepositoryError> {
    let hash = sqlx::query_scalar::<_, String>("SELECT password_hash FROM app_user WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(hash)
}

/// Insert a user.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the email already exists.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn create(
    executor: impl PgExecutor<'_>,
    new: NewUserRecord<'_>,
) -> Result<User, RepositoryError> {
    let sql = format!(
        "INSERT INTO app_user (name, email, password_hash, address, role)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(new.name)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.address)
        .bind(new.role)
        .fetch_one(executor)
        .await
        .map_err(map_unique_violation)?
        .try_into()
}

/// Apply a partial update and return the new row, or `None` if the user
/// does not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the new email is taken.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn update(
    executor: impl PgExecutor<'_>,
    id: UserId,
    changes: UserUpdate<'_>,
) -> Result<Option<User>, RepositoryError> {
    let sql = format!(
        "UPDATE app_user SET
             name = COALESCE($2, name),
             email = COALESCE($3, email),
             address = COALESCE($4, address),
             role = COALESCE($5, role),
             updated_at = NOW()
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.address)
        .bind(changes.role)
        .fetch_optional(executor)
        .await
        .map_err(map_unique_violation)?
        .map(User::try_from)
        .transpose()
}

/// Overwrite a user's role.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user does not exist.
pub async fn set_role(
    executor: impl PgExecutor<'_>,
    id: UserId,
    role: Role,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("UPDATE app_user SET role = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(role)
        .execute(executor)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Replace a user's password hash.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user does not exist.
pub async fn set_password_hash(
    executor: impl PgExecutor<'_>,
    id: UserId,
    password_hash: &str,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE app_user SET password_hash = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(password_hash)
    .execute(executor)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Delete a user. Their ratings cascade and their store loses its owner.
///
/// Returns `false` if no such user existed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete(executor: impl PgExecutor<'_>, id: UserId) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM app_user WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// List users matching the filter, ordered by name.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list(
    executor: impl PgExecutor<'_>,
    filter: &UserFilter,
) -> Result<Vec<User>, RepositoryError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM app_user
         WHERE ($1::text IS NULL OR name ILIKE $1)
           AND ($2::text IS NULL OR email ILIKE $2)
           AND ($3::text IS NULL OR address ILIKE $3)
           AND ($4::user_role IS NULL OR role = $4)
         ORDER BY name, id"
    );
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(filter.name.as_deref().map(contains_pattern))
        .bind(filter.email.as_deref().map(contains_pattern))
        .bind(filter.address.as_deref().map(contains_pattern))
        .bind(filter.role)
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
}

/// Total number of users.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count(executor: impl PgExecutor<'_>) -> Result<i64, RepositoryError> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM app_user")
        .fetch_one(executor)
        .await?;
    Ok(n)
}

/// Number of users per role. Roles without users are omitted.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count_by_role(
    executor: impl PgExecutor<'_>,
) -> Result<Vec<(Role, i64)>, RepositoryError> {
    let rows = sqlx::query_as::<_, (Role, i64)>(
        "SELECT role, COUNT(*) FROM app_user GROUP BY role ORDER BY role",
    )
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

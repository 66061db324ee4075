//! Rating ledger.
//!
//! Each user rates a store at most once. The check-then-insert in
//! [`RatingLedger::submit`] runs in one transaction and the
//! `(user_id, store_id)` unique constraint closes the race between two
//! concurrent submissions: the loser sees a unique violation, reported as
//! `DuplicateRating`.

use sqlx::PgPool;
use tracing::instrument;

use storerate_core::{RatingId, RatingStats, RatingValue, RatingValueError, StoreId, UserId};

use super::DomainError;
use crate::db::{RATING_USER_STORE_KEY, RepositoryError, ratings, stores};
use crate::models::{Rating, RatingWithStore, RatingWithUser};

const NOT_AUTHOR: &str = "you can only change your own ratings";

/// Rating operations over the pool.
pub struct RatingLedger<'a> {
    pool: &'a PgPool,
}

impl<'a> RatingLedger<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a user's first rating of a store.
    ///
    /// # Errors
    ///
    /// - `InvalidValue` unless `value` is an integer in 1..=5
    /// - `NotFound` if the store does not exist
    /// - `DuplicateRating` if the user already rated the store
    #[instrument(skip(self, value), fields(user_id = %user_id, store_id = %store_id))]
    pub async fn submit<V>(
        &self,
        user_id: UserId,
        store_id: StoreId,
        value: V,
    ) -> Result<Rating, DomainError>
    where
        V: TryInto<RatingValue, Error = RatingValueError>,
    {
        let value = value.try_into()?;

        let mut tx = self.pool.begin().await?;

        if !stores::exists_for_share(&mut tx, store_id).await? {
            return Err(DomainError::NotFound("store"));
        }
        if ratings::find_by_user_and_store(&mut *tx, user_id, store_id)
            .await?
            .is_some()
        {
            return Err(DomainError::DuplicateRating);
        }

        let rating = ratings::insert(&mut *tx, user_id, store_id, value)
            .await
            .map_err(rating_write_error)?;
        tx.commit().await?;

        tracing::info!(rating_id = %rating.id, value = %rating.value, "rating submitted");
        Ok(rating)
    }

    /// Change the value of the caller's own rating.
    ///
    /// # Errors
    ///
    /// - `InvalidValue` unless `value` is an integer in 1..=5
    /// - `NotFound` if the rating does not exist
    /// - `Forbidden` if the caller did not write it
    #[instrument(skip(self, value), fields(rating_id = %rating_id, caller_id = %caller_id))]
    pub async fn update<V>(
        &self,
        rating_id: RatingId,
        caller_id: UserId,
        value: V,
    ) -> Result<Rating, DomainError>
    where
        V: TryInto<RatingValue, Error = RatingValueError>,
    {
        let value = value.try_into()?;

        let mut tx = self.pool.begin().await?;

        let existing = ratings::lock_by_id(&mut tx, rating_id)
            .await?
            .ok_or(DomainError::NotFound("rating"))?;
        if existing.user_id != caller_id {
            return Err(DomainError::Forbidden(NOT_AUTHOR));
        }

        let rating = ratings::update_value(&mut *tx, rating_id, value)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => DomainError::NotFound("rating"),
                other => DomainError::Repository(other),
            })?;
        tx.commit().await?;

        tracing::info!(from = %existing.value, to = %rating.value, "rating updated");
        Ok(rating)
    }

    /// Delete the caller's own rating.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the rating does not exist
    /// - `Forbidden` if the caller did not write it
    #[instrument(skip(self), fields(rating_id = %rating_id, caller_id = %caller_id))]
    pub async fn delete(&self, rating_id: RatingId, caller_id: UserId) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await?;

        let existing = ratings::lock_by_id(&mut tx, rating_id)
            .await?
            .ok_or(DomainError::NotFound("rating"))?;
        if existing.user_id != caller_id {
            return Err(DomainError::Forbidden(NOT_AUTHOR));
        }

        ratings::delete(&mut *tx, rating_id).await?;
        tx.commit().await?;

        tracing::info!("rating deleted");
        Ok(())
    }

    /// All ratings of a store with their authors, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the store does not exist.
    pub async fn ratings_for_store(&self, store_id: StoreId) -> Result<Vec<RatingWithUser>, DomainError> {
        self.ensure_store(store_id).await?;
        Ok(ratings::list_for_store(self.pool, store_id, None).await?)
    }

    /// Ratings across every store, newest first. `limit` caps the result
    /// when set.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Repository` if the query fails.
    pub async fn recent(&self, limit: Option<i64>) -> Result<Vec<RatingWithStore>, DomainError> {
        Ok(ratings::list_recent(self.pool, limit).await?)
    }

    /// A user's own rating of a store, if they rated it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the store does not exist.
    pub async fn rating_for_user(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Option<Rating>, DomainError> {
        self.ensure_store(store_id).await?;
        Ok(ratings::find_by_user_and_store(self.pool, user_id, store_id).await?)
    }

    /// Average, count and distribution of a store's ratings.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the store does not exist.
    pub async fn statistics(&self, store_id: StoreId) -> Result<RatingStats, DomainError> {
        self.ensure_store(store_id).await?;
        let values = ratings::values_for_store(self.pool, store_id).await?;
        Ok(RatingStats::from_values(values))
    }

    async fn ensure_store(&self, store_id: StoreId) -> Result<(), DomainError> {
        if stores::exists(self.pool, store_id).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound("store"))
        }
    }
}

fn rating_write_error(e: RepositoryError) -> DomainError {
    if e.is_conflict_on(RATING_USER_STORE_KEY) {
        DomainError::DuplicateRating
    } else {
        DomainError::Repository(e)
    }
}

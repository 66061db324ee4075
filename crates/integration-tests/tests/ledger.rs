//! Rating ledger invariants against a real database.

#![allow(clippy::unwrap_used)]

use storerate_core::{AverageRating, RatingValue, RatingValueError, Role};
use storerate_integration_tests::{create_store, create_user, test_pool};
use storerate_server::services::DomainError;
use storerate_server::services::ledger::RatingLedger;

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_second_submission_is_duplicate() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::User).await;
    let store = create_store(&pool, None).await;
    let ledger = RatingLedger::new(&pool);

    let first = ledger.submit(user.id, store.id, 3_i64).await.unwrap();
    assert_eq!(first.value.get(), 3);

    let second = ledger.submit(user.id, store.id, 4_i64).await;
    assert!(matches!(second, Err(DomainError::DuplicateRating)));

    let updated = ledger.update(first.id, user.id, 4_i64).await.unwrap();
    assert_eq!(updated.value.get(), 4);
    assert!(updated.updated_at >= first.updated_at);

    let stats = ledger.statistics(store.id).await.unwrap();
    assert_eq!(stats.rating_count, 1);
    assert_eq!(stats.distribution.get(RatingValue::new(4).unwrap()), 1);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_statistics_of_two_four_four() {
    let pool = test_pool().await;
    let store = create_store(&pool, None).await;
    let ledger = RatingLedger::new(&pool);

    for value in [2_i64, 4, 4] {
        let user = create_user(&pool, Role::User).await;
        ledger.submit(user.id, store.id, value).await.unwrap();
    }

    let stats = ledger.statistics(store.id).await.unwrap();
    assert_eq!(stats.average_rating, AverageRating::from_sum(10, 3));
    assert_eq!(stats.average_rating.to_string(), "3.3");
    assert_eq!(stats.rating_count, 3);
    assert_eq!(stats.distribution.counts(), [0, 1, 0, 2, 0]);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_unrated_store_has_empty_statistics() {
    let pool = test_pool().await;
    let store = create_store(&pool, None).await;

    let stats = RatingLedger::new(&pool).statistics(store.id).await.unwrap();
    assert_eq!(stats.rating_count, 0);
    assert_eq!(stats.average_rating.to_string(), "0.0");
    assert_eq!(stats.distribution.total(), 0);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_out_of_range_value_rejected() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::User).await;
    let store = create_store(&pool, None).await;

    let result = RatingLedger::new(&pool).submit(user.id, store.id, 6_i64).await;
    assert!(matches!(
        result,
        Err(DomainError::InvalidValue(RatingValueError::OutOfRange { .. }))
    ));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_missing_store_not_found() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::User).await;
    let store = create_store(&pool, None).await;
    let ledger = RatingLedger::new(&pool);

    storerate_server::services::ownership::OwnershipManager::new(
        &pool,
        storerate_server::services::ownership::AdminOwnershipPolicy::Preserve,
    )
    .delete_store(store.id)
    .await
    .unwrap();

    let result = ledger.submit(user.id, store.id, 5_i64).await;
    assert!(matches!(result, Err(DomainError::NotFound("store"))));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_concurrent_submissions_one_wins() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::User).await;
    let store = create_store(&pool, None).await;
    let ledger = RatingLedger::new(&pool);

    let (a, b) = tokio::join!(
        ledger.submit(user.id, store.id, 2_i64),
        ledger.submit(user.id, store.id, 5_i64),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "a: {a:?}, b: {b:?}");
    assert!(
        matches!(a, Err(DomainError::DuplicateRating)) || matches!(b, Err(DomainError::DuplicateRating))
    );

    let stats = ledger.statistics(store.id).await.unwrap();
    assert_eq!(stats.rating_count, 1);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_only_author_may_change_rating() {
    let pool = test_pool().await;
    let author = create_user(&pool, Role::User).await;
    let other = create_user(&pool, Role::User).await;
    let store = create_store(&pool, None).await;
    let ledger = RatingLedger::new(&pool);

    let rating = ledger.submit(author.id, store.id, 3_i64).await.unwrap();

    assert!(matches!(
        ledger.update(rating.id, other.id, 1_i64).await,
        Err(DomainError::Forbidden(_))
    ));
    assert!(matches!(
        ledger.delete(rating.id, other.id).await,
        Err(DomainError::Forbidden(_))
    ));

    ledger.delete(rating.id, author.id).await.unwrap();
    assert!(
        ledger
            .rating_for_user(author.id, store.id)
            .await
            .unwrap()
            .is_none()
    );

    // The pair is free again once the rating is gone
    ledger.submit(author.id, store.id, 5_i64).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_ratings_for_store_lists_authors() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::User).await;
    let store = create_store(&pool, None).await;
    let ledger = RatingLedger::new(&pool);

    ledger.submit(user.id, store.id, 4_i64).await.unwrap();

    let listed = ledger.ratings_for_store(store.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed.first().unwrap().user.id, user.id);
    assert_eq!(listed.first().unwrap().user.email, user.email);
}

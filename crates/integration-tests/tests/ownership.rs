//! Store ownership transitions against a real database.

#![allow(clippy::unwrap_used)]

use storerate_core::Role;
use storerate_integration_tests::{
    create_store, create_user, role_of, test_pool, unique_email, unique_store_name,
};
use storerate_server::db::{ratings, stores, users};
use storerate_server::services::DomainError;
use storerate_server::services::catalog::{Catalog, StoreQuery, UserChanges};
use storerate_server::services::ledger::RatingLedger;
use storerate_server::services::ownership::{
    AdminOwnershipPolicy, NewStore, OwnershipManager, StoreChanges,
};

fn manager(pool: &sqlx::PgPool) -> OwnershipManager<'_> {
    OwnershipManager::new(pool, AdminOwnershipPolicy::Preserve)
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_create_store_promotes_owner() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::User).await;

    let store = create_store(&pool, Some(user.id)).await;

    assert_eq!(store.owner_id, Some(user.id));
    assert_eq!(role_of(&pool, user.id).await, Role::StoreOwner);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_reassign_moves_role() {
    let pool = test_pool().await;
    let a = create_user(&pool, Role::User).await;
    let b = create_user(&pool, Role::User).await;
    let store = create_store(&pool, Some(a.id)).await;

    let updated = manager(&pool)
        .update_store(
            store.id,
            StoreChanges {
                owner_id: Some(Some(b.id)),
                ..StoreChanges::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.owner_id, Some(b.id));
    assert_eq!(role_of(&pool, a.id).await, Role::User);
    assert_eq!(role_of(&pool, b.id).await, Role::StoreOwner);
    assert!(stores::get_by_owner(&pool, a.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_clearing_owner_demotes() {
    let pool = test_pool().await;
    let owner = create_user(&pool, Role::User).await;
    let store = create_store(&pool, Some(owner.id)).await;

    let updated = manager(&pool)
        .update_store(
            store.id,
            StoreChanges {
                owner_id: Some(None),
                ..StoreChanges::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.owner_id, None);
    assert_eq!(role_of(&pool, owner.id).await, Role::User);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_rename_keeps_owner() {
    let pool = test_pool().await;
    let owner = create_user(&pool, Role::User).await;
    let store = create_store(&pool, Some(owner.id)).await;
    let name = unique_store_name();

    let updated = manager(&pool)
        .update_store(
            store.id,
            StoreChanges {
                name: Some(name.clone()),
                ..StoreChanges::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, name);
    assert_eq!(updated.owner_id, Some(owner.id));
    assert_eq!(role_of(&pool, owner.id).await, Role::StoreOwner);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_delete_store_demotes_and_removes_ratings() {
    let pool = test_pool().await;
    let owner = create_user(&pool, Role::User).await;
    let rater = create_user(&pool, Role::User).await;
    let store = create_store(&pool, Some(owner.id)).await;
    let rating = RatingLedger::new(&pool)
        .submit(rater.id, store.id, 5_i64)
        .await
        .unwrap();

    manager(&pool).delete_store(store.id).await.unwrap();

    assert_eq!(role_of(&pool, owner.id).await, Role::User);
    assert!(stores::get_by_id(&pool, store.id).await.unwrap().is_none());
    assert!(ratings::get_by_id(&pool, rating.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_owner_cannot_take_second_store() {
    let pool = test_pool().await;
    let owner = create_user(&pool, Role::User).await;
    create_store(&pool, Some(owner.id)).await;

    let result = manager(&pool)
        .create_store(NewStore {
            name: unique_store_name(),
            email: unique_email("store"),
            address: "3 Side Street".to_owned(),
            owner_id: Some(owner.id),
        })
        .await;

    assert!(matches!(result, Err(DomainError::OwnerAlreadyAssigned)));
    assert_eq!(role_of(&pool, owner.id).await, Role::StoreOwner);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_missing_owner_leaves_no_store() {
    let pool = test_pool().await;
    let ghost = create_user(&pool, Role::User).await;
    manager(&pool).delete_user(ghost.id).await.unwrap();
    let email = unique_email("store");

    let result = manager(&pool)
        .create_store(NewStore {
            name: unique_store_name(),
            email: email.clone(),
            address: "4 Side Street".to_owned(),
            owner_id: Some(ghost.id),
        })
        .await;

    assert!(matches!(result, Err(DomainError::NotFound("user"))));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_admin_preserved_as_owner() {
    let pool = test_pool().await;
    let admin = create_user(&pool, Role::Admin).await;

    let store = create_store(&pool, Some(admin.id)).await;
    assert_eq!(role_of(&pool, admin.id).await, Role::Admin);

    manager(&pool).delete_store(store.id).await.unwrap();
    assert_eq!(role_of(&pool, admin.id).await, Role::Admin);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_admin_promoted_under_promote_policy() {
    let pool = test_pool().await;
    let admin = create_user(&pool, Role::Admin).await;

    OwnershipManager::new(&pool, AdminOwnershipPolicy::Promote)
        .create_store(NewStore {
            name: unique_store_name(),
            email: unique_email("store"),
            address: "5 Side Street".to_owned(),
            owner_id: Some(admin.id),
        })
        .await
        .unwrap();

    assert_eq!(role_of(&pool, admin.id).await, Role::StoreOwner);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_deleting_owner_orphans_store() {
    let pool = test_pool().await;
    let owner = create_user(&pool, Role::User).await;
    let store = create_store(&pool, Some(owner.id)).await;

    manager(&pool).delete_user(owner.id).await.unwrap();

    let kept = stores::get_by_id(&pool, store.id).await.unwrap().unwrap();
    assert_eq!(kept.owner_id, None);
    assert!(users::get_by_id(&pool, owner.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_deleting_user_removes_their_ratings() {
    let pool = test_pool().await;
    let rater = create_user(&pool, Role::User).await;
    let store = create_store(&pool, None).await;
    let ledger = RatingLedger::new(&pool);
    let rating = ledger.submit(rater.id, store.id, 2_i64).await.unwrap();

    manager(&pool).delete_user(rater.id).await.unwrap();

    assert!(ratings::get_by_id(&pool, rating.id).await.unwrap().is_none());
    assert_eq!(ledger.statistics(store.id).await.unwrap().rating_count, 0);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_reassign_to_missing_user_changes_nothing() {
    let pool = test_pool().await;
    let owner = create_user(&pool, Role::User).await;
    let ghost = create_user(&pool, Role::User).await;
    manager(&pool).delete_user(ghost.id).await.unwrap();
    let store = create_store(&pool, Some(owner.id)).await;

    let result = manager(&pool)
        .update_store(
            store.id,
            StoreChanges {
                owner_id: Some(Some(ghost.id)),
                ..StoreChanges::default()
            },
        )
        .await;

    assert!(matches!(result, Err(DomainError::NotFound("user"))));
    let kept = stores::get_by_id(&pool, store.id).await.unwrap().unwrap();
    assert_eq!(kept.owner_id, Some(owner.id));
    assert_eq!(role_of(&pool, owner.id).await, Role::StoreOwner);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_reassign_to_busy_owner_rolls_back() {
    let pool = test_pool().await;
    let a = create_user(&pool, Role::User).await;
    let b = create_user(&pool, Role::User).await;
    let store = create_store(&pool, Some(a.id)).await;
    let other = create_store(&pool, Some(b.id)).await;

    let result = manager(&pool)
        .update_store(
            store.id,
            StoreChanges {
                name: Some(unique_store_name()),
                owner_id: Some(Some(b.id)),
                ..StoreChanges::default()
            },
        )
        .await;

    assert!(matches!(result, Err(DomainError::OwnerAlreadyAssigned)));
    let kept = stores::get_by_id(&pool, store.id).await.unwrap().unwrap();
    assert_eq!(kept.owner_id, Some(a.id));
    assert_eq!(kept.name, store.name);
    assert_eq!(role_of(&pool, a.id).await, Role::StoreOwner);
    assert_eq!(role_of(&pool, b.id).await, Role::StoreOwner);
    let b_store = stores::get_by_owner(&pool, b.id).await.unwrap().unwrap();
    assert_eq!(b_store.id, other.id);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_store_email_must_be_unique() {
    let pool = test_pool().await;
    let first = create_store(&pool, None).await;
    let second = create_store(&pool, None).await;

    let created = manager(&pool)
        .create_store(NewStore {
            name: unique_store_name(),
            email: first.email.as_str().to_uppercase(),
            address: "6 Side Street".to_owned(),
            owner_id: None,
        })
        .await;
    assert!(matches!(created, Err(DomainError::DuplicateEmail)));

    let updated = manager(&pool)
        .update_store(
            second.id,
            StoreChanges {
                email: Some(first.email.to_string()),
                ..StoreChanges::default()
            },
        )
        .await;
    assert!(matches!(updated, Err(DomainError::DuplicateEmail)));
    let kept = stores::get_by_id(&pool, second.id).await.unwrap().unwrap();
    assert_eq!(kept.email, second.email);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_delete_owner_while_reassigning_store() {
    let pool = test_pool().await;

    for _ in 0..10 {
        let a = create_user(&pool, Role::User).await;
        let b = create_user(&pool, Role::User).await;
        let store = create_store(&pool, Some(a.id)).await;
        let reassign = StoreChanges {
            owner_id: Some(Some(b.id)),
            ..StoreChanges::default()
        };

        let owners = manager(&pool);
        let (deleted, reassigned) = tokio::join!(
            owners.delete_user(a.id),
            owners.update_store(store.id, reassign),
        );

        // Either order is fine; neither side may fail on a lock conflict.
        deleted.unwrap();
        assert!(
            !matches!(reassigned, Err(DomainError::Repository(_))),
            "{reassigned:?}"
        );
        assert!(users::get_by_id(&pool, a.id).await.unwrap().is_none());
    }
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_store_filter_treats_wildcards_literally() {
    let pool = test_pool().await;
    create_store(&pool, None).await;

    let catalog = Catalog::new(&pool);
    for needle in ["%", "_"] {
        let listings = catalog
            .list_stores(
                StoreQuery {
                    name: Some(needle.to_owned()),
                    ..StoreQuery::default()
                },
                None,
            )
            .await
            .unwrap();
        assert!(
            listings.iter().all(|l| l.store.name.contains(needle)),
            "{needle} matched names without it"
        );
    }
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_manual_role_respects_ownership() {
    let pool = test_pool().await;
    let owner = create_user(&pool, Role::User).await;
    let plain = create_user(&pool, Role::User).await;
    create_store(&pool, Some(owner.id)).await;
    let catalog = Catalog::new(&pool);

    let demote = catalog
        .update_user(
            owner.id,
            UserChanges {
                role: Some(Role::User),
                ..UserChanges::default()
            },
        )
        .await;
    assert!(matches!(demote, Err(DomainError::InvalidRole(_))));

    let promote = catalog
        .update_user(
            plain.id,
            UserChanges {
                role: Some(Role::StoreOwner),
                ..UserChanges::default()
            },
        )
        .await;
    assert!(matches!(promote, Err(DomainError::InvalidRole(_))));

    let admin = catalog
        .update_user(
            plain.id,
            UserChanges {
                role: Some(Role::Admin),
                ..UserChanges::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(admin.role, Role::Admin);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_user_detail_includes_owned_store() {
    let pool = test_pool().await;
    let owner = create_user(&pool, Role::User).await;
    let rater = create_user(&pool, Role::User).await;
    let store = create_store(&pool, Some(owner.id)).await;
    RatingLedger::new(&pool)
        .submit(rater.id, store.id, 4_i64)
        .await
        .unwrap();

    let detail = Catalog::new(&pool).get_user(owner.id).await.unwrap();
    assert_eq!(detail.user.role, Role::StoreOwner);
    assert_eq!(detail.store.unwrap().id, store.id);
    assert_eq!(detail.store_average_rating.unwrap().to_string(), "4.0");
}

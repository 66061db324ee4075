//! Store ownership lifecycle.
//!
//! A user's `STORE_OWNER` role mirrors whether they own a store. This module is
//! the only writer of that role: every store create, update or delete computes
//! the role changes it implies with [`plan_assignment`] / [`plan_release`] and
//! applies them in the same transaction as the store mutation.
//!
//! ```text
//!   NoStore (USER) ──assigned as owner──▶ OwnsStore (STORE_OWNER)
//!   OwnsStore      ──reassigned/cleared/store deleted──▶ NoStore (USER)
//! ```
//!
//! Administrators are handled by [`AdminOwnershipPolicy`].

use serde::{Deserialize, Deserializer};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use storerate_core::{Role, StoreId, UserId};

use super::DomainError;
use super::validation::{INVALID_EMAIL, Validator};
use crate::db::stores::{NewStoreRecord, StoreUpdate};
use crate::db::{RepositoryError, STORE_EMAIL_KEY, STORE_OWNER_KEY, stores, users};
use crate::models::Store;

/// How ownership events treat users with the `ADMIN` role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminOwnershipPolicy {
    /// Admins may own a store but keep `ADMIN`; they are never demoted.
    #[default]
    Preserve,
    /// Admins assigned as owner become `STORE_OWNER` and lose admin rights.
    Promote,
}

impl AdminOwnershipPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Preserve => "preserve",
            Self::Promote => "promote",
        }
    }
}

impl std::fmt::Display for AdminOwnershipPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminOwnershipPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "promote" => Ok(Self::Promote),
            other => Err(format!("expected 'preserve' or 'promote', got '{other}'")),
        }
    }
}

/// The parts of a user that ownership transitions look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerSnapshot {
    pub id: UserId,
    pub role: Role,
}

/// A role write produced by an ownership transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChange {
    pub user_id: UserId,
    pub from: Role,
    pub to: Role,
}

/// Role change for a user who stops owning a store, if any.
#[must_use]
pub fn plan_release(owner: OwnerSnapshot) -> Option<RoleChange> {
    // An ADMIN still holding ADMIN here was kept by `Preserve`
    (owner.role == Role::StoreOwner).then_some(RoleChange {
        user_id: owner.id,
        from: Role::StoreOwner,
        to: Role::User,
    })
}

/// Role change for a user who becomes a store's owner, if any.
#[must_use]
pub fn plan_acquire(owner: OwnerSnapshot, policy: AdminOwnershipPolicy) -> Option<RoleChange> {
    match (owner.role, policy) {
        (Role::StoreOwner, _) | (Role::Admin, AdminOwnershipPolicy::Preserve) => None,
        (from, _) => Some(RoleChange {
            user_id: owner.id,
            from,
            to: Role::StoreOwner,
        }),
    }
}

/// Role changes for moving a store from `previous` to `next` owner.
///
/// Either side may be `None` (store had no owner / owner is being cleared).
/// Keeping the same owner changes nothing.
#[must_use]
pub fn plan_assignment(
    previous: Option<OwnerSnapshot>,
    next: Option<OwnerSnapshot>,
    policy: AdminOwnershipPolicy,
) -> Vec<RoleChange> {
    if previous.map(|o| o.id) == next.map(|o| o.id) {
        return Vec::new();
    }
    previous
        .and_then(plan_release)
        .into_iter()
        .chain(next.and_then(|o| plan_acquire(o, policy)))
        .collect()
}

/// A manually requested role that contradicts the user's ownership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RoleConflict(pub &'static str);

/// Check a role an admin sets by hand against the user's ownership status.
///
/// `STORE_OWNER` is only granted by assigning a store, and a user who owns a
/// store cannot be set back to `USER` while they keep it.
///
/// # Errors
///
/// Returns `RoleConflict` if the role would contradict ownership.
pub const fn resolve_manual_role(requested: Role, owns_store: bool) -> Result<Role, RoleConflict> {
    match (requested, owns_store) {
        (Role::StoreOwner, false) => Err(RoleConflict(
            "STORE_OWNER is granted by assigning the user a store",
        )),
        (Role::User, true) => Err(RoleConflict(
            "user owns a store; reassign or delete the store first",
        )),
        (role, _) => Ok(role),
    }
}

/// Fields for creating a store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    pub name: String,
    pub email: String,
    pub address: String,
    #[serde(default)]
    pub owner_id: Option<UserId>,
}

/// Partial store update. Absent fields are left unchanged; `ownerId: null`
/// clears the owner.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub owner_id: Option<Option<UserId>>,
}

/// Distinguish a missing field (`None`) from an explicit `null` (`Some(None)`).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Applies store mutations together with the role changes they imply.
pub struct OwnershipManager<'a> {
    pool: &'a PgPool,
    policy: AdminOwnershipPolicy,
}

impl<'a> OwnershipManager<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, policy: AdminOwnershipPolicy) -> Self {
        Self { pool, policy }
    }

    /// Create a store, promoting its owner if one is given.
    ///
    /// # Errors
    ///
    /// - `Validation` for malformed fields
    /// - `NotFound` if the owner does not exist
    /// - `OwnerAlreadyAssigned` if the owner already owns a store
    /// - `DuplicateEmail` if the store email is taken
    #[instrument(skip(self, new), fields(owner_id = ?new.owner_id))]
    pub async fn create_store(&self, new: NewStore) -> Result<Store, DomainError> {
        let mut v = Validator::new();
        v.store_name(&new.name).address(&new.address);
        let email = v.email(&new.email);
        v.finish()?;
        let email = email.ok_or_else(|| DomainError::Validation(vec![INVALID_EMAIL.into()]))?;

        let mut tx = self.pool.begin().await?;

        let owner = match new.owner_id {
            Some(id) => Some(lock_free_owner(&mut tx, id, None).await?),
            None => None,
        };

        let store = stores::create(
            &mut *tx,
            NewStoreRecord {
                name: new.name.trim(),
                email: &email,
                address: new.address.trim(),
                owner_id: new.owner_id,
            },
        )
        .await
        .map_err(store_write_error)?;

        apply(&mut tx, &plan_assignment(None, owner, self.policy)).await?;
        tx.commit().await?;

        tracing::info!(store_id = %store.id, "store created");
        Ok(store)
    }

    /// Update a store, moving ownership if `owner_id` changes.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the store or the new owner does not exist
    /// - `OwnerAlreadyAssigned` if the new owner owns another store
    /// - `DuplicateEmail` if the new email is taken
    /// - `Validation` for malformed fields
    #[instrument(skip(self, changes), fields(store_id = %id))]
    pub async fn update_store(&self, id: StoreId, changes: StoreChanges) -> Result<Store, DomainError> {
        let mut v = Validator::new();
        if let Some(name) = &changes.name {
            v.store_name(name);
        }
        if let Some(address) = &changes.address {
            v.address(address);
        }
        let email = changes.email.as_deref().and_then(|raw| v.email(raw));
        v.finish()?;

        let mut tx = self.pool.begin().await?;

        let current = stores::lock_by_id(&mut tx, id)
            .await?
            .ok_or(DomainError::NotFound("store"))?;

        let owner_change = changes
            .owner_id
            .filter(|requested| *requested != current.owner_id);

        let mut plan = Vec::new();
        if let Some(requested) = owner_change {
            let previous = match current.owner_id {
                Some(owner_id) => users::lock_by_id(&mut tx, owner_id).await?.map(|u| OwnerSnapshot {
                    id: u.id,
                    role: u.role,
                }),
                None => None,
            };
            let next = match requested {
                Some(owner_id) => Some(lock_free_owner(&mut tx, owner_id, Some(id)).await?),
                None => None,
            };
            plan = plan_assignment(previous, next, self.policy);
        }

        let store = stores::update(
            &mut *tx,
            id,
            StoreUpdate {
                name: changes.name.as_deref().map(str::trim),
                email: email.as_ref(),
                address: changes.address.as_deref().map(str::trim),
                owner_id: owner_change,
            },
        )
        .await
        .map_err(store_write_error)?
        .ok_or(DomainError::NotFound("store"))?;

        apply(&mut tx, &plan).await?;
        tx.commit().await?;

        tracing::info!(owner_changed = owner_change.is_some(), "store updated");
        Ok(store)
    }

    /// Delete a store and its ratings, demoting its owner.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the store does not exist.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn delete_store(&self, id: StoreId) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await?;

        let store = stores::lock_by_id(&mut tx, id)
            .await?
            .ok_or(DomainError::NotFound("store"))?;

        let owner = match store.owner_id {
            Some(owner_id) => users::lock_by_id(&mut tx, owner_id).await?,
            None => None,
        };

        stores::delete(&mut *tx, id).await?;

        let plan: Vec<RoleChange> = owner
            .and_then(|u| plan_release(OwnerSnapshot { id: u.id, role: u.role }))
            .into_iter()
            .collect();
        apply(&mut tx, &plan).await?;
        tx.commit().await?;

        tracing::info!("store deleted");
        Ok(())
    }

    /// Delete a user. Their ratings cascade; a store they owned is kept
    /// without an owner.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the user does not exist.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: UserId) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await?;

        // Store before user, the same order as the store operations.
        let orphaned = stores::lock_by_owner(&mut tx, id).await?;
        users::lock_by_id(&mut tx, id)
            .await?
            .ok_or(DomainError::NotFound("user"))?;

        users::delete(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(orphaned_store = ?orphaned.map(|s| s.id), "user deleted");
        Ok(())
    }
}

/// Lock a prospective owner and check they own no store other than `keeping`.
async fn lock_free_owner(
    conn: &mut PgConnection,
    user_id: UserId,
    keeping: Option<StoreId>,
) -> Result<OwnerSnapshot, DomainError> {
    let user = users::lock_by_id(conn, user_id)
        .await?
        .ok_or(DomainError::NotFound("user"))?;
    if let Some(owned) = stores::get_by_owner(&mut *conn, user_id).await?
        && Some(owned.id) != keeping
    {
        return Err(DomainError::OwnerAlreadyAssigned);
    }
    Ok(OwnerSnapshot {
        id: user.id,
        role: user.role,
    })
}

async fn apply(conn: &mut PgConnection, changes: &[RoleChange]) -> Result<(), DomainError> {
    for change in changes {
        users::set_role(&mut *conn, change.user_id, change.to).await?;
        tracing::info!(
            user_id = %change.user_id,
            from = %change.from,
            to = %change.to,
            "role changed by ownership transition"
        );
    }
    Ok(())
}

fn store_write_error(e: RepositoryError) -> DomainError {
    if e.is_conflict_on(STORE_EMAIL_KEY) {
        DomainError::DuplicateEmail
    } else if e.is_conflict_on(STORE_OWNER_KEY) {
        DomainError::OwnerAlreadyAssigned
    } else {
        DomainError::Repository(e)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const A: UserId = UserId::new(1);
    const B: UserId = UserId::new(2);

    const fn snap(id: UserId, role: Role) -> OwnerSnapshot {
        OwnerSnapshot { id, role }
    }

    #[test]
    fn test_assign_promotes_user() {
        let plan = plan_assignment(None, Some(snap(A, Role::User)), AdminOwnershipPolicy::Preserve);
        assert_eq!(
            plan,
            vec![RoleChange {
                user_id: A,
                from: Role::User,
                to: Role::StoreOwner
            }]
        );
    }

    #[test]
    fn test_reassign_demotes_old_and_promotes_new() {
        let plan = plan_assignment(
            Some(snap(A, Role::StoreOwner)),
            Some(snap(B, Role::User)),
            AdminOwnershipPolicy::Preserve,
        );
        assert_eq!(plan.len(), 2);
        assert!(plan.contains(&RoleChange {
            user_id: A,
            from: Role::StoreOwner,
            to: Role::User
        }));
        assert!(plan.contains(&RoleChange {
            user_id: B,
            from: Role::User,
            to: Role::StoreOwner
        }));
    }

    #[test]
    fn test_clearing_owner_demotes() {
        let plan = plan_assignment(Some(snap(A, Role::StoreOwner)), None, AdminOwnershipPolicy::Preserve);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.first().unwrap().to, Role::User);
    }

    #[test]
    fn test_same_owner_is_noop() {
        let plan = plan_assignment(
            Some(snap(A, Role::StoreOwner)),
            Some(snap(A, Role::StoreOwner)),
            AdminOwnershipPolicy::Promote,
        );
        assert!(plan.is_empty());
        assert!(plan_assignment(None, None, AdminOwnershipPolicy::Preserve).is_empty());
    }

    #[test]
    fn test_admin_preserved() {
        let policy = AdminOwnershipPolicy::Preserve;
        assert!(plan_assignment(None, Some(snap(A, Role::Admin)), policy).is_empty());
        assert!(plan_assignment(Some(snap(A, Role::Admin)), None, policy).is_empty());
    }

    #[test]
    fn test_admin_promoted_under_promote_policy() {
        let policy = AdminOwnershipPolicy::Promote;
        let plan = plan_assignment(None, Some(snap(A, Role::Admin)), policy);
        assert_eq!(
            plan,
            vec![RoleChange {
                user_id: A,
                from: Role::Admin,
                to: Role::StoreOwner
            }]
        );
        // Once promoted they are an ordinary owner and are demoted to USER.
        let plan = plan_assignment(Some(snap(A, Role::StoreOwner)), None, policy);
        assert_eq!(plan.first().unwrap().to, Role::User);
    }

    #[test]
    fn test_existing_store_owner_not_rewritten() {
        assert!(plan_acquire(snap(B, Role::StoreOwner), AdminOwnershipPolicy::Promote).is_none());
    }

    #[test]
    fn test_release_of_drifted_user_is_noop() {
        assert!(plan_release(snap(A, Role::User)).is_none());
    }

    #[test]
    fn test_resolve_manual_role() {
        assert_eq!(resolve_manual_role(Role::Admin, true).unwrap(), Role::Admin);
        assert_eq!(resolve_manual_role(Role::Admin, false).unwrap(), Role::Admin);
        assert_eq!(resolve_manual_role(Role::User, false).unwrap(), Role::User);
        assert_eq!(
            resolve_manual_role(Role::StoreOwner, true).unwrap(),
            Role::StoreOwner
        );
        assert!(resolve_manual_role(Role::StoreOwner, false).is_err());
        assert!(resolve_manual_role(Role::User, true).is_err());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "Promote".parse::<AdminOwnershipPolicy>().unwrap(),
            AdminOwnershipPolicy::Promote
        );
        assert_eq!(
            " preserve ".parse::<AdminOwnershipPolicy>().unwrap(),
            AdminOwnershipPolicy::Preserve
        );
        assert!("demote".parse::<AdminOwnershipPolicy>().is_err());
        assert_eq!(AdminOwnershipPolicy::default(), AdminOwnershipPolicy::Preserve);
    }

    #[test]
    fn test_store_changes_owner_tristate() {
        let absent: StoreChanges = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(absent.owner_id, None);

        let cleared: StoreChanges = serde_json::from_str(r#"{"ownerId": null}"#).unwrap();
        assert_eq!(cleared.owner_id, Some(None));

        let assigned: StoreChanges = serde_json::from_str(r#"{"ownerId": 7}"#).unwrap();
        assert_eq!(assigned.owner_id, Some(Some(UserId::new(7))));
    }

    #[test]
    fn test_store_write_error_mapping() {
        assert!(matches!(
            store_write_error(RepositoryError::Conflict(STORE_EMAIL_KEY.into())),
            DomainError::DuplicateEmail
        ));
        assert!(matches!(
            store_write_error(RepositoryError::Conflict(STORE_OWNER_KEY.into())),
            DomainError::OwnerAlreadyAssigned
        ));
        assert!(matches!(
            store_write_error(RepositoryError::NotFound),
            DomainError::Repository(_)
        ));
    }
}

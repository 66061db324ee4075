//! Demo data for local development.
//!
//! Creates an administrator, a handful of users and three store owners with
//! their stores, then has every user rate every store. Records that already
//! exist are skipped, so the command can be re-run.

use storerate_core::{RatingValue, Role, UserId};
use storerate_server::models::Store;
use storerate_server::services::DomainError;
use storerate_server::services::auth::{AuthError, AuthService, NewAccount};
use storerate_server::services::ledger::RatingLedger;
use storerate_server::services::ownership::{AdminOwnershipPolicy, NewStore, OwnershipManager};

use super::connect;

/// Password shared by every seeded account.
const DEMO_PASSWORD: &str = "Demo#Pass1";

const ADMIN: (&str, &str) = ("Platform Administrator", "admin@storerate.test");

const USERS: [(&str, &str); 5] = [
    ("Avery Thompson", "avery@storerate.test"),
    ("Blake Morrison", "blake@storerate.test"),
    ("Casey Robinson", "casey@storerate.test"),
    ("Devon Patterson", "devon@storerate.test"),
    ("Emerson Fletcher", "emerson@storerate.test"),
];

/// Owner name, owner email, store name, store email.
const STORES: [(&str, &str, &str, &str); 3] = [
    (
        "Harper Whitfield",
        "harper@storerate.test",
        "Whitfield Corner Grocery Market",
        "grocery@storerate.test",
    ),
    (
        "Jordan Castellano",
        "jordan@storerate.test",
        "Castellano Hardware and Garden Supply",
        "hardware@storerate.test",
    ),
    (
        "Morgan Ashworth",
        "morgan@storerate.test",
        "Ashworth Books and Coffee House",
        "books@storerate.test",
    ),
];

fn account(name: &str, email: &str) -> NewAccount {
    NewAccount {
        name: name.to_owned(),
        email: email.to_owned(),
        password: DEMO_PASSWORD.to_owned(),
        address: "100 Demo Avenue, Springfield".to_owned(),
    }
}

/// Create an account, returning `None` if the email is already registered.
async fn ensure_account(
    auth: &AuthService<'_>,
    name: &str,
    email: &str,
    role: Role,
) -> Result<Option<UserId>, AuthError> {
    match auth.create_account(account(name, email), role).await {
        Ok(user) => Ok(Some(user.id)),
        Err(AuthError::UserAlreadyExists) => {
            tracing::info!(email, "account exists, skipping");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Deterministic spread of values over 1..=5.
fn demo_value(user: usize, store: usize) -> i64 {
    let span = usize::from(RatingValue::MAX - RatingValue::MIN) + 1;
    i64::try_from((user * 2 + store) % span).unwrap_or_default() + i64::from(RatingValue::MIN)
}

/// Seed demo data.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a write fails for a
/// reason other than the record already existing.
pub async fn demo() -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;
    let policy = std::env::var("OWNERSHIP_ADMIN_POLICY")
        .ok()
        .map(|raw| raw.parse::<AdminOwnershipPolicy>())
        .transpose()?
        .unwrap_or_default();

    let auth = AuthService::new(&pool);
    let ownership = OwnershipManager::new(&pool, policy);
    let ledger = RatingLedger::new(&pool);

    ensure_account(&auth, ADMIN.0, ADMIN.1, Role::Admin).await?;

    let mut raters = Vec::new();
    for (name, email) in USERS {
        if let Some(id) = ensure_account(&auth, name, email, Role::User).await? {
            raters.push(id);
        }
    }

    let mut stores: Vec<Store> = Vec::new();
    for (owner_name, owner_email, store_name, store_email) in STORES {
        let Some(owner_id) = ensure_account(&auth, owner_name, owner_email, Role::User).await?
        else {
            continue;
        };
        let new = NewStore {
            name: store_name.to_owned(),
            email: store_email.to_owned(),
            address: format!("{} Market Street, Springfield", stores.len() + 1),
            owner_id: Some(owner_id),
        };
        match ownership.create_store(new).await {
            Ok(store) => stores.push(store),
            Err(DomainError::DuplicateEmail) => {
                tracing::info!(store_email, "store exists, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut submitted = 0_usize;
    for (i, user_id) in raters.iter().enumerate() {
        for (j, store) in stores.iter().enumerate() {
            match ledger.submit(*user_id, store.id, demo_value(i, j)).await {
                Ok(_) => submitted += 1,
                Err(DomainError::DuplicateRating) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    tracing::info!(
        users = raters.len(),
        stores = stores.len(),
        ratings = submitted,
        "Seed complete! Every account uses the password {DEMO_PASSWORD}"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_values_in_range() {
        for user in 0..USERS.len() {
            for store in 0..STORES.len() {
                assert!(RatingValue::try_from(demo_value(user, store)).is_ok());
            }
        }
    }

    #[test]
    fn test_demo_store_names_are_valid() {
        for (owner, _, store, _) in STORES {
            assert!((20..=60).contains(&store.chars().count()), "{store}");
            assert!((6..=60).contains(&owner.chars().count()), "{owner}");
        }
    }
}

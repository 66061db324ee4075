//! User roles.

use serde::{Deserialize, Serialize};

/// Role of a user account.
///
/// `StoreOwner` mirrors the store ownership relation and is only ever written
/// by the ownership lifecycle in the server crate. `Admin` is granted manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Manages users and stores.
    Admin,
    /// Rates stores.
    #[default]
    User,
    /// Owns exactly one store and can view its feedback.
    StoreOwner,
}

impl Role {
    /// All roles, in display order.
    pub const ALL: [Self; 3] = [Self::Admin, Self::User, Self::StoreOwner];

    /// Returns the canonical string form (`ADMIN`, `USER`, `STORE_OWNER`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
            Self::StoreOwner => "STORE_OWNER",
        }
    }

    /// Whether this role grants administrator rights.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether this role marks a current store owner.
    #[must_use]
    pub const fn is_store_owner(&self) -> bool {
        matches!(self, Self::StoreOwner)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "USER" => Ok(Self::User),
            "STORE_OWNER" => Ok(Self::StoreOwner),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

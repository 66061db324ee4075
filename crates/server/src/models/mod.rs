//! Domain models for the API.
//!
//! These types are what handlers return as JSON. Database row types live in
//! [`crate::db`] and convert into these.

pub mod rating;
pub mod session;
pub mod store;
pub mod user;

pub use rating::{Rating, RatingWithStore, RatingWithUser};
pub use session::CurrentUser;
pub use store::{Store, StoreDetail, StoreListing, StoreSummary};
pub use user::{User, UserDetail, UserSummary};

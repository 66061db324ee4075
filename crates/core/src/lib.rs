//! Storerate Core - Shared types and rating aggregation.
//!
//! This crate provides the types used across all Storerate components:
//! - `server` - JSON API for users, stores and ratings
//! - `cli` - Command-line tools for migrations, seeding and admin bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, roles and rating values
//! - [`stats`] - Aggregate statistics (average, count, distribution) over a store's ratings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod stats;
pub mod types;

pub use stats::{Distribution, RatingStats};
pub use types::*;

//! Core types for Storerate.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod average;
pub mod email;
pub mod id;
pub mod rating;
pub mod role;

pub use average::AverageRating;
pub use email::{Email, EmailError};
pub use id::*;
pub use rating::{RatingValue, RatingValueError};
pub use role::Role;

//! Rating value type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when converting input into a [`RatingValue`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RatingValueError {
    /// The number is a whole number outside `1..=5`.
    #[error("rating must be between {min} and {max} (got {value})")]
    OutOfRange {
        /// The rejected value.
        value: i64,
        /// Smallest accepted rating.
        min: u8,
        /// Largest accepted rating.
        max: u8,
    },
    /// The number has a fractional part, or is not finite.
    #[error("rating must be a whole number (got {0})")]
    NotAnInteger(f64),
    /// The input is not a number at all.
    #[error("rating must be a number")]
    NotANumber,
}

impl RatingValueError {
    const fn out_of_range(value: i64) -> Self {
        Self::OutOfRange {
            value,
            min: RatingValue::MIN,
            max: RatingValue::MAX,
        }
    }
}

/// A single star rating, always an integer in `1..=5`.
///
/// ## Examples
///
/// ```
/// use storerate_core::RatingValue;
///
/// assert_eq!(RatingValue::try_from(4_i64).unwrap().get(), 4);
/// assert!(RatingValue::try_from(6_i64).is_err());
/// assert!(RatingValue::try_from(4.5_f64).is_err());
/// assert!(RatingValue::try_from(4.0_f64).is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct RatingValue(u8);

impl RatingValue {
    /// Smallest accepted rating.
    pub const MIN: u8 = 1;
    /// Largest accepted rating.
    pub const MAX: u8 = 5;

    /// Create a rating from a small integer.
    ///
    /// # Errors
    ///
    /// Returns `RatingValueError::OutOfRange` unless `value` is in `1..=5`.
    pub const fn new(value: u8) -> Result<Self, RatingValueError> {
        if value < Self::MIN || value > Self::MAX {
            return Err(RatingValueError::out_of_range(value as i64));
        }
        Ok(Self(value))
    }

    /// Returns the rating as an integer.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Every possible rating, lowest first.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }

    /// Zero-based position of this rating in `1..=5`.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - Self::MIN) as usize
    }
}

impl fmt::Display for RatingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RatingValue> for u8 {
    fn from(value: RatingValue) -> Self {
        value.0
    }
}

impl From<RatingValue> for i16 {
    fn from(value: RatingValue) -> Self {
        Self::from(value.0)
    }
}

impl TryFrom<i64> for RatingValue {
    type Error = RatingValueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| RatingValueError::out_of_range(value))
            .and_then(Self::new)
    }
}

impl TryFrom<i16> for RatingValue {
    type Error = RatingValueError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<f64> for RatingValue {
    type Error = RatingValueError;

    #[allow(clippy::cast_possible_truncation)] // fract() == 0 and range checked below
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(RatingValueError::NotAnInteger(value));
        }
        if value < f64::from(Self::MIN) || value > f64::from(Self::MAX) {
            return Err(RatingValueError::out_of_range(value as i64));
        }
        Self::try_from(value as i64)
    }
}

impl TryFrom<&serde_json::Number> for RatingValue {
    type Error = RatingValueError;

    fn try_from(value: &serde_json::Number) -> Result<Self, Self::Error> {
        if let Some(n) = value.as_i64() {
            return Self::try_from(n);
        }
        if value.is_u64() {
            return Err(RatingValueError::out_of_range(i64::MAX));
        }
        value
            .as_f64()
            .ok_or(RatingValueError::NotANumber)
            .and_then(Self::try_from)
    }
}

/// Loose conversion from request bodies: numbers and numeric strings.
impl TryFrom<&serde_json::Value> for RatingValue {
    type Error = RatingValueError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Number(n) => Self::try_from(n),
            serde_json::Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| RatingValueError::NotANumber)
                .and_then(Self::try_from),
            _ => Err(RatingValueError::NotANumber),
        }
    }
}

// SQLx support (with postgres feature), stored as SMALLINT
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for RatingValue {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for RatingValue {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::try_from(raw)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for RatingValue {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&i16::from(*self), buf)
    }
}

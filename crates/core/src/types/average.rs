//! Average rating type.

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An average star rating rounded to one decimal place.
///
/// Computed in exact decimal arithmetic so that `10 / 3` is `3.3` and `7 / 2`
/// is `3.5` without binary floating point drift. Serialized as a JSON number.
///
/// ## Examples
///
/// ```
/// use storerate_core::AverageRating;
///
/// assert_eq!(AverageRating::from_sum(10, 3).to_string(), "3.3");
/// assert_eq!(AverageRating::from_sum(0, 0).to_string(), "0.0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AverageRating(Decimal);

impl AverageRating {
    /// The average of an empty rating set.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Average of `count` ratings summing to `sum`, or zero when `count` is 0.
    #[must_use]
    pub fn from_sum(sum: u64, count: u64) -> Self {
        if count == 0 {
            return Self::zero();
        }
        let avg = Decimal::from(sum) / Decimal::from(count);
        Self(avg.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Returns the value as a float for JSON output.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

impl fmt::Display for AverageRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl Serialize for AverageRating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for AverageRating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        let value = Decimal::from_f64_retain(raw)
            .ok_or_else(|| serde::de::Error::custom("average rating must be finite"))?;
        Ok(Self(value.round_dp_with_strategy(
            1,
            RoundingStrategy::MidpointAwayFromZero,
        )))
    }
}

//! Aggregate statistics over a store's ratings.
//!
//! Statistics are recomputed from the full rating set on every read. The
//! functions here are pure: the same input always yields the same output and
//! an empty input is not an error.
//!
//! ```
//! use storerate_core::{RatingStats, RatingValue};
//!
//! let values = [2, 4, 4].map(|v| RatingValue::new(v).unwrap());
//! let stats = RatingStats::from_values(values);
//!
//! assert_eq!(stats.average_rating.to_string(), "3.3");
//! assert_eq!(stats.rating_count, 3);
//! assert_eq!(stats.distribution.counts(), [0, 1, 0, 2, 0]);
//! ```

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{AverageRating, RatingValue};

/// Count of ratings per star value.
///
/// Serializes as an object keyed `"1"` through `"5"`; every key is always
/// present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Distribution([u64; 5]);

impl Distribution {
    /// Number of ratings with the given value.
    #[must_use]
    pub fn get(&self, value: RatingValue) -> u64 {
        self.0.get(value.index()).copied().unwrap_or_default()
    }

    /// Total number of ratings counted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Counts ordered from one star to five stars.
    #[must_use]
    pub const fn counts(&self) -> [u64; 5] {
        self.0
    }

    fn record(&mut self, value: RatingValue) {
        if let Some(slot) = self.0.get_mut(value.index()) {
            *slot += 1;
        }
    }

    fn weighted_sum(&self) -> u64 {
        RatingValue::all()
            .map(|value| u64::from(value.get()) * self.get(value))
            .sum()
    }
}

impl Serialize for Distribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for value in RatingValue::all() {
            map.serialize_entry(&value.get().to_string(), &self.get(value))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Distribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, u64>::deserialize(deserializer)?;
        let mut counts = [0_u64; 5];
        for (key, count) in raw {
            let value = key
                .parse::<i64>()
                .map_err(serde::de::Error::custom)
                .and_then(|n| RatingValue::try_from(n).map_err(serde::de::Error::custom))?;
            if let Some(slot) = counts.get_mut(value.index()) {
                *slot = count;
            }
        }
        Ok(Self(counts))
    }
}

/// Average, count and distribution for one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingStats {
    /// Mean value rounded to one decimal; `0.0` without ratings.
    pub average_rating: AverageRating,
    /// Number of ratings.
    pub rating_count: u64,
    /// Ratings per star value.
    pub distribution: Distribution,
}

impl RatingStats {
    /// Statistics of a store nobody has rated.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            average_rating: AverageRating::zero(),
            rating_count: 0,
            distribution: Distribution([0; 5]),
        }
    }

    /// Aggregate a collection of ratings. Order does not matter.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = RatingValue>,
    {
        let mut distribution = Distribution::default();
        for value in values {
            distribution.record(value);
        }
        let rating_count = distribution.total();
        Self {
            average_rating: AverageRating::from_sum(distribution.weighted_sum(), rating_count),
            rating_count,
            distribution,
        }
    }

    /// Aggregate pre-grouped `(value, count)` pairs, as returned by a
    /// `GROUP BY value` query. Repeated values are summed.
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (RatingValue, u64)>,
    {
        let mut distribution = Distribution::default();
        for (value, count) in counts {
            if let Some(slot) = distribution.0.get_mut(value.index()) {
                *slot += count;
            }
        }
        let rating_count = distribution.total();
        Self {
            average_rating: AverageRating::from_sum(distribution.weighted_sum(), rating_count),
            rating_count,
            distribution,
        }
    }

    /// Shortcut for list views that only show the average.
    pub fn average_of<I>(values: I) -> AverageRating
    where
        I: IntoIterator<Item = RatingValue>,
    {
        Self::from_values(values).average_rating
    }
}

impl Default for RatingStats {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<RatingValue> for RatingStats {
    fn from_iter<T: IntoIterator<Item = RatingValue>>(iter: T) -> Self {
        Self::from_values(iter)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn values(raw: &[u8]) -> Vec<RatingValue> {
        raw.iter().map(|v| RatingValue::new(*v).unwrap()).collect()
    }

    #[test]
    fn test_empty_set() {
        let stats = RatingStats::from_values(Vec::new());
        assert_eq!(stats, RatingStats::empty());
        assert_eq!(
            serde_json::to_value(stats).unwrap(),
            json!({
                "averageRating": 0.0,
                "ratingCount": 0,
                "distribution": {"1": 0, "2": 0, "3": 0, "4": 0, "5": 0}
            })
        );
    }

    #[test]
    fn test_two_four_four() {
        let stats = RatingStats::from_values(values(&[2, 4, 4]));
        assert_eq!(
            serde_json::to_value(stats).unwrap(),
            json!({
                "averageRating": 3.3,
                "ratingCount": 3,
                "distribution": {"1": 0, "2": 1, "3": 0, "4": 2, "5": 0}
            })
        );
    }

    #[test]
    fn test_distribution_sums_to_count() {
        let input = values(&[1, 5, 5, 3, 2, 2, 4, 1, 5]);
        let stats = RatingStats::from_values(input.clone());
        assert_eq!(stats.distribution.total(), stats.rating_count);
        assert_eq!(stats.rating_count, input.len() as u64);
        assert_eq!(stats.distribution.get(RatingValue::new(5).unwrap()), 3);
    }

    #[test]
    fn test_matches_rounded_mean() {
        let cases: &[&[u8]] = &[&[5], &[1, 2], &[3, 3, 4], &[1, 1, 1, 2], &[2, 3, 3, 3, 5, 5]];
        for case in cases {
            let stats = RatingStats::from_values(values(case));
            let sum: u64 = case.iter().map(|v| u64::from(*v)).sum();
            let expected = AverageRating::from_sum(sum, case.len() as u64);
            assert_eq!(stats.average_rating, expected);
        }
    }

    #[test]
    fn test_order_independent_and_idempotent() {
        let forward = RatingStats::from_values(values(&[1, 2, 5, 4]));
        let backward = RatingStats::from_values(values(&[4, 5, 2, 1]));
        assert_eq!(forward, backward);
        assert_eq!(forward, RatingStats::from_values(values(&[1, 2, 5, 4])));
    }

    #[test]
    fn test_average_of() {
        assert_eq!(
            RatingStats::average_of(values(&[4, 5])).to_string(),
            "4.5"
        );
        assert_eq!(RatingStats::average_of(Vec::new()), AverageRating::zero());
    }

    #[test]
    fn test_from_counts_matches_from_values() {
        let grouped = [
            (RatingValue::new(4).unwrap(), 2),
            (RatingValue::new(2).unwrap(), 1),
        ];
        assert_eq!(
            RatingStats::from_counts(grouped),
            RatingStats::from_values(values(&[2, 4, 4]))
        );
        assert_eq!(RatingStats::from_counts([]), RatingStats::empty());
    }

    #[test]
    fn test_collects_from_iterator() {
        let stats: RatingStats = values(&[3, 3]).into_iter().collect();
        assert_eq!(stats.rating_count, 2);
        assert_eq!(stats.average_rating.to_string(), "3.0");
    }

    #[test]
    fn test_distribution_deserialize() {
        let parsed: Distribution =
            serde_json::from_value(json!({"1": 0, "2": 1, "3": 0, "4": 2, "5": 0})).unwrap();
        assert_eq!(parsed.counts(), [0, 1, 0, 2, 0]);
        assert!(serde_json::from_value::<Distribution>(json!({"7": 1})).is_err());
    }
}

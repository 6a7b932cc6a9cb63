//! Bayesian-weighted level ratings.
//!
//! A level with few votes is pulled towards the site-wide mean `m` with the
//! strength of `C` phantom votes:
//!
//! ```text
//! display = (C * m + sum) / (C + n)
//! ```

use serde::Serialize;

pub const MIN_LEVEL_RATING: i64 = 1;
pub const MAX_LEVEL_RATING: i64 = 10;

/// Prior used by [`weighted_rating`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prior {
    /// Global mean of every submitted rating.
    pub mean: f64,
    /// Number of phantom votes at `mean`.
    pub weight: f64,
}

/// Returns `None` when the level has no ratings.
pub fn weighted_rating(sum: f64, count: u64, prior: Prior) -> Option<f64> {
    if count == 0 {
        return None;
    }
    let n = count as f64;
    Some((prior.weight * prior.mean + sum) / (prior.weight + n))
}

/// Per-level rating aggregate, as returned by the ratings endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    /// Bayesian display rating.
    pub average: Option<f64>,
    /// Plain arithmetic mean.
    pub raw_average: Option<f64>,
    pub total: u64,
    /// `distribution[i]` counts votes of `i + 1`.
    pub distribution: [u64; 10],
    /// The viewer's own vote, when signed in.
    pub own: Option<i64>,
}

impl RatingSummary {
    /// Builds the summary from `(rating, count)` buckets.
    pub fn from_buckets(buckets: &[(i64, i64)], prior: Prior, own: Option<i64>) -> Self {
        let mut distribution = [0u64; 10];
        for &(rating, count) in buckets {
            if (MIN_LEVEL_RATING..=MAX_LEVEL_RATING).contains(&rating) && count > 0 {
                distribution[(rating - 1) as usize] += count as u64;
            }
        }

        let total: u64 = distribution.iter().sum();
        let sum: f64 = distribution
            .iter()
            .enumerate()
            .map(|(i, &c)| (i as f64 + 1.0) * c as f64)
            .sum();

        Self {
            average: weighted_rating(sum, total, prior),
            raw_average: (total > 0).then(|| sum / total as f64),
            total,
            distribution,
            own,
        }
    }
}

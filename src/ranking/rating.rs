//! Performance rating of records and players.
//!
//! A record's rating is the chart difficulty shifted by an accuracy offset.
//! The offset curve is piecewise linear between the knots below and flat
//! above the last one. A player's rating averages their best records.

/// `(accuracy, offset)` knots, ascending by accuracy.
const ACCURACY_OFFSETS: [(f64, f64); 8] = [
    (0.70, -7.0),
    (0.80, -4.0),
    (0.90, -1.5),
    (0.95, 0.0),
    (0.97, 0.5),
    (0.98, 1.0),
    (0.99, 1.5),
    (0.997, 2.0),
];

/// Below this accuracy a record is worth nothing.
pub const MIN_RATED_ACCURACY: f64 = 0.70;

/// Offset added to the difficulty for a given accuracy.
///
/// Returns `None` below [`MIN_RATED_ACCURACY`].
pub fn accuracy_offset(accuracy: f64) -> Option<f64> {
    if !(accuracy >= MIN_RATED_ACCURACY) {
        return None;
    }

    let (last_acc, last_offset) = ACCURACY_OFFSETS[ACCURACY_OFFSETS.len() - 1];
    if accuracy >= last_acc {
        return Some(last_offset);
    }

    ACCURACY_OFFSETS.windows(2).find_map(|pair| {
        let (lo_acc, lo_off) = pair[0];
        let (hi_acc, hi_off) = pair[1];
        (accuracy >= lo_acc && accuracy < hi_acc)
            .then(|| lo_off + (accuracy - lo_acc) / (hi_acc - lo_acc) * (hi_off - lo_off))
    })
}

/// Rating of a single record. Never negative.
pub fn record_rating(accuracy: f64, difficulty: f64) -> f64 {
    match accuracy_offset(accuracy) {
        Some(offset) => (difficulty + offset).max(0.0),
        None => 0.0,
    }
}

/// Player rating: the `top_n` best record ratings summed and divided by
/// `top_n`, so missing slots count as zero.
///
/// `ratings` should already hold one value per chart (the player's best).
pub fn player_rating(ratings: &[f64], top_n: usize) -> f64 {
    if top_n == 0 {
        return 0.0;
    }

    let mut sorted: Vec<f64> = ratings.iter().copied().filter(|r| r.is_finite()).collect();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let sum: f64 = sorted.iter().take(top_n).sum();
    sum / top_n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_knots_are_exact() {
        for (acc, offset) in ACCURACY_OFFSETS {
            assert!(approx(accuracy_offset(acc).unwrap(), offset), "acc {acc}");
        }
    }

    #[test]
    fn test_interpolation() {
        // halfway between 0.95 (0.0) and 0.97 (0.5)
        assert!(approx(accuracy_offset(0.96).unwrap(), 0.25));
        // halfway between 0.80 (-4.0) and 0.90 (-1.5)
        assert!(approx(accuracy_offset(0.85).unwrap(), -2.75));
    }

    #[test]
    fn test_flat_above_last_knot() {
        assert_eq!(accuracy_offset(1.0), Some(2.0));
        assert_eq!(record_rating(1.0, 12.0), 14.0);
    }

    #[test]
    fn test_below_threshold_is_zero() {
        assert_eq!(accuracy_offset(0.69), None);
        assert_eq!(record_rating(0.5, 15.0), 0.0);
        assert_eq!(record_rating(f64::NAN, 15.0), 0.0);
    }

    #[test]
    fn test_rating_clamped_at_zero() {
        assert_eq!(record_rating(0.70, 3.0), 0.0);
    }

    #[test]
    fn test_monotonic_in_accuracy() {
        let mut prev = 0.0;
        for i in 700..=1000 {
            let r = record_rating(i as f64 / 1000.0, 10.0);
            assert!(r >= prev);
            prev = r;
        }
    }

    #[test]
    fn test_player_rating_divides_by_top_n() {
        assert!(approx(player_rating(&[12.0, 10.0], 4), 5.5));
        assert!(approx(player_rating(&[1.0, 5.0, 3.0, 4.0], 2), 4.5));
        assert_eq!(player_rating(&[], 30), 0.0);
    }
}

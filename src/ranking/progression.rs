//! Experience and level progression.
//!
//! Exp is never stored; it is recomputed from a player's ranked records:
//!
//! - every play earns `floor(difficulty * 10 * (score / 1e6)^2)`,
//! - the first clear (best score >= 600 000) of a chart adds `difficulty * 20`.
//!
//! Advancing from level `L` to `L + 1` costs `floor(100 + 50 * L^1.6)` exp.

use crate::ranking::grade::MAX_SCORE;
use serde::Serialize;
use std::collections::HashMap;

pub const MAX_LEVEL: u32 = 999;
pub const CLEAR_SCORE: i64 = 600_000;

/// One ranked play as seen by the exp formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpSample {
    pub chart_id: i64,
    pub difficulty: i64,
    pub score: i64,
}

pub fn play_exp(difficulty: i64, score: i64) -> u64 {
    // integer math keeps exact squares such as 0.7^2 from flooring down
    let score = score.clamp(0, MAX_SCORE) as u128;
    let max = MAX_SCORE as u128;
    (difficulty.max(0) as u128 * 10 * score * score / (max * max)) as u64
}

pub fn clear_bonus(difficulty: i64) -> u64 {
    difficulty.max(0) as u64 * 20
}

/// Total exp earned by a play history.
pub fn total_exp(history: &[ExpSample]) -> u64 {
    let mut best: HashMap<i64, (i64, i64)> = HashMap::new();
    let mut exp = 0u64;

    for sample in history {
        exp += play_exp(sample.difficulty, sample.score);
        let entry = best
            .entry(sample.chart_id)
            .or_insert((sample.difficulty, sample.score));
        entry.1 = entry.1.max(sample.score);
    }

    exp + best
        .values()
        .filter(|(_, score)| *score >= CLEAR_SCORE)
        .map(|(difficulty, _)| clear_bonus(*difficulty))
        .sum::<u64>()
}

/// Exp earned by one new play on top of an existing history.
pub fn exp_gain(history: &[ExpSample], new_play: ExpSample) -> u64 {
    let before = total_exp(history);
    let mut with_new = history.to_vec();
    with_new.push(new_play);
    total_exp(&with_new).saturating_sub(before)
}

/// Exp needed to advance from `level` to `level + 1`.
pub fn exp_to_next(level: u32) -> u64 {
    (100.0 + 50.0 * (level as f64).powf(1.6)).floor() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    pub total_exp: u64,
    /// Exp accumulated inside the current level.
    pub level_exp: u64,
    /// Exp the current level requires in total; 0 at the cap.
    pub next_level_exp: u64,
    pub progress: f64,
}

pub fn progress(total_exp: u64) -> LevelProgress {
    let mut level = 1;
    let mut remaining = total_exp;

    while level < MAX_LEVEL {
        let cost = exp_to_next(level);
        if remaining < cost {
            return LevelProgress {
                level,
                total_exp,
                level_exp: remaining,
                next_level_exp: cost,
                progress: remaining as f64 / cost as f64,
            };
        }
        remaining -= cost;
        level += 1;
    }

    LevelProgress {
        level: MAX_LEVEL,
        total_exp,
        level_exp: remaining,
        next_level_exp: 0,
        progress: 1.0,
    }
}

//! Aggregation of a player's record history into profile statistics.

use crate::ranking::grade::Grade;
use crate::ranking::progression::{self, ExpSample, LevelProgress};
use crate::ranking::rating::player_rating;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

/// The columns of a record the profile needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayedRecord {
    pub id: i64,
    pub chart_id: i64,
    pub difficulty: i64,
    pub score: i64,
    pub accuracy: f64,
    pub max_combo: i64,
    pub ranked: bool,
    pub rating: f64,
    pub created_at: i64,
}

impl PlayedRecord {
    /// Leaderboard order: higher score, then earlier play, then lower id.
    fn beats(&self, other: &PlayedRecord) -> bool {
        (Reverse(self.score), self.created_at, self.id)
            < (Reverse(other.score), other.created_at, other.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub total_plays: u64,
    pub ranked_plays: u64,
    pub total_score: i64,
    /// Mean accuracy of ranked plays.
    pub average_accuracy: Option<f64>,
    pub cleared_charts: u64,
    pub max_combo: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub rating: f64,
    pub exp: LevelProgress,
    pub activity: Activity,
    /// Grade counts over the best ranked record of each chart.
    pub grades: BTreeMap<Grade, u64>,
}

/// Best ranked record per chart, picked the way the leaderboard picks it.
pub fn best_per_chart(records: &[PlayedRecord]) -> Vec<PlayedRecord> {
    let mut best: HashMap<i64, PlayedRecord> = HashMap::new();
    for record in records.iter().filter(|r| r.ranked) {
        best.entry(record.chart_id)
            .and_modify(|current| {
                if record.beats(current) {
                    *current = *record;
                }
            })
            .or_insert(*record);
    }

    let mut out: Vec<PlayedRecord> = best.into_values().collect();
    out.sort_by_key(|r| r.chart_id);
    out
}

pub fn summarize(records: &[PlayedRecord], rating_top_n: usize) -> ProfileSummary {
    let ranked: Vec<&PlayedRecord> = records.iter().filter(|r| r.ranked).collect();
    let best = best_per_chart(records);

    let ratings: Vec<f64> = best.iter().map(|r| r.rating).collect();

    let samples: Vec<ExpSample> = ranked
        .iter()
        .map(|r| ExpSample {
            chart_id: r.chart_id,
            difficulty: r.difficulty,
            score: r.score,
        })
        .collect();

    let mut grades: BTreeMap<Grade, u64> = Grade::ALL.iter().map(|&g| (g, 0)).collect();
    for record in &best {
        *grades.entry(Grade::from_score(record.score)).or_default() += 1;
    }

    let average_accuracy = (!ranked.is_empty())
        .then(|| ranked.iter().map(|r| r.accuracy).sum::<f64>() / ranked.len() as f64);

    ProfileSummary {
        rating: player_rating(&ratings, rating_top_n),
        exp: progression::progress(progression::total_exp(&samples)),
        activity: Activity {
            total_plays: records.len() as u64,
            ranked_plays: ranked.len() as u64,
            total_score: ranked.iter().map(|r| r.score).sum(),
            average_accuracy,
            cleared_charts: best
                .iter()
                .filter(|r| Grade::from_score(r.score).is_clear())
                .count() as u64,
            max_combo: records.iter().map(|r| r.max_combo).max().unwrap_or(0),
        },
        grades,
    }
}

//! Judgement counts and accuracy.
//!
//! Clients submit the raw judgement counts of a play; accuracy is always
//! derived here so a record cannot claim more than its judgements allow.

use serde::{Deserialize, Serialize};

/// Hit judgement types from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Judgement {
    Perfect,
    Great,
    Good,
    Bad,
    Miss,
}

impl Judgement {
    /// Points awarded out of a maximum of 6.
    pub const fn weight(self) -> u32 {
        match self {
            Judgement::Perfect => 6,
            Judgement::Great => 4,
            Judgement::Good => 2,
            Judgement::Bad => 1,
            Judgement::Miss => 0,
        }
    }
}

/// Judgement breakdown of a submitted play.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitStats {
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub bad: u32,
    pub miss: u32,
    pub max_combo: u32,
}

impl HitStats {
    pub fn count(&self, judgement: Judgement) -> u32 {
        match judgement {
            Judgement::Perfect => self.perfect,
            Judgement::Great => self.great,
            Judgement::Good => self.good,
            Judgement::Bad => self.bad,
            Judgement::Miss => self.miss,
        }
    }

    /// Number of judged notes.
    pub fn total(&self) -> u64 {
        [self.perfect, self.great, self.good, self.bad, self.miss]
            .iter()
            .map(|&n| n as u64)
            .sum()
    }

    /// Calculates accuracy as a fraction in `[0, 1]`.
    ///
    /// Uses a weighted formula:
    /// - Perfect: 6 points
    /// - Great: 4 points
    /// - Good: 2 points
    /// - Bad: 1 point
    /// - Miss: 0 points
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }

        let score: u64 = [
            Judgement::Perfect,
            Judgement::Great,
            Judgement::Good,
            Judgement::Bad,
            Judgement::Miss,
        ]
        .into_iter()
        .map(|j| self.count(j) as u64 * j.weight() as u64)
        .sum();

        score as f64 / (total as f64 * 6.0)
    }

    /// True when every note was hit without a break.
    pub fn is_full_combo(&self) -> bool {
        self.miss == 0 && self.bad == 0 && self.total() > 0
    }
}

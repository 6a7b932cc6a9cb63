//! Letter grades derived from a record's score.

use serde::{Deserialize, Serialize};

/// Highest possible score of a play.
pub const MAX_SCORE: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    Max,
    Sss,
    Ss,
    S,
    Aa,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Best to worst.
    pub const ALL: [Grade; 10] = [
        Grade::Max,
        Grade::Sss,
        Grade::Ss,
        Grade::S,
        Grade::Aa,
        Grade::A,
        Grade::B,
        Grade::C,
        Grade::D,
        Grade::F,
    ];

    pub fn from_score(score: i64) -> Self {
        match score {
            s if s >= MAX_SCORE => Grade::Max,
            s if s >= 999_500 => Grade::Sss,
            s if s >= 990_000 => Grade::Ss,
            s if s >= 950_000 => Grade::S,
            s if s >= 900_000 => Grade::Aa,
            s if s >= 800_000 => Grade::A,
            s if s >= 700_000 => Grade::B,
            s if s >= 600_000 => Grade::C,
            s if s >= 500_000 => Grade::D,
            _ => Grade::F,
        }
    }

    /// C or better counts as a clear.
    pub fn is_clear(self) -> bool {
        self <= Grade::C
    }
}

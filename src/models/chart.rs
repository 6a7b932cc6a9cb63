//! Chart types a level can carry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_DIFFICULTY: i64 = 1;
pub const MAX_DIFFICULTY: i64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Easy,
    Hard,
    Extreme,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Easy => "easy",
            ChartType::Hard => "hard",
            ChartType::Extreme => "extreme",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(ChartType::Easy),
            "hard" => Ok(ChartType::Hard),
            "extreme" => Ok(ChartType::Extreme),
            other => Err(format!("Unknown chart type: {other}")),
        }
    }
}

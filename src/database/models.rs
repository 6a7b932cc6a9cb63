//! Data structures mirroring the SQLite tables.

use crate::models::{HitStats, Mod};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub password_salt: String,
    pub created_at: i64,
}

/// What other players may see about a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub created_at: i64,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Level {
    pub id: i64,
    pub uid: String,
    pub owner_id: i64,
    pub title: String,
    pub artist: String,
    pub charter: String,
    pub description: String,
    /// JSON array of strings.
    pub tags: String,
    pub published: bool,
    pub created_at: i64,
    pub modified_at: i64,
}

impl Level {
    pub fn tag_list(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }
}

/// Level row joined with the aggregates listings need.
#[derive(Debug, Clone, FromRow)]
pub struct LevelListRow {
    #[sqlx(flatten)]
    pub level: Level,
    pub owner_name: String,
    pub plays: i64,
    pub rating_sum: i64,
    pub rating_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Chart {
    pub id: i64,
    pub chart_type: String,
    pub difficulty: i64,
    pub notes_count: i64,
    pub checksum: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Record {
    pub id: i64,
    pub score: i64,
    pub accuracy: f64,
    /// JSON array of [`Mod`].
    pub mods: String,
    pub ranked: bool,
    pub perfect: i64,
    pub great: i64,
    pub good: i64,
    pub bad: i64,
    pub miss: i64,
    pub max_combo: i64,
    pub rating: f64,
    pub replay_hash: Option<String>,
    pub created_at: i64,
}

impl Record {
    pub fn mod_list(&self) -> Vec<Mod> {
        serde_json::from_str(&self.mods).unwrap_or_default()
    }

    pub fn hit_stats(&self) -> HitStats {
        let n = |v: i64| v.clamp(0, u32::MAX as i64) as u32;
        HitStats {
            perfect: n(self.perfect),
            great: n(self.great),
            good: n(self.good),
            bad: n(self.bad),
            miss: n(self.miss),
            max_combo: n(self.max_combo),
        }
    }
}

/// Values of a record about to be inserted.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub chart_id: i64,
    pub owner_id: i64,
    pub score: i64,
    pub accuracy: f64,
    pub mods: Vec<Mod>,
    pub ranked: bool,
    pub stats: HitStats,
    pub rating: f64,
    pub replay_hash: Option<String>,
    pub created_at: i64,
}

/// Record with the context needed to display it outside a leaderboard.
#[derive(Debug, Clone, FromRow)]
pub struct RecordDetail {
    #[sqlx(flatten)]
    pub record: Record,
    pub owner_name: String,
    pub level_uid: String,
    pub level_title: String,
    pub chart_type: String,
    pub difficulty: i64,
}

/// One row of a chart leaderboard.
#[derive(Debug, Clone, FromRow)]
pub struct LeaderboardRow {
    pub rank: i64,
    #[sqlx(flatten)]
    pub record: Record,
    pub owner_name: String,
}

/// A record joined with its chart difficulty, for exp and profile math.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
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


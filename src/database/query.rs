//! Raw sqlx query helpers for the persistent database layer.

use crate::database::models::{
    Chart, HistoryRow, LeaderboardRow, Level, LevelListRow, NewRecord, Record, RecordDetail,
    User,
};
use crate::models::ChartType;
use crate::ranking::{Page, Prior, RankWindow};
use sqlx::SqlitePool;

const RECORD_COLUMNS: &str = "r.id, r.score, r.accuracy, r.mods, r.ranked, \
     r.perfect, r.great, r.good, r.bad, r.miss, r.max_combo, r.rating, r.replay_hash, r.created_at";

const LEVEL_COLUMNS: &str = "l.id, l.uid, l.owner_id, l.title, l.artist, l.charter, l.description, \
     l.tags, l.published, l.created_at, l.modified_at";

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.password_salt, u.created_at";

/// Best ranked record per player on chart `?1`, numbered by leaderboard
/// position. Ties on score go to the earlier record.
const LEADERBOARD_CTE: &str = "WITH best AS (
        SELECT records.*, ROW_NUMBER() OVER (
            PARTITION BY owner_id ORDER BY score DESC, created_at ASC, id ASC
        ) AS user_pos
        FROM records
        WHERE chart_id = ?1 AND ranked = 1
    ), board AS (
        SELECT best.*, ROW_NUMBER() OVER (
            ORDER BY score DESC, created_at ASC, id ASC
        ) AS position
        FROM best
        WHERE user_pos = 1
    )";

// ============================================================================
// USERS & SESSIONS
// ============================================================================

pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    email: Option<&str>,
    password_hash: &str,
    password_salt: &str,
    created_at: i64,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash, password_salt, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(password_salt)
    .bind(created_at)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Case-insensitive lookup (the column is `COLLATE NOCASE`).
pub async fn get_user_by_name(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn insert_session(
    pool: &SqlitePool,
    token_hash: &str,
    user_id: i64,
    created_at: i64,
    expires_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(token_hash)
    .bind(user_id)
    .bind(created_at)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// User owning a non-expired session.
pub async fn get_session_user(
    pool: &SqlitePool,
    token_hash: &str,
    now: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM sessions s JOIN users u ON u.id = s.user_id
         WHERE s.token_hash = ?1 AND s.expires_at > ?2"
    ))
    .bind(token_hash)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &SqlitePool, token_hash: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?1")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn purge_expired_sessions(pool: &SqlitePool, now: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ============================================================================
// LEVELS & CHARTS
// ============================================================================

/// Values of a level about to be published.
#[derive(Debug, Clone)]
pub struct NewLevel<'a> {
    pub uid: &'a str,
    pub owner_id: i64,
    pub title: &'a str,
    pub artist: &'a str,
    pub charter: &'a str,
    pub description: &'a str,
    pub tags: &'a str,
    pub published: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewChart {
    pub chart_type: ChartType,
    pub difficulty: i64,
    pub notes_count: i64,
    pub checksum: String,
}

/// Inserts a level and its charts atomically.
pub async fn insert_level(
    pool: &SqlitePool,
    level: &NewLevel<'_>,
    charts: &[NewChart],
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO levels (uid, owner_id, title, artist, charter, description, tags, published, created_at, modified_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
    )
    .bind(level.uid)
    .bind(level.owner_id)
    .bind(level.title)
    .bind(level.artist)
    .bind(level.charter)
    .bind(level.description)
    .bind(level.tags)
    .bind(level.published)
    .bind(level.created_at)
    .execute(&mut *tx)
    .await?;
    let level_id = result.last_insert_rowid();

    for chart in charts {
        sqlx::query(
            "INSERT INTO charts (level_id, chart_type, difficulty, notes_count, checksum) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(level_id)
        .bind(chart.chart_type.as_str())
        .bind(chart.difficulty)
        .bind(chart.notes_count)
        .bind(&chart.checksum)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(level_id)
}

pub async fn get_level_by_uid(pool: &SqlitePool, uid: &str) -> Result<Option<Level>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {LEVEL_COLUMNS} FROM levels l WHERE l.uid = ?1"))
        .bind(uid)
        .fetch_optional(pool)
        .await
}

pub async fn get_charts_for_level(
    pool: &SqlitePool,
    level_id: i64,
) -> Result<Vec<Chart>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, chart_type, difficulty, notes_count, checksum FROM charts
         WHERE level_id = ?1 ORDER BY difficulty, id",
    )
    .bind(level_id)
    .fetch_all(pool)
    .await
}

pub async fn get_chart(
    pool: &SqlitePool,
    level_id: i64,
    chart_type: ChartType,
) -> Result<Option<Chart>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, chart_type, difficulty, notes_count, checksum FROM charts
         WHERE level_id = ?1 AND chart_type = ?2",
    )
    .bind(level_id)
    .bind(chart_type.as_str())
    .fetch_optional(pool)
    .await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSort {
    CreationDate,
    ModificationDate,
    Rating,
    Plays,
    Title,
    Difficulty,
}

#[derive(Debug, Clone)]
pub struct LevelFilter {
    pub search: Option<String>,
    pub owner: Option<String>,
    pub sort: LevelSort,
    pub descending: bool,
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self {
            search: None,
            owner: None,
            sort: LevelSort::CreationDate,
            descending: true,
        }
    }
}

/// `%term%` for a LIKE match where `%`, `_` and `\` in `term` are literal.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Lists published levels with play and rating aggregates.
///
/// Rating order uses the same Bayesian formula as the display rating;
/// unrated levels always come last.
pub async fn list_levels(
    pool: &SqlitePool,
    filter: &LevelFilter,
    prior: Prior,
    page: Page,
) -> Result<(i64, Vec<LevelListRow>), sqlx::Error> {
    let search = filter
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();
    let search_like = like_pattern(&search);
    let owner = filter.owner.as_deref().unwrap_or("").trim().to_string();

    let where_clause = "l.published = 1
        AND (?1 = '' OR LOWER(l.title) LIKE ?2 ESCAPE '\\'
             OR LOWER(l.artist) LIKE ?2 ESCAPE '\\'
             OR LOWER(l.charter) LIKE ?2 ESCAPE '\\'
             OR LOWER(l.uid) LIKE ?2 ESCAPE '\\')
        AND (?3 = '' OR u.username = ?3)";

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM levels l JOIN users u ON u.id = l.owner_id WHERE {where_clause}"
    ))
    .bind(&search)
    .bind(&search_like)
    .bind(&owner)
    .fetch_one(pool)
    .await?;

    let dir = if filter.descending { "DESC" } else { "ASC" };
    let order = match filter.sort {
        LevelSort::CreationDate => format!("created_at {dir}"),
        LevelSort::ModificationDate => format!("modified_at {dir}"),
        LevelSort::Title => format!("title COLLATE NOCASE {dir}"),
        LevelSort::Plays => format!("plays {dir}"),
        LevelSort::Difficulty => format!("max_difficulty {dir}"),
        LevelSort::Rating => {
            format!("rating_count = 0, (?4 * ?5 + rating_sum) * 1.0 / (?4 + rating_count) {dir}")
        }
    };

    let sql = format!(
        r#"
        SELECT * FROM (
            SELECT {LEVEL_COLUMNS},
                u.username AS owner_name,
                (SELECT COUNT(*) FROM records r JOIN charts c ON c.id = r.chart_id
                 WHERE c.level_id = l.id) AS plays,
                IFNULL((SELECT SUM(lr.rating) FROM level_ratings lr WHERE lr.level_id = l.id), 0) AS rating_sum,
                (SELECT COUNT(*) FROM level_ratings lr WHERE lr.level_id = l.id) AS rating_count,
                IFNULL((SELECT MAX(c.difficulty) FROM charts c WHERE c.level_id = l.id), 0) AS max_difficulty
            FROM levels l
            JOIN users u ON u.id = l.owner_id
            WHERE {where_clause}
        ) AS listing
        ORDER BY {order}, id {dir}
        LIMIT ?6 OFFSET ?7
        "#
    );

    let rows: Vec<LevelListRow> = sqlx::query_as(&sql)
        .bind(&search)
        .bind(&search_like)
        .bind(&owner)
        .bind(prior.weight)
        .bind(prior.mean)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    Ok((total, rows))
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct LevelPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub charter: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub published: Option<bool>,
}

pub async fn update_level(
    pool: &SqlitePool,
    level_id: i64,
    patch: &LevelPatch,
    modified_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE levels SET
            title = IFNULL(?1, title),
            artist = IFNULL(?2, artist),
            charter = IFNULL(?3, charter),
            description = IFNULL(?4, description),
            tags = IFNULL(?5, tags),
            published = IFNULL(?6, published),
            modified_at = ?7
         WHERE id = ?8",
    )
    .bind(&patch.title)
    .bind(&patch.artist)
    .bind(&patch.charter)
    .bind(&patch.description)
    .bind(&patch.tags)
    .bind(patch.published)
    .bind(modified_at)
    .bind(level_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Deletes a level; charts, records and ratings go with it.
pub async fn delete_level(pool: &SqlitePool, level_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM levels WHERE id = ?1")
        .bind(level_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count_level_plays(pool: &SqlitePool, level_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM records r JOIN charts c ON c.id = r.chart_id WHERE c.level_id = ?1",
    )
    .bind(level_id)
    .fetch_one(pool)
    .await
}

pub async fn count_levels_by_owner(pool: &SqlitePool, owner_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM levels WHERE owner_id = ?1 AND published = 1")
        .bind(owner_id)
        .fetch_one(pool)
        .await
}

/// Replay hashes of every record on a level, used to clean up files.
pub async fn get_level_replay_hashes(
    pool: &SqlitePool,
    level_id: i64,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT r.replay_hash FROM records r JOIN charts c ON c.id = r.chart_id
         WHERE c.level_id = ?1 AND r.replay_hash IS NOT NULL",
    )
    .bind(level_id)
    .fetch_all(pool)
    .await
}

pub async fn count_records_with_replay(pool: &SqlitePool, hash: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE replay_hash = ?1")
        .bind(hash)
        .fetch_one(pool)
        .await
}

// ============================================================================
// RECORD QUERIES
// ============================================================================

pub async fn insert_record(pool: &SqlitePool, record: &NewRecord) -> Result<i64, sqlx::Error> {
    let mods = serde_json::to_string(&record.mods)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let result = sqlx::query(
        "INSERT INTO records (chart_id, owner_id, score, accuracy, mods, ranked, perfect, great, good, bad, miss, max_combo, rating, replay_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
    )
    .bind(record.chart_id)
    .bind(record.owner_id)
    .bind(record.score)
    .bind(record.accuracy)
    .bind(mods)
    .bind(record.ranked)
    .bind(record.stats.perfect as i64)
    .bind(record.stats.great as i64)
    .bind(record.stats.good as i64)
    .bind(record.stats.bad as i64)
    .bind(record.stats.miss as i64)
    .bind(record.stats.max_combo as i64)
    .bind(record.rating)
    .bind(&record.replay_hash)
    .bind(record.created_at)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

const RECORD_DETAIL_SELECT: &str = "u.username AS owner_name, l.uid AS level_uid, \
     l.title AS level_title, c.chart_type, c.difficulty
     FROM records r
     JOIN charts c ON c.id = r.chart_id
     JOIN levels l ON l.id = c.level_id
     JOIN users u ON u.id = r.owner_id";

pub async fn get_record_detail(
    pool: &SqlitePool,
    record_id: i64,
) -> Result<Option<RecordDetail>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {RECORD_COLUMNS}, {RECORD_DETAIL_SELECT} WHERE r.id = ?1"
    ))
    .bind(record_id)
    .fetch_optional(pool)
    .await
}

/// The player's current best ranked record on a chart.
pub async fn get_best_record(
    pool: &SqlitePool,
    chart_id: i64,
    owner_id: i64,
) -> Result<Option<Record>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {RECORD_COLUMNS} FROM records r
         WHERE r.chart_id = ?1 AND r.owner_id = ?2 AND r.ranked = 1
         ORDER BY r.score DESC, r.created_at ASC, r.id ASC LIMIT 1"
    ))
    .bind(chart_id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await
}

/// Number of players on a chart leaderboard.
pub async fn count_leaderboard(pool: &SqlitePool, chart_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(DISTINCT owner_id) FROM records WHERE chart_id = ?1 AND ranked = 1",
    )
    .bind(chart_id)
    .fetch_one(pool)
    .await
}

/// Leaderboard rows whose rank falls inside `window`.
pub async fn get_leaderboard(
    pool: &SqlitePool,
    chart_id: i64,
    window: RankWindow,
) -> Result<Vec<LeaderboardRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "{LEADERBOARD_CTE}
         SELECT r.position AS \"rank\", {RECORD_COLUMNS}, u.username AS owner_name
         FROM board r
         JOIN users u ON u.id = r.owner_id
         WHERE r.position BETWEEN ?2 AND ?3
         ORDER BY r.position"
    ))
    .bind(chart_id)
    .bind(window.first)
    .bind(window.last)
    .fetch_all(pool)
    .await
}

/// 1-based leaderboard position of a player, if they have a ranked record.
pub async fn get_user_rank(
    pool: &SqlitePool,
    chart_id: i64,
    owner_id: i64,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(&format!(
        "{LEADERBOARD_CTE} SELECT position FROM board WHERE owner_id = ?2"
    ))
    .bind(chart_id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await
}

/// A player's records on published levels with their chart difficulty,
/// oldest first.
pub async fn get_user_history(
    pool: &SqlitePool,
    owner_id: i64,
) -> Result<Vec<HistoryRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT r.id, r.chart_id, c.difficulty, r.score, r.accuracy, r.max_combo, r.ranked,
                r.rating, r.created_at
         FROM records r
         JOIN charts c ON c.id = r.chart_id
         JOIN levels l ON l.id = c.level_id
         WHERE r.owner_id = ?1 AND l.published = 1
         ORDER BY r.created_at, r.id",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSort {
    Date,
    Score,
    Rating,
}

/// A player's records on published levels, newest/best first.
pub async fn get_user_records(
    pool: &SqlitePool,
    owner_id: i64,
    sort: RecordSort,
    page: Page,
) -> Result<(i64, Vec<RecordDetail>), sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM records r
         JOIN charts c ON c.id = r.chart_id
         JOIN levels l ON l.id = c.level_id
         WHERE r.owner_id = ?1 AND l.published = 1",
    )
    .bind(owner_id)
    .fetch_one(pool)
    .await?;

    let order = match sort {
        RecordSort::Date => "r.created_at DESC, r.id DESC",
        RecordSort::Score => "r.score DESC, r.created_at DESC, r.id DESC",
        RecordSort::Rating => "r.rating DESC, r.created_at DESC, r.id DESC",
    };

    let rows: Vec<RecordDetail> = sqlx::query_as(&format!(
        "SELECT {RECORD_COLUMNS}, {RECORD_DETAIL_SELECT}
         WHERE r.owner_id = ?1 AND l.published = 1
         ORDER BY {order}
         LIMIT ?2 OFFSET ?3"
    ))
    .bind(owner_id)
    .bind(page.limit as i64)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok((total, rows))
}

// ============================================================================
// LEVEL RATINGS
// ============================================================================

pub async fn upsert_rating(
    pool: &SqlitePool,
    level_id: i64,
    user_id: i64,
    rating: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO level_ratings (level_id, user_id, rating, created_at, modified_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT (level_id, user_id) DO UPDATE SET rating = excluded.rating, modified_at = excluded.modified_at",
    )
    .bind(level_id)
    .bind(user_id)
    .bind(rating)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_rating(
    pool: &SqlitePool,
    level_id: i64,
    user_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM level_ratings WHERE level_id = ?1 AND user_id = ?2")
        .bind(level_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// `(rating, count)` pairs for one level.
pub async fn get_rating_buckets(
    pool: &SqlitePool,
    level_id: i64,
) -> Result<Vec<(i64, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT rating, COUNT(*) FROM level_ratings WHERE level_id = ?1 GROUP BY rating ORDER BY rating",
    )
    .bind(level_id)
    .fetch_all(pool)
    .await
}

pub async fn get_own_rating(
    pool: &SqlitePool,
    level_id: i64,
    user_id: i64,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT rating FROM level_ratings WHERE level_id = ?1 AND user_id = ?2")
        .bind(level_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Mean of every rating on the site; `None` while there are none.
pub async fn get_global_rating_mean(pool: &SqlitePool) -> Result<Option<f64>, sqlx::Error> {
    sqlx::query_scalar("SELECT AVG(rating * 1.0) FROM level_ratings")
        .fetch_one(pool)
        .await
}

pub async fn count_ratings_by_user(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM level_ratings WHERE user_id = ?1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

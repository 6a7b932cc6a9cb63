//! Level publishing, listing and management.

use crate::auth;
use crate::database::query::{self, LevelFilter, LevelPatch, LevelSort, NewChart, NewLevel};
use crate::database::{Chart, Level, LevelListRow, User, replay_storage};
use crate::error::{AppError, Result};
use crate::models::ChartType;
use crate::models::chart::{MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::ranking::{Page, Paged, Prior, RatingSummary, bayesian};
use crate::server::{AppState, blocking};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const UID_MIN: usize = 3;
pub const UID_MAX: usize = 64;
pub const TITLE_MAX: usize = 128;
pub const DESCRIPTION_MAX: usize = 4096;
pub const MAX_TAGS: usize = 16;
pub const TAG_MAX: usize = 32;

#[derive(Deserialize)]
pub struct ChartUpload {
    #[serde(rename = "type")]
    chart_type: ChartType,
    difficulty: i64,
    notes_count: i64,
    content: String,
}

#[derive(Deserialize)]
pub struct PublishBody {
    uid: String,
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    charter: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_published")]
    published: bool,
    charts: Vec<ChartUpload>,
}

fn default_published() -> bool {
    true
}

#[derive(Deserialize, Default)]
pub struct UpdateBody {
    title: Option<String>,
    artist: Option<String>,
    charter: Option<String>,
    description: Option<String>,
    tags: Option<Vec<String>>,
    published: Option<bool>,
}

#[derive(Deserialize, Default)]
pub struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    sort: Option<String>,
    order: Option<String>,
    search: Option<String>,
    owner: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
    #[serde(rename = "type")]
    pub chart_type: String,
    pub difficulty: i64,
    pub notes_count: i64,
    pub checksum: String,
}

impl From<Chart> for ChartView {
    fn from(chart: Chart) -> Self {
        Self {
            chart_type: chart.chart_type,
            difficulty: chart.difficulty,
            notes_count: chart.notes_count,
            checksum: chart.checksum,
        }
    }
}

/// A level as shown in listings.
#[derive(Debug, Clone, Serialize)]
pub struct LevelSummary {
    pub uid: String,
    pub title: String,
    pub artist: String,
    pub charter: String,
    pub tags: Vec<String>,
    pub owner: String,
    pub created_at: i64,
    pub modified_at: i64,
    pub plays: i64,
    /// Bayesian display rating, `None` while unrated.
    pub rating: Option<f64>,
    pub rating_count: i64,
}

impl LevelSummary {
    fn from_row(row: LevelListRow, prior: Prior) -> Self {
        let rating = bayesian::weighted_rating(
            row.rating_sum as f64,
            row.rating_count.max(0) as u64,
            prior,
        );
        Self {
            tags: row.level.tag_list(),
            uid: row.level.uid,
            title: row.level.title,
            artist: row.level.artist,
            charter: row.level.charter,
            owner: row.owner_name,
            created_at: row.level.created_at,
            modified_at: row.level.modified_at,
            plays: row.plays,
            rating,
            rating_count: row.rating_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelDetail {
    #[serde(flatten)]
    pub summary: LevelSummary,
    pub description: String,
    pub published: bool,
    pub charts: Vec<ChartView>,
}

pub fn validate_uid(uid: &str) -> Result<()> {
    if !(UID_MIN..=UID_MAX).contains(&uid.len()) {
        return Err(AppError::BadRequest(format!(
            "Level uid must be {UID_MIN} to {UID_MAX} characters"
        )));
    }
    if !uid
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return Err(AppError::BadRequest(
            "Level uid may only contain a-z, 0-9, '.', '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<()> {
    let len = title.trim().chars().count();
    if len == 0 || len > TITLE_MAX {
        return Err(AppError::BadRequest(format!(
            "Title must be 1 to {TITLE_MAX} characters"
        )));
    }
    Ok(())
}

fn validate_text(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{field} cannot exceed {max} characters"
        )));
    }
    Ok(())
}

/// Trims tags, drops empty ones and encodes the rest as a JSON array.
fn encode_tags(tags: &[String]) -> Result<String> {
    let tags: Vec<&str> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.len() > MAX_TAGS {
        return Err(AppError::BadRequest(format!(
            "A level cannot have more than {MAX_TAGS} tags"
        )));
    }
    if let Some(tag) = tags.iter().find(|t| t.chars().count() > TAG_MAX) {
        return Err(AppError::BadRequest(format!(
            "Tag '{tag}' exceeds {TAG_MAX} characters"
        )));
    }
    Ok(serde_json::to_string(&tags)?)
}

fn validate_charts(charts: &[ChartUpload]) -> Result<()> {
    if charts.is_empty() {
        return Err(AppError::BadRequest(
            "A level needs at least one chart".to_string(),
        ));
    }
    for (i, chart) in charts.iter().enumerate() {
        if charts[..i].iter().any(|c| c.chart_type == chart.chart_type) {
            return Err(AppError::BadRequest(format!(
                "Duplicate {} chart",
                chart.chart_type
            )));
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&chart.difficulty) {
            return Err(AppError::BadRequest(format!(
                "Difficulty must be within {MIN_DIFFICULTY}..={MAX_DIFFICULTY}"
            )));
        }
        if chart.notes_count < 1 {
            return Err(AppError::BadRequest(
                "A chart needs at least one note".to_string(),
            ));
        }
    }
    Ok(())
}

/// Level by uid as seen by `viewer`; unpublished levels only exist for their owner.
pub async fn visible_level(state: &AppState, uid: &str, viewer: Option<&User>) -> Result<Level> {
    let level = query::get_level_by_uid(state.db.pool(), uid)
        .await?
        .ok_or_else(|| AppError::not_found("Level"))?;
    let is_owner = viewer.is_some_and(|u| u.id == level.owner_id);
    if !level.published && !is_owner {
        return Err(AppError::not_found("Level"));
    }
    Ok(level)
}

/// Level the user may modify, 403 for anyone but the owner.
pub async fn owned_level(state: &AppState, uid: &str, user: &User) -> Result<Level> {
    let level = visible_level(state, uid, Some(user)).await?;
    if level.owner_id != user.id {
        return Err(AppError::Forbidden(
            "Only the owner can modify this level".to_string(),
        ));
    }
    Ok(level)
}

/// Chart of a level by type name.
pub async fn find_chart(state: &AppState, level: &Level, chart_type: &str) -> Result<Chart> {
    let chart_type: ChartType = chart_type.parse().map_err(AppError::BadRequest)?;
    query::get_chart(state.db.pool(), level.id, chart_type)
        .await?
        .ok_or_else(|| AppError::not_found("Chart"))
}

async fn level_detail(state: &AppState, level: Level) -> Result<LevelDetail> {
    let pool = state.db.pool();
    let owner = query::get_user_by_id(pool, level.owner_id)
        .await?
        .map(|u| u.username)
        .unwrap_or_default();
    let plays = query::count_level_plays(pool, level.id).await?;
    let buckets = query::get_rating_buckets(pool, level.id).await?;
    let rating = RatingSummary::from_buckets(&buckets, state.prior().await?, None);
    let charts = query::get_charts_for_level(pool, level.id).await?;

    Ok(LevelDetail {
        summary: LevelSummary {
            tags: level.tag_list(),
            uid: level.uid,
            title: level.title,
            artist: level.artist,
            charter: level.charter,
            owner,
            created_at: level.created_at,
            modified_at: level.modified_at,
            plays,
            rating: rating.average,
            rating_count: rating.total as i64,
        },
        description: level.description,
        published: level.published,
        charts: charts.into_iter().map(ChartView::from).collect(),
    })
}

fn parse_sort(sort: Option<&str>) -> Result<LevelSort> {
    Ok(match sort.unwrap_or("creation_date") {
        "creation_date" => LevelSort::CreationDate,
        "modification_date" => LevelSort::ModificationDate,
        "rating" => LevelSort::Rating,
        "plays" => LevelSort::Plays,
        "title" => LevelSort::Title,
        "difficulty" => LevelSort::Difficulty,
        other => {
            return Err(AppError::BadRequest(format!("Unknown sort: {other}")));
        }
    })
}

fn parse_order(order: Option<&str>) -> Result<bool> {
    match order.unwrap_or("desc") {
        "desc" => Ok(true),
        "asc" => Ok(false),
        other => Err(AppError::BadRequest(format!("Unknown order: {other}"))),
    }
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Paged<LevelSummary>>> {
    let filter = LevelFilter {
        search: params.search.filter(|s| !s.trim().is_empty()),
        owner: params.owner.filter(|s| !s.trim().is_empty()),
        sort: parse_sort(params.sort.as_deref())?,
        descending: parse_order(params.order.as_deref())?,
    };
    let page = Page::new(params.page, params.limit, &state.config.ranking);
    let prior = state.prior().await?;

    let (total, rows) = query::list_levels(state.db.pool(), &filter, prior, page).await?;
    let entries = rows
        .into_iter()
        .map(|row| LevelSummary::from_row(row, prior))
        .collect();
    Ok(Json(page.wrap(total, entries)))
}

pub async fn publish(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PublishBody>,
) -> Result<(StatusCode, Json<LevelDetail>)> {
    let user = auth::require_user(&headers, &state).await?;

    validate_uid(&body.uid)?;
    validate_title(&body.title)?;
    validate_text("Artist", &body.artist, TITLE_MAX)?;
    validate_text("Charter", &body.charter, TITLE_MAX)?;
    validate_text("Description", &body.description, DESCRIPTION_MAX)?;
    validate_charts(&body.charts)?;
    let tags = encode_tags(&body.tags)?;

    let pool = state.db.pool();
    if query::get_level_by_uid(pool, &body.uid).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Level uid '{}' is already taken",
            body.uid
        )));
    }

    let charts: Vec<NewChart> = body
        .charts
        .iter()
        .map(|c| NewChart {
            chart_type: c.chart_type,
            difficulty: c.difficulty,
            notes_count: c.notes_count,
            checksum: format!("{:x}", md5::compute(c.content.as_bytes())),
        })
        .collect();

    let new_level = NewLevel {
        uid: &body.uid,
        owner_id: user.id,
        title: body.title.trim(),
        artist: body.artist.trim(),
        charter: body.charter.trim(),
        description: body.description.trim(),
        tags: &tags,
        published: body.published,
        created_at: auth::now(),
    };
    if let Err(e) = query::insert_level(pool, &new_level, &charts).await {
        let err = AppError::from(e);
        if err.is_unique_violation() {
            return Err(AppError::Conflict(format!(
                "Level uid '{}' is already taken",
                body.uid
            )));
        }
        return Err(err);
    }

    log::info!(
        "LEVELS: {} published '{}' with {} charts",
        user.username,
        body.uid,
        charts.len()
    );

    let level = visible_level(&state, &body.uid, Some(&user)).await?;
    state.invalidate_user(user.id);
    Ok((StatusCode::CREATED, Json(level_detail(&state, level).await?)))
}

pub async fn get_level(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
) -> Result<Json<LevelDetail>> {
    let viewer = auth::optional_user(&headers, &state).await?;
    let level = visible_level(&state, &uid, viewer.as_ref()).await?;
    Ok(Json(level_detail(&state, level).await?))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<LevelDetail>> {
    let user = auth::require_user(&headers, &state).await?;
    let level = owned_level(&state, &uid, &user).await?;

    if let Some(title) = &body.title {
        validate_title(title)?;
    }
    for (field, value, max) in [
        ("Artist", &body.artist, TITLE_MAX),
        ("Charter", &body.charter, TITLE_MAX),
        ("Description", &body.description, DESCRIPTION_MAX),
    ] {
        if let Some(value) = value {
            validate_text(field, value, max)?;
        }
    }

    let patch = LevelPatch {
        title: body.title.as_deref().map(|s| s.trim().to_string()),
        artist: body.artist.as_deref().map(|s| s.trim().to_string()),
        charter: body.charter.as_deref().map(|s| s.trim().to_string()),
        description: body.description.as_deref().map(|s| s.trim().to_string()),
        tags: body.tags.as_deref().map(encode_tags).transpose()?,
        published: body.published,
    };
    query::update_level(state.db.pool(), level.id, &patch, auth::now()).await?;

    // publishing state changes what counts as ranked in profiles
    if patch.published.is_some_and(|p| p != level.published) {
        state.profiles.clear();
    }

    log::info!("LEVELS: {} updated '{}'", user.username, uid);
    let level = visible_level(&state, &uid, Some(&user)).await?;
    Ok(Json(level_detail(&state, level).await?))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
) -> Result<StatusCode> {
    let user = auth::require_user(&headers, &state).await?;
    let level = owned_level(&state, &uid, &user).await?;

    let pool = state.db.pool();
    let charts = query::get_charts_for_level(pool, level.id).await?;
    let mut hashes = query::get_level_replay_hashes(pool, level.id).await?;
    hashes.sort();
    hashes.dedup();

    query::delete_level(pool, level.id).await?;

    // replay files are content-addressed and may be shared with other levels
    let mut orphans = Vec::new();
    for hash in hashes {
        if query::count_records_with_replay(pool, &hash).await? == 0 {
            orphans.push(hash);
        }
    }
    let replay_dir = state.config.database.replay_dir.clone();
    let removed = blocking(move || {
        orphans
            .iter()
            .filter(|hash| match replay_storage::delete_replay(&replay_dir, hash) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("LEVELS: Failed to delete replay {}: {}", hash, e);
                    false
                }
            })
            .count()
    })
    .await?;

    for chart in &charts {
        state.invalidate_chart(chart.id);
    }
    state.profiles.clear();
    state.invalidate_ratings();

    log::info!(
        "LEVELS: {} deleted '{}' ({} replay files removed)",
        user.username,
        uid,
        removed
    );
    Ok(StatusCode::NO_CONTENT)
}

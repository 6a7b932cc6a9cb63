//! Record submission, chart leaderboards and replays.

use crate::auth;
use crate::database::query::{self, RecordSort};
use crate::database::{LeaderboardRow, NewRecord, Record, RecordDetail, replay_storage};
use crate::error::{AppError, Result};
use crate::models::mods::{is_ranked, validate_mods};
use crate::models::{HitStats, Mod, ReplayData};
use crate::ranking::grade::MAX_SCORE;
use crate::ranking::leaderboard::window;
use crate::ranking::progression::{ExpSample, exp_gain};
use crate::ranking::rating::record_rating;
use crate::ranking::{Grade, Page, Paged, RankWindow};
use crate::server::{AppState, blocking};
use crate::server::levels::{find_chart, visible_level};
use crate::server::users::find_user;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SubmitBody {
    score: i64,
    checksum: String,
    #[serde(default)]
    mods: Vec<Mod>,
    details: HitStats,
    replay: Option<ReplayData>,
}

#[derive(Deserialize, Default)]
pub struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Deserialize, Default)]
pub struct AroundQuery {
    user: Option<String>,
    before: Option<u32>,
    after: Option<u32>,
}

#[derive(Deserialize, Default)]
pub struct UserRecordsQuery {
    page: Option<u32>,
    limit: Option<u32>,
    sort: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub id: i64,
    pub owner: String,
    pub score: i64,
    pub accuracy: f64,
    pub grade: Grade,
    pub mods: Vec<Mod>,
    pub ranked: bool,
    pub details: HitStats,
    pub full_combo: bool,
    pub rating: f64,
    pub has_replay: bool,
    pub created_at: i64,
}

impl RecordView {
    pub fn new(record: Record, owner: String) -> Self {
        Self {
            mods: record.mod_list(),
            details: record.hit_stats(),
            full_combo: record.hit_stats().is_full_combo(),
            grade: Grade::from_score(record.score),
            id: record.id,
            owner,
            score: record.score,
            accuracy: record.accuracy,
            ranked: record.ranked,
            rating: record.rating,
            has_replay: record.replay_hash.is_some(),
            created_at: record.created_at,
        }
    }
}

/// A record with the level and chart it was played on.
#[derive(Debug, Clone, Serialize)]
pub struct RecordDetailView {
    #[serde(flatten)]
    pub record: RecordView,
    pub level_uid: String,
    pub level_title: String,
    pub chart_type: String,
    pub difficulty: i64,
}

impl From<RecordDetail> for RecordDetailView {
    fn from(detail: RecordDetail) -> Self {
        Self {
            record: RecordView::new(detail.record, detail.owner_name),
            level_uid: detail.level_uid,
            level_title: detail.level_title,
            chart_type: detail.chart_type,
            difficulty: detail.difficulty,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    #[serde(flatten)]
    pub record: RecordView,
}

impl From<LeaderboardRow> for LeaderboardEntry {
    fn from(row: LeaderboardRow) -> Self {
        Self {
            rank: row.rank,
            record: RecordView::new(row.record, row.owner_name),
        }
    }
}

#[derive(Serialize)]
pub struct SubmitResponse {
    record: RecordView,
    /// Leaderboard position after this submission; `None` for unranked plays.
    rank: Option<i64>,
    previous_best: Option<RecordView>,
    new_best: bool,
    exp_gained: u64,
}

#[derive(Serialize)]
pub struct AroundResponse {
    rank: i64,
    total: u64,
    window: RankWindow,
    entries: Vec<LeaderboardEntry>,
}

/// Checks a submission against the chart it targets.
fn validate_submission(body: &SubmitBody, notes_count: i64, checksum: &str) -> Result<()> {
    if !(0..=MAX_SCORE).contains(&body.score) {
        return Err(AppError::BadRequest(format!(
            "Score must be within 0..={MAX_SCORE}"
        )));
    }
    validate_mods(&body.mods).map_err(AppError::BadRequest)?;

    let judged = body.details.total();
    if judged != notes_count.max(0) as u64 {
        return Err(AppError::BadRequest(format!(
            "Judgement total {judged} does not match the chart's {notes_count} notes"
        )));
    }
    if body.details.max_combo as i64 > notes_count {
        return Err(AppError::BadRequest(
            "Max combo cannot exceed the note count".to_string(),
        ));
    }
    if !body.checksum.eq_ignore_ascii_case(checksum) {
        return Err(AppError::Conflict(
            "Chart checksum mismatch, the local chart is outdated".to_string(),
        ));
    }
    if let Some(replay) = &body.replay {
        replay.validate().map_err(AppError::BadRequest)?;
    }
    Ok(())
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((uid, chart_type)): Path<(String, String)>,
    Json(mut body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    let user = auth::require_user(&headers, &state).await?;
    let level = visible_level(&state, &uid, Some(&user)).await?;
    let chart = find_chart(&state, &level, &chart_type).await?;

    validate_submission(&body, chart.notes_count, &chart.checksum)?;

    let pool = state.db.pool();
    let ranked = level.published && is_ranked(&body.mods);
    let accuracy = body.details.accuracy();
    let rating = if ranked {
        record_rating(accuracy, chart.difficulty as f64)
    } else {
        0.0
    };

    let replay_hash = match body.replay.take() {
        Some(replay) => {
            let dir = state.config.database.replay_dir.clone();
            Some(blocking(move || replay_storage::save_replay(&dir, &replay)).await??)
        }
        None => None,
    };

    let previous_best = if ranked {
        query::get_best_record(pool, chart.id, user.id).await?
    } else {
        None
    };
    let history: Vec<ExpSample> = query::get_user_history(pool, user.id)
        .await?
        .into_iter()
        .filter(|r| r.ranked)
        .map(|r| ExpSample {
            chart_id: r.chart_id,
            difficulty: r.difficulty,
            score: r.score,
        })
        .collect();

    let new_record = NewRecord {
        chart_id: chart.id,
        owner_id: user.id,
        score: body.score,
        accuracy,
        mods: body.mods.clone(),
        ranked,
        stats: body.details,
        rating,
        replay_hash,
        created_at: auth::now(),
    };
    let id = query::insert_record(pool, &new_record).await?;

    let exp_gained = if ranked {
        exp_gain(
            &history,
            ExpSample {
                chart_id: chart.id,
                difficulty: chart.difficulty,
                score: body.score,
            },
        )
    } else {
        0
    };
    let rank = if ranked {
        query::get_user_rank(pool, chart.id, user.id).await?
    } else {
        None
    };
    let new_best = ranked
        && previous_best
            .as_ref()
            .is_none_or(|best| body.score > best.score);

    state.invalidate_chart(chart.id);
    state.invalidate_user(user.id);

    log::info!(
        "RECORDS: {} scored {} on {}/{} (ranked: {}, rank: {:?})",
        user.username,
        body.score,
        uid,
        chart.chart_type,
        ranked,
        rank
    );

    let record = query::get_record_detail(pool, id)
        .await?
        .ok_or_else(|| AppError::Internal("Record vanished after insert".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            record: RecordView::new(record.record, user.username.clone()),
            rank,
            previous_best: previous_best.map(|r| RecordView::new(r, user.username.clone())),
            new_best,
            exp_gained,
        }),
    ))
}

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((uid, chart_type)): Path<(String, String)>,
    Query(params): Query<PageQuery>,
) -> Result<Json<Paged<LeaderboardEntry>>> {
    let viewer = auth::optional_user(&headers, &state).await?;
    let level = visible_level(&state, &uid, viewer.as_ref()).await?;
    let chart = find_chart(&state, &level, &chart_type).await?;
    let page = Page::new(params.page, params.limit, &state.config.ranking);

    let pool = state.db.pool().clone();
    let chart_id = chart.id;
    let board = state
        .leaderboards
        .get_or_try_insert_with((chart_id, page.page, page.limit), || async move {
            let total = query::count_leaderboard(&pool, chart_id).await?;
            let rows = query::get_leaderboard(&pool, chart_id, page.rank_range()).await?;
            log::debug!("CACHE: Loaded leaderboard page {} of chart {}", page.page, chart_id);
            Ok::<_, AppError>(page.wrap(
                total,
                rows.into_iter().map(LeaderboardEntry::from).collect(),
            ))
        })
        .await?;

    Ok(Json(board))
}

pub async fn around(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((uid, chart_type)): Path<(String, String)>,
    Query(params): Query<AroundQuery>,
) -> Result<Json<AroundResponse>> {
    let viewer = auth::optional_user(&headers, &state).await?;
    let target = match params.user.as_deref() {
        Some(name) => find_user(&state, name).await?,
        None => viewer.clone().ok_or(AppError::Unauthorized)?,
    };

    let level = visible_level(&state, &uid, viewer.as_ref()).await?;
    let chart = find_chart(&state, &level, &chart_type).await?;

    let pool = state.db.pool();
    let rank = query::get_user_rank(pool, chart.id, target.id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "{} has no ranked record on this chart",
                target.username
            ))
        })?;

    let cfg = &state.config.ranking;
    let range = window(
        rank,
        params.before.unwrap_or(cfg.around_default),
        params.after.unwrap_or(cfg.around_default),
        cfg.around_max,
    );
    let total = query::count_leaderboard(pool, chart.id).await?;
    let rows = query::get_leaderboard(pool, chart.id, range).await?;

    Ok(Json(AroundResponse {
        rank,
        total: total.max(0) as u64,
        window: range,
        entries: rows.into_iter().map(LeaderboardEntry::from).collect(),
    }))
}

/// Record by id, hidden when its level is not visible to the viewer.
async fn visible_record(state: &AppState, headers: &HeaderMap, id: i64) -> Result<RecordDetail> {
    let viewer = auth::optional_user(headers, state).await?;
    let detail = query::get_record_detail(state.db.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found("Record"))?;
    visible_level(state, &detail.level_uid, viewer.as_ref())
        .await
        .map_err(|_| AppError::not_found("Record"))?;
    Ok(detail)
}

pub async fn get_record(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<RecordDetailView>> {
    let detail = visible_record(&state, &headers, id).await?;
    Ok(Json(RecordDetailView::from(detail)))
}

pub async fn get_replay(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ReplayData>> {
    let detail = visible_record(&state, &headers, id).await?;
    let hash = detail
        .record
        .replay_hash
        .ok_or_else(|| AppError::not_found("Replay"))?;

    let dir = state.config.database.replay_dir.clone();
    let file = hash.clone();
    match blocking(move || replay_storage::load_replay(&dir, &file)).await? {
        Ok(replay) => Ok(Json(replay)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("RECORDS: Replay file {} of record {} is missing", hash, id);
            Err(AppError::not_found("Replay"))
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_record_sort(sort: Option<&str>) -> Result<RecordSort> {
    match sort.unwrap_or("date") {
        "date" => Ok(RecordSort::Date),
        "score" => Ok(RecordSort::Score),
        "rating" => Ok(RecordSort::Rating),
        other => Err(AppError::BadRequest(format!("Unknown sort: {other}"))),
    }
}

pub async fn user_records(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Query(params): Query<UserRecordsQuery>,
) -> Result<Json<Paged<RecordDetailView>>> {
    let user = find_user(&state, &username).await?;
    let sort = parse_record_sort(params.sort.as_deref())?;
    let page = Page::new(params.page, params.limit, &state.config.ranking);

    let (total, rows) = query::get_user_records(state.db.pool(), user.id, sort, page).await?;
    Ok(Json(page.wrap(
        total,
        rows.into_iter().map(RecordDetailView::from).collect(),
    )))
}

#[cfg(test)]
mod tests {
    use super::parse_record_sort;
    use crate::database::query::RecordSort;
    use crate::server::test_support::*;
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    fn owners(body: &Value) -> Vec<String> {
        body["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["owner"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_record_sort_parsing() {
        assert_eq!(parse_record_sort(None).unwrap(), RecordSort::Date);
        assert_eq!(parse_record_sort(Some("rating")).unwrap(), RecordSort::Rating);
        assert!(parse_record_sort(Some("length")).is_err());
    }

    #[tokio::test]
    async fn test_submit_ranked_record() {
        let state = test_state().await;
        let owner = register(&state, "owner").await;
        let player = register(&state, "player").await;
        publish(&state, &owner, "song", true).await;

        let (status, body) = submit(&state, &player, "song", 1_000_000, 10).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["rank"], 1);
        assert_eq!(body["new_best"], true);
        assert!(body["previous_best"].is_null());
        assert_eq!(body["record"]["grade"], "MAX");
        assert_eq!(body["record"]["accuracy"], 1.0);
        assert_eq!(body["record"]["full_combo"], true);
        // difficulty 10 at 100% accuracy
        assert_eq!(body["record"]["rating"], 12.0);
        // 100 play exp + 200 clear bonus
        assert_eq!(body["exp_gained"], 300);

        let (_, body) = submit(&state, &player, "song", 900_000, 5).await;
        assert_eq!(body["new_best"], false);
        assert_eq!(body["previous_best"]["score"], 1_000_000);
        assert_eq!(body["rank"], 1);
        // 81 play exp, the chart is already cleared
        assert_eq!(body["exp_gained"], 81);
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let state = test_state().await;
        let owner = register(&state, "owner").await;
        publish(&state, &owner, "song", true).await;

        let post = |body: Value| {
            let state = state.clone();
            let token = owner.clone();
            async move {
                send(
                    &state,
                    "POST",
                    "/levels/song/charts/easy/records",
                    Some(&token),
                    Some(body),
                )
                .await
                .0
            }
        };
        let details = json!({ "perfect": 10, "great": 0, "good": 0, "bad": 0, "miss": 0, "max_combo": 10 });

        let cases = [
            (json!({ "score": 1_000_001, "checksum": chart_checksum(), "details": details }), StatusCode::BAD_REQUEST),
            (json!({ "score": -1, "checksum": chart_checksum(), "details": details }), StatusCode::BAD_REQUEST),
            (json!({ "score": 5, "checksum": "deadbeef", "details": details }), StatusCode::CONFLICT),
            (
                json!({ "score": 5, "checksum": chart_checksum(), "details": { "perfect": 9, "great": 0, "good": 0, "bad": 0, "miss": 0, "max_combo": 9 } }),
                StatusCode::BAD_REQUEST,
            ),
            (
                json!({ "score": 5, "checksum": chart_checksum(), "details": { "perfect": 10, "great": 0, "good": 0, "bad": 0, "miss": 0, "max_combo": 11 } }),
                StatusCode::BAD_REQUEST,
            ),
            (
                json!({ "score": 5, "checksum": chart_checksum(), "mods": ["Fast", "Slow"], "details": details }),
                StatusCode::BAD_REQUEST,
            ),
            (
                json!({ "score": 5, "checksum": chart_checksum(), "details": details, "replay": { "rate": 3.0, "inputs": [] } }),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (payload, expected) in cases {
            assert_eq!(post(payload.clone()).await, expected, "{payload}");
        }

        let (status, _) = send(
            &state,
            "POST",
            "/levels/song/charts/insane/records",
            Some(&owner),
            Some(json!({ "score": 5, "checksum": chart_checksum(), "details": details })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &state,
            "POST",
            "/levels/song/charts/extreme/records",
            Some(&owner),
            Some(json!({ "score": 5, "checksum": chart_checksum(), "details": details })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unranked_submissions() {
        let state = test_state().await;
        let owner = register(&state, "owner").await;
        let other = register(&state, "other").await;
        publish(&state, &owner, "song", true).await;
        publish(&state, &owner, "draft", false).await;

        let (status, body) = send(
            &state,
            "POST",
            "/levels/song/charts/easy/records",
            Some(&other),
            Some(json!({
                "score": 1_000_000,
                "checksum": chart_checksum(),
                "mods": ["Auto"],
                "details": { "perfect": 10, "great": 0, "good": 0, "bad": 0, "miss": 0, "max_combo": 10 },
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["record"]["ranked"], false);
        assert_eq!(body["record"]["rating"], 0.0);
        assert!(body["rank"].is_null());
        assert_eq!(body["exp_gained"], 0);

        // the owner may play a draft, but it never ranks
        let (status, body) = submit(&state, &owner, "draft", 990_000, 10).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["record"]["ranked"], false);

        let (status, _) = submit(&state, &other, "draft", 990_000, 10).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&state, "GET", "/levels/song/charts/easy/records", None, None).await;
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn test_leaderboard_keeps_best_per_player() {
        let state = test_state().await;
        let owner = register(&state, "owner").await;
        publish(&state, &owner, "song", true).await;

        let a = register(&state, "alpha").await;
        let b = register(&state, "bravo").await;
        let c = register(&state, "charlie").await;

        submit(&state, &a, "song", 800_000, 6).await;
        submit(&state, &b, "song", 950_000, 8).await;
        submit(&state, &a, "song", 990_000, 9).await;
        submit(&state, &c, "song", 950_000, 8).await;

        let (status, body) =
            send(&state, "GET", "/levels/song/charts/easy/records", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        // equal scores: the earlier record wins
        assert_eq!(owners(&body), ["alpha", "bravo", "charlie"]);
        assert_eq!(body["entries"][0]["rank"], 1);
        assert_eq!(body["entries"][0]["score"], 990_000);
        assert_eq!(body["entries"][2]["rank"], 3);

        let (_, body) = send(
            &state,
            "GET",
            "/levels/song/charts/easy/records?page=1&limit=2",
            None,
            None,
        )
        .await;
        assert_eq!(owners(&body), ["charlie"]);
        assert_eq!(body["entries"][0]["rank"], 3);
    }

    #[tokio::test]
    async fn test_submission_invalidates_cached_leaderboard() {
        let state = test_state().await;
        let owner = register(&state, "owner").await;
        publish(&state, &owner, "song", true).await;
        let a = register(&state, "alpha").await;

        let (_, body) = send(&state, "GET", "/levels/song/charts/easy/records", None, None).await;
        assert_eq!(body["total"], 0);
        assert_eq!(state.leaderboards.len(), 1);

        submit(&state, &a, "song", 500_000, 5).await;
        assert!(state.leaderboards.is_empty());

        let (_, body) = send(&state, "GET", "/levels/song/charts/easy/records", None, None).await;
        assert_eq!(body["total"], 1);
    }

    #[tokio::test]
    async fn test_around() {
        let state = test_state().await;
        let owner = register(&state, "owner").await;
        publish(&state, &owner, "song", true).await;

        let mut tokens = Vec::new();
        for i in 0..6 {
            let token = register(&state, &format!("player{i}")).await;
            submit(&state, &token, "song", 900_000 - i * 10_000, 5).await;
            tokens.push(token);
        }

        let (status, body) = send(
            &state,
            "GET",
            "/levels/song/charts/easy/records/around?before=1&after=1",
            Some(&tokens[3]),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rank"], 4);
        assert_eq!(body["total"], 6);
        assert_eq!(owners(&body), ["player2", "player3", "player4"]);

        let (_, body) = send(
            &state,
            "GET",
            "/levels/song/charts/easy/records/around?user=player0&before=5&after=2",
            None,
            None,
        )
        .await;
        assert_eq!(body["window"], json!({ "first": 1, "last": 3 }));
        assert_eq!(owners(&body), ["player0", "player1", "player2"]);

        let (status, _) = send(
            &state,
            "GET",
            "/levels/song/charts/easy/records/around?user=owner",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &state,
            "GET",
            "/levels/song/charts/easy/records/around",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_record_and_replay() {
        let state = test_state().await;
        let owner = register(&state, "owner").await;
        publish(&state, &owner, "song", true).await;

        let replay = json!({
            "rate": 1.0,
            "inputs": [
                { "time_us": 1000, "payload": 1 },
                { "time_us": 5000, "payload": 0 },
            ],
        });
        let (status, body) = send(
            &state,
            "POST",
            "/levels/song/charts/easy/records",
            Some(&owner),
            Some(json!({
                "score": 700_000,
                "checksum": chart_checksum(),
                "mods": ["Mirror"],
                "details": { "perfect": 5, "great": 5, "good": 0, "bad": 0, "miss": 0, "max_combo": 10 },
                "replay": replay,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["record"]["id"].as_i64().unwrap();
        assert_eq!(body["record"]["has_replay"], true);

        let (status, body) = send(&state, "GET", &format!("/records/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["level_uid"], "song");
        assert_eq!(body["chart_type"], "easy");
        assert_eq!(body["mods"], json!(["Mirror"]));
        assert_eq!(body["owner"], "owner");

        let (status, body) =
            send(&state, "GET", &format!("/records/{id}/replay"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["inputs"][0]["time_us"], 1000);
        assert_eq!(body["rate"], 1.0);

        let (_, body) = submit(&state, &owner, "song", 600_000, 0).await;
        let plain = body["record"]["id"].as_i64().unwrap();
        let (status, _) =
            send(&state, "GET", &format!("/records/{plain}/replay"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&state, "GET", "/records/9999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let _ = std::fs::remove_dir_all(&state.config.database.replay_dir);
    }

    #[tokio::test]
    async fn test_user_records() {
        let state = test_state().await;
        let owner = register(&state, "owner").await;
        publish(&state, &owner, "song", true).await;
        let player = register(&state, "player").await;

        submit(&state, &player, "song", 500_000, 0).await;
        submit(&state, &player, "song", 950_000, 10).await;
        submit(&state, &player, "song", 700_000, 5).await;

        let (status, body) =
            send(&state, "GET", "/users/player/records?sort=score", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        let scores: Vec<i64> = body["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["score"].as_i64().unwrap())
            .collect();
        assert_eq!(scores, [950_000, 700_000, 500_000]);

        let (_, body) = send(&state, "GET", "/users/player/records?limit=1", None, None).await;
        assert_eq!(body["entries"][0]["score"], 700_000);
        assert_eq!(body["entries"].as_array().unwrap().len(), 1);

        let (status, _) = send(&state, "GET", "/users/ghost/records", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

//! Player profiles: rating, exp level and activity aggregates.

use crate::database::query::{self, RecordSort};
use crate::database::{HistoryRow, PublicUser};
use crate::error::Result;
use crate::ranking::Page;
use crate::ranking::profile::{PlayedRecord, ProfileSummary, summarize};
use crate::server::AppState;
use crate::server::records::RecordDetailView;
use crate::server::users::find_user;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::sync::Arc;

const PROFILE_RECORDS: u32 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: PublicUser,
    #[serde(flatten)]
    pub summary: ProfileSummary,
    pub recent_records: Vec<RecordDetailView>,
    pub best_records: Vec<RecordDetailView>,
    pub levels_published: i64,
    pub ratings_given: i64,
}

impl From<HistoryRow> for PlayedRecord {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            chart_id: row.chart_id,
            difficulty: row.difficulty,
            score: row.score,
            accuracy: row.accuracy,
            max_combo: row.max_combo,
            ranked: row.ranked,
            rating: row.rating,
            created_at: row.created_at,
        }
    }
}

async fn load_profile(state: &AppState, user: PublicUser) -> Result<Profile> {
    let pool = state.db.pool();

    let history: Vec<PlayedRecord> = query::get_user_history(pool, user.id)
        .await?
        .into_iter()
        .map(PlayedRecord::from)
        .collect();
    let summary = summarize(&history, state.config.ranking.rating_top_n);

    let page = Page {
        page: 0,
        limit: PROFILE_RECORDS,
    };
    let (_, recent) = query::get_user_records(pool, user.id, RecordSort::Date, page).await?;
    let (_, best) = query::get_user_records(pool, user.id, RecordSort::Rating, page).await?;

    Ok(Profile {
        levels_published: query::count_levels_by_owner(pool, user.id).await?,
        ratings_given: query::count_ratings_by_user(pool, user.id).await?,
        recent_records: recent.into_iter().map(RecordDetailView::from).collect(),
        best_records: best
            .into_iter()
            .filter(|d| d.record.ranked)
            .map(RecordDetailView::from)
            .collect(),
        summary,
        user,
    })
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<Profile>> {
    let user = PublicUser::from(&find_user(&state, &username).await?);

    let profile = state
        .profiles
        .get_or_try_insert_with(user.id, || async {
            log::debug!("CACHE: Loading profile of {}", user.username);
            load_profile(&state, user).await
        })
        .await?;
    Ok(Json(profile))
}

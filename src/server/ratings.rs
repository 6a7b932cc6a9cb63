//! Level quality ratings (1 to 10 votes).

use crate::auth;
use crate::database::{Level, query};
use crate::error::{AppError, Result};
use crate::ranking::RatingSummary;
use crate::ranking::bayesian::{MAX_LEVEL_RATING, MIN_LEVEL_RATING};
use crate::server::AppState;
use crate::server::levels::visible_level;
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct RateBody {
    rating: i64,
}

async fn build_summary(state: &AppState, level: &Level, viewer: Option<i64>) -> Result<RatingSummary> {
    let pool = state.db.pool();
    let buckets = query::get_rating_buckets(pool, level.id).await?;
    let own = match viewer {
        Some(user_id) => query::get_own_rating(pool, level.id, user_id).await?,
        None => None,
    };
    Ok(RatingSummary::from_buckets(&buckets, state.prior().await?, own))
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
) -> Result<Json<RatingSummary>> {
    let viewer = auth::optional_user(&headers, &state).await?;
    let level = visible_level(&state, &uid, viewer.as_ref()).await?;
    Ok(Json(build_summary(&state, &level, viewer.map(|u| u.id)).await?))
}

pub async fn rate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Json(body): Json<RateBody>,
) -> Result<Json<RatingSummary>> {
    let user = auth::require_user(&headers, &state).await?;
    let level = visible_level(&state, &uid, Some(&user)).await?;

    if level.owner_id == user.id {
        return Err(AppError::Forbidden(
            "You cannot rate your own level".to_string(),
        ));
    }
    if !(MIN_LEVEL_RATING..=MAX_LEVEL_RATING).contains(&body.rating) {
        return Err(AppError::BadRequest(format!(
            "Rating must be within {MIN_LEVEL_RATING}..={MAX_LEVEL_RATING}"
        )));
    }

    query::upsert_rating(state.db.pool(), level.id, user.id, body.rating, auth::now()).await?;
    state.invalidate_ratings();
    state.invalidate_user(user.id);

    log::info!("LEVELS: {} rated '{}' {}", user.username, uid, body.rating);
    Ok(Json(build_summary(&state, &level, Some(user.id)).await?))
}

pub async fn unrate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
) -> Result<Json<RatingSummary>> {
    let user = auth::require_user(&headers, &state).await?;
    let level = visible_level(&state, &uid, Some(&user)).await?;

    if query::delete_rating(state.db.pool(), level.id, user.id).await? == 0 {
        return Err(AppError::not_found("Rating"));
    }
    state.invalidate_ratings();
    state.invalidate_user(user.id);

    Ok(Json(build_summary(&state, &level, Some(user.id)).await?))
}

#[cfg(test)]
mod tests {
    use crate::server::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_rating_flow() {
        let state = test_state().await;
        let owner = register(&state, "owner").await;
        let voter = register(&state, "voter").await;
        publish(&state, &owner, "rated", true).await;

        let (status, body) = send(&state, "GET", "/levels/rated/ratings", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
        assert!(body["average"].is_null());

        let (status, body) = send(
            &state,
            "POST",
            "/levels/rated/ratings",
            Some(&voter),
            Some(json!({ "rating": 8 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["own"], 8);
        assert_eq!(body["distribution"][7], 1);
        // the only vote is also the global mean: (5 * 8 + 8) / 6
        assert!((body["average"].as_f64().unwrap() - 8.0).abs() < 1e-9);
        assert_eq!(body["raw_average"], 8.0);

        // voting again replaces the previous vote
        let (_, body) = send(
            &state,
            "POST",
            "/levels/rated/ratings",
            Some(&voter),
            Some(json!({ "rating": 3 })),
        )
        .await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["own"], 3);

        let (_, body) = send(&state, "GET", "/levels/rated", None, None).await;
        assert_eq!(body["rating_count"], 1);

        let (status, body) =
            send(&state, "DELETE", "/levels/rated/ratings", Some(&voter), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
        assert!(body["own"].is_null());

        let (status, _) = send(&state, "DELETE", "/levels/rated/ratings", Some(&voter), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rating_rules() {
        let state = test_state().await;
        let owner = register(&state, "owner").await;
        let voter = register(&state, "voter").await;
        publish(&state, &owner, "level", true).await;
        publish(&state, &owner, "hidden", false).await;

        let rate = |uid: &'static str, token: String, rating: i64| {
            let state = state.clone();
            async move {
                send(
                    &state,
                    "POST",
                    &format!("/levels/{uid}/ratings"),
                    Some(&token),
                    Some(json!({ "rating": rating })),
                )
                .await
                .0
            }
        };

        assert_eq!(rate("level", owner.clone(), 9).await, StatusCode::FORBIDDEN);
        assert_eq!(rate("level", voter.clone(), 0).await, StatusCode::BAD_REQUEST);
        assert_eq!(rate("level", voter.clone(), 11).await, StatusCode::BAD_REQUEST);
        assert_eq!(rate("hidden", voter.clone(), 5).await, StatusCode::NOT_FOUND);
        assert_eq!(rate("level", voter, 10).await, StatusCode::OK);

        let (status, _) = send(
            &state,
            "POST",
            "/levels/level/ratings",
            None,
            Some(json!({ "rating": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bayesian_average_uses_global_mean() {
        let state = test_state().await;
        let owner = register(&state, "owner").await;
        let a = register(&state, "voter_a").await;
        let b = register(&state, "voter_b").await;
        publish(&state, &owner, "good", true).await;
        publish(&state, &owner, "bad", true).await;

        for (uid, token, rating) in [("good", &a, 10), ("good", &b, 10), ("bad", &a, 2)] {
            let (status, _) = send(
                &state,
                "POST",
                &format!("/levels/{uid}/ratings"),
                Some(token.as_str()),
                Some(json!({ "rating": rating })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        // global mean is 22 / 3; good = (5 * 22/3 + 20) / 7
        let (_, body) = send(&state, "GET", "/levels/good/ratings", None, None).await;
        let expected = (5.0 * 22.0 / 3.0 + 20.0) / 7.0;
        assert!((body["average"].as_f64().unwrap() - expected).abs() < 1e-9);

        let (_, body) = send(&state, "GET", "/levels?sort=rating", None, None).await;
        let uids: Vec<&str> = body["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["uid"].as_str().unwrap())
            .collect();
        assert_eq!(uids, ["good", "bad"]);
    }
}

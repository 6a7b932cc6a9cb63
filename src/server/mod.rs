//! HTTP layer: shared state, router and the serve loop.
//!
//! Handlers live in one module per resource and all return
//! [`crate::error::Result`], so every failure goes through
//! `AppError::into_response`.

pub mod levels;
pub mod profile;
pub mod ratings;
pub mod records;
pub mod users;

use crate::cache::TtlCache;
use crate::config::HubConfig;
use crate::database::Database;
use crate::database::query;
use crate::error::{AppError, Result};
use crate::ranking::{Paged, Prior};
use axum::{
    Json, Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// `(chart_id, page, limit)`.
pub type LeaderboardKey = (i64, u32, u32);

pub struct AppState {
    pub db: Database,
    pub config: HubConfig,
    pub leaderboards: TtlCache<LeaderboardKey, Paged<records::LeaderboardEntry>>,
    pub profiles: TtlCache<i64, profile::Profile>,
    /// Site-wide mean of level ratings.
    pub rating_mean: TtlCache<(), f64>,
}

impl AppState {
    pub fn new(db: Database, config: HubConfig) -> Arc<Self> {
        let ttl = Duration::from_secs(config.ranking.cache_ttl_secs);
        let max = config.ranking.cache_max_entries;
        Arc::new(Self {
            db,
            leaderboards: TtlCache::new(ttl, max),
            profiles: TtlCache::new(ttl, max),
            rating_mean: TtlCache::new(ttl, 1),
            config,
        })
    }

    /// Prior of the Bayesian level rating: the global mean of all ratings,
    /// or the configured default while there are none.
    pub async fn prior(&self) -> Result<Prior> {
        let default_mean = self.config.ranking.default_prior_mean;
        let pool = self.db.pool().clone();
        let mean = self
            .rating_mean
            .get_or_try_insert_with((), || async move {
                let mean = query::get_global_rating_mean(&pool).await?;
                Ok::<_, AppError>(mean.unwrap_or(default_mean))
            })
            .await?;
        Ok(Prior {
            mean,
            weight: self.config.ranking.prior_weight,
        })
    }

    pub fn invalidate_chart(&self, chart_id: i64) {
        self.leaderboards.invalidate_where(|(id, _, _)| *id == chart_id);
    }

    pub fn invalidate_user(&self, user_id: i64) {
        self.profiles.invalidate(&user_id);
    }

    pub fn invalidate_ratings(&self) {
        self.rating_mean.clear();
    }
}

/// Runs replay encoding and file I/O on the blocking pool.
pub async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {e}")))
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    use axum::routing::post;

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(state.config.server.cors_max_age_secs));

    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(users::register))
        .route("/auth/login", post(users::login))
        .route("/auth/logout", post(users::logout))
        .route("/auth/me", get(users::me))
        .route("/users/{username}", get(users::get_user))
        .route("/users/{username}/profile", get(profile::get_profile))
        .route("/users/{username}/records", get(records::user_records))
        .route("/levels", get(levels::list).post(levels::publish))
        .route(
            "/levels/{uid}",
            get(levels::get_level)
                .patch(levels::update)
                .delete(levels::delete),
        )
        .route(
            "/levels/{uid}/ratings",
            get(ratings::summary)
                .post(ratings::rate)
                .delete(ratings::unrate),
        )
        .route(
            "/levels/{uid}/charts/{chart_type}/records",
            get(records::leaderboard).post(records::submit),
        )
        .route(
            "/levels/{uid}/charts/{chart_type}/records/around",
            get(records::around),
        )
        .route("/records/{id}", get(records::get_record))
        .route("/records/{id}/replay", get(records::get_replay))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Opens the database and serves until Ctrl+C or SIGTERM.
pub async fn start_server(config: HubConfig) -> Result<()> {
    log::info!("SERVER: Initializing state...");
    let db = Database::connect(&config.database.path, config.database.max_connections).await?;
    let state = AppState::new(db.clone(), config);

    let app = router(state.clone());

    let address = state.config.server.bind.clone();
    let listener = TcpListener::bind(&address).await?;
    log::info!("SERVER: Running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("SERVER: Shutting down...");
    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        log::info!("SERVER: Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        log::info!("SERVER: Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers shared by the handler tests.

    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    pub async fn test_state() -> Arc<AppState> {
        let mut config = HubConfig::default();
        config.auth.hash_rounds = 2;
        config.database.replay_dir = std::env::temp_dir().join(format!(
            "rvsrg-hub-test-{}",
            crate::auth::generate_token()
        ));
        AppState::new(Database::in_memory().await.unwrap(), config)
    }

    /// Sends one request through a fresh router.
    pub async fn send(
        state: &Arc<AppState>,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Registers a user and returns its bearer token.
    pub async fn register(state: &Arc<AppState>, username: &str) -> String {
        let (status, body) = send(
            state,
            "POST",
            "/auth/register",
            None,
            Some(serde_json::json!({ "username": username, "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub const CHART_CONTENT: &str = "[Notes]\n0,0\n500,1\n1000,2\n1500,3\n";

    pub fn chart_checksum() -> String {
        format!("{:x}", md5::compute(CHART_CONTENT))
    }

    /// Publishes a level with an `easy` chart of 10 notes, difficulty 10.
    pub async fn publish(state: &Arc<AppState>, token: &str, uid: &str, published: bool) {
        let (status, body) = send(
            state,
            "POST",
            "/levels",
            Some(token),
            Some(serde_json::json!({
                "uid": uid,
                "title": format!("Song {uid}"),
                "artist": "Artist",
                "charter": "Charter",
                "tags": ["test"],
                "published": published,
                "charts": [
                    { "type": "easy", "difficulty": 10, "notes_count": 10, "content": CHART_CONTENT },
                    { "type": "hard", "difficulty": 14, "notes_count": 10, "content": "other" },
                ],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    /// Submits a record with `perfect` perfects and the rest greats.
    pub async fn submit(
        state: &Arc<AppState>,
        token: &str,
        uid: &str,
        score: i64,
        perfect: u32,
    ) -> (StatusCode, Value) {
        send(
            state,
            "POST",
            &format!("/levels/{uid}/charts/easy/records"),
            Some(token),
            Some(serde_json::json!({
                "score": score,
                "checksum": chart_checksum(),
                "mods": [],
                "details": {
                    "perfect": perfect,
                    "great": 10 - perfect,
                    "good": 0,
                    "bad": 0,
                    "miss": 0,
                    "max_combo": 10,
                },
            })),
        )
        .await
    }
}

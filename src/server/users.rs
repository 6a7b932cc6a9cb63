//! Account routes: register, login, logout and public user lookups.

use crate::auth;
use crate::database::{PublicUser, User, query};
use crate::error::{AppError, Result};
use crate::server::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct RegisterBody {
    username: String,
    email: Option<String>,
    password: String,
}

#[derive(Deserialize)]
pub struct LoginBody {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    user: PublicUser,
    token: String,
}

/// The caller's own account, including private fields.
#[derive(Serialize)]
pub struct Me {
    id: i64,
    username: String,
    email: Option<String>,
    created_at: i64,
}

impl From<User> for Me {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let (user, token) =
        auth::register(&state, &body.username, body.email.as_deref(), &body.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user: PublicUser::from(&user),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginBody>,
) -> Result<Json<SessionResponse>> {
    let (user, token) = auth::login(&state, &body.username, &body.password).await?;
    Ok(Json(SessionResponse {
        user: PublicUser::from(&user),
        token,
    }))
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<StatusCode> {
    let user = auth::require_user(&headers, &state).await?;
    let token = auth::bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    auth::logout(&state, token).await?;
    log::info!("AUTH: {} logged out", user.username);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<Me>> {
    let user = auth::require_user(&headers, &state).await?;
    Ok(Json(Me::from(user)))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<PublicUser>> {
    let user = find_user(&state, &username).await?;
    Ok(Json(PublicUser::from(&user)))
}

/// User by name, or 404.
pub async fn find_user(state: &AppState, username: &str) -> Result<User> {
    query::get_user_by_name(state.db.pool(), username)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

#[cfg(test)]
mod tests {
    use crate::server::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_and_me() {
        let state = test_state().await;
        let token = register(&state, "alice").await;

        let (status, body) = send(&state, "GET", "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");

        let (status, _) = send(&state, "GET", "/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let state = test_state().await;
        let (status, body) = send(
            &state,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "a b", "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Username"));

        register(&state, "bob").await;
        let (status, _) = send(
            &state,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "BOB", "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let state = test_state().await;
        register(&state, "carol").await;

        let (status, _) = send(
            &state,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "carol", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &state,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "Carol", "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _) = send(&state, "POST", "/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&state, "GET", "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_public_user() {
        let state = test_state().await;
        register(&state, "dave").await;

        let (status, body) = send(&state, "GET", "/users/DAVE", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "dave");
        assert!(body.get("email").is_none());

        let (status, body) = send(&state, "GET", "/users/nobody", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }
}

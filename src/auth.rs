//! Accounts and bearer sessions.
//!
//! Passwords are stored as iterated SHA-256 over `salt || password`. Session
//! tokens are 32 random bytes handed to the client once; only their SHA-256
//! reaches the database.

use crate::database::{User, query};
use crate::error::{AppError, Result};
use crate::server::AppState;
use axum::http::{HeaderMap, header::AUTHORIZATION};
use sha2::{Digest, Sha256};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 24;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::BadRequest(format!(
            "Username must be {USERNAME_MIN} to {USERNAME_MAX} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::BadRequest(
            "Username may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(AppError::BadRequest(format!(
            "Password must be {PASSWORD_MIN} to {PASSWORD_MAX} characters"
        )));
    }
    Ok(())
}

pub fn generate_salt() -> String {
    to_hex(&rand::random::<[u8; 16]>())
}

pub fn hash_password(password: &str, salt: &str, rounds: u32) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..rounds {
        digest = Sha256::digest(digest);
    }
    to_hex(&digest)
}

pub fn verify_password(user: &User, password: &str, rounds: u32) -> bool {
    let candidate = hash_password(password, &user.password_salt, rounds);
    // compare every byte so timing does not leak the matching prefix
    candidate.len() == user.password_hash.len()
        && candidate
            .bytes()
            .zip(user.password_hash.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

pub fn generate_token() -> String {
    to_hex(&rand::random::<[u8; 32]>())
}

pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The authenticated user, or 401.
pub async fn require_user(headers: &HeaderMap, state: &AppState) -> Result<User> {
    optional_user(headers, state)
        .await?
        .ok_or(AppError::Unauthorized)
}

/// `None` when no token is sent; an invalid or expired token is still a 401.
pub async fn optional_user(headers: &HeaderMap, state: &AppState) -> Result<Option<User>> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    let user = query::get_session_user(state.db.pool(), &hash_token(token), now()).await?;
    match user {
        Some(user) => Ok(Some(user)),
        None => Err(AppError::Unauthorized),
    }
}

async fn open_session(state: &AppState, user_id: i64) -> Result<String> {
    let token = generate_token();
    let created_at = now();
    let expires_at = created_at + state.config.auth.session_ttl_days * 24 * 60 * 60;
    query::insert_session(
        state.db.pool(),
        &hash_token(&token),
        user_id,
        created_at,
        expires_at,
    )
    .await?;
    Ok(token)
}

pub async fn register(
    state: &AppState,
    username: &str,
    email: Option<&str>,
    password: &str,
) -> Result<(User, String)> {
    let username = username.trim();
    validate_username(username)?;
    validate_password(password)?;
    let email = email.map(str::trim).filter(|e| !e.is_empty());

    let pool = state.db.pool();
    if query::get_user_by_name(pool, username).await?.is_some() {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let salt = generate_salt();
    let hash = hash_password(password, &salt, state.config.auth.hash_rounds);
    let id = match query::insert_user(pool, username, email, &hash, &salt, now()).await {
        Ok(id) => id,
        Err(e) => {
            let err = AppError::from(e);
            // lost a race against a concurrent registration
            if err.is_unique_violation() {
                return Err(AppError::Conflict("Username already taken".to_string()));
            }
            return Err(err);
        }
    };

    let user = query::get_user_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::Internal("User vanished after insert".to_string()))?;
    let token = open_session(state, user.id).await?;

    log::info!("AUTH: Registered {} (id {})", user.username, user.id);
    Ok((user, token))
}

pub async fn login(state: &AppState, username: &str, password: &str) -> Result<(User, String)> {
    let pool = state.db.pool();

    let purged = query::purge_expired_sessions(pool, now()).await?;
    if purged > 0 {
        log::debug!("AUTH: Purged {} expired sessions", purged);
    }

    let user = query::get_user_by_name(pool, username.trim())
        .await?
        .filter(|u| verify_password(u, password, state.config.auth.hash_rounds))
        .ok_or_else(|| {
            log::info!("AUTH: Failed login for {}", username.trim());
            AppError::Unauthorized
        })?;

    let token = open_session(state, user.id).await?;
    log::info!("AUTH: {} logged in", user.username);
    Ok((user, token))
}

pub async fn logout(state: &AppState, token: &str) -> Result<()> {
    query::delete_session(state.db.pool(), &hash_token(token)).await?;
    Ok(())
}

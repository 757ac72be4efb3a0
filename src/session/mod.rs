//! Session-backed authentication.
//!
//! Tokens are opaque and stored server side, one row per live session.
//! Every request resolves its token against the database, so revoking a
//! session or removing a user takes effect immediately.

use chrono::{Duration, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::database::now_utc;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication required")]
    MissingSession,

    #[error("session is invalid or expired")]
    InvalidSession,

    #[error("invalid credentials")]
    BadCredentials,

    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// The signed-in user attached to a request.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: String,
}

/// Creates a session row for `user_id` and returns its bearer token.
pub async fn issue(pool: &SqlitePool, user_id: i64) -> Result<Session, AuthError> {
    let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let ttl_hours = config::config().security.session_ttl_hours;
    let expires_at = (Utc::now() + Duration::hours(ttl_hours as i64))
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(now_utc())
        .bind(&expires_at)
        .execute(pool)
        .await?;

    Ok(Session { token, expires_at })
}

/// Resolves a token to its user. Fails when the session is unknown or
/// expired, or when the user has since been removed.
pub async fn resolve(pool: &SqlitePool, token: &str) -> Result<AuthUser, AuthError> {
    let user = sqlx::query_as::<_, AuthUser>(
        "SELECT u.id, u.name, u.email, u.username, u.role \
         FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ? AND s.expires_at > ? AND u.deleted_at IS NULL",
    )
    .bind(token)
    .bind(now_utc())
    .fetch_optional(pool)
    .await?;

    user.ok_or(AuthError::InvalidSession)
}

pub async fn revoke(pool: &SqlitePool, token: &str) -> Result<(), AuthError> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Drops every live session for a user, used when the account is removed.
pub async fn revoke_all_for_user(pool: &SqlitePool, user_id: i64) -> Result<(), AuthError> {
    sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Hashes a password with a fresh random salt, stored as "salt:digest".
pub fn hash_password(raw: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{salt}:{}", digest(&salt, raw))
}

pub fn verify_password(raw: &str, stored: &str) -> bool {
    match stored.split_once(':') {
        Some((salt, expected)) => digest(salt, raw) == expected,
        None => false,
    }
}

fn digest(salt: &str, raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

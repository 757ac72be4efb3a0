// handlers/auth.rs - sign-up, sign-in, sign-out, whoami
//
// Sessions are issued on sign-up and sign-in. The token is returned in
// the JSON body for API clients and set as a cookie for browsers; both
// point at the same session row.

use axum::extract::State;
use axum::http::{header::SET_COOKIE, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::config;
use crate::database::{now_utc, quote_ident, Record, StoreError};
use crate::error::ApiError;
use crate::extract::{CurrentUser, FieldBag, SESSION_COOKIE};
use crate::response::{ApiResponse, ApiResult};
use crate::session::{self, AuthError, AuthUser, Session};
use crate::validate::{req, FieldKind, Mode, Schema};
use crate::AppState;

static SIGN_UP: Schema = Schema {
    fields: &[
        req("name", FieldKind::Text { min: 2, max: 100 }),
        req("email", FieldKind::Email),
        req("username", FieldKind::Text { min: 3, max: 30 }),
        req("password", FieldKind::Password { min: 8 }),
    ],
};

static SIGN_IN: Schema = Schema {
    fields: &[
        req("username", FieldKind::Text { min: 1, max: 100 }),
        req("password", FieldKind::Password { min: 1 }),
    ],
};

#[derive(sqlx::FromRow)]
struct Credential {
    id: i64,
    name: String,
    email: String,
    username: String,
    password_hash: String,
    role: String,
}

/// POST /auth/sign-up - Create an account and start a session
///
/// The very first account becomes the administrator; everyone after
/// that signs up as a regular user.
pub async fn sign_up(State(state): State<AppState>, bag: FieldBag) -> Result<Response, ApiError> {
    let values = crate::validate::validate(&SIGN_UP, &bag.0, Mode::Create)?;
    let email = field(&values, "email");
    let username = field(&values, "username");

    ensure_identity_free(&state.db, email, username, None).await?;

    let existing: i64 = sqlx::query("SELECT COUNT(*) AS n FROM users")
        .fetch_one(&state.db)
        .await
        .and_then(|row| row.try_get("n"))
        .map_err(StoreError::from)?;
    let role = if existing == 0 { "admin" } else { "user" };

    let name = field(&values, "name");
    let hash = session::hash_password(field(&values, "password"));
    let now = now_utc();

    let result = sqlx::query(
        "INSERT INTO users (name, email, username, password_hash, role, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(email)
    .bind(username)
    .bind(&hash)
    .bind(role)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(StoreError::from)?;
    let user_id = result.last_insert_rowid();

    let session = session::issue(&state.db, user_id).await?;
    let user = AuthUser {
        id: user_id,
        name: name.to_string(),
        email: email.to_string(),
        username: username.to_string(),
        role: role.to_string(),
    };

    Ok(signed_in_response(StatusCode::CREATED, user, session))
}

/// POST /auth/sign-in - Verify credentials and start a session
pub async fn sign_in(State(state): State<AppState>, bag: FieldBag) -> Result<Response, ApiError> {
    let values = crate::validate::validate(&SIGN_IN, &bag.0, Mode::Create)?;
    let username = field(&values, "username");

    let found = sqlx::query_as::<_, Credential>(
        "SELECT id, name, email, username, password_hash, role \
         FROM users WHERE username = ? AND deleted_at IS NULL",
    )
    .bind(username)
    .fetch_optional(&state.db)
    .await
    .map_err(StoreError::from)?;

    let Some(cred) = found else {
        return Err(AuthError::BadCredentials.into());
    };
    if !session::verify_password(field(&values, "password"), &cred.password_hash) {
        return Err(AuthError::BadCredentials.into());
    }

    let session = session::issue(&state.db, cred.id).await?;
    let user = AuthUser {
        id: cred.id,
        name: cred.name,
        email: cred.email,
        username: cred.username,
        role: cred.role,
    };

    Ok(signed_in_response(StatusCode::OK, user, session))
}

/// DELETE /auth/session - Revoke the current session
pub async fn sign_out(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, ApiError> {
    session::revoke(&state.db, &current.token).await?;

    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    let body = ApiResponse::message("signed out");
    Ok(([(SET_COOKIE, cookie)], body).into_response())
}

/// GET /api/auth/whoami - The user behind the current session
pub async fn whoami(current: CurrentUser) -> ApiResult<AuthUser> {
    Ok(ApiResponse::success(current.user))
}

fn signed_in_response(status: StatusCode, user: AuthUser, session: Session) -> Response {
    let cookie = session_cookie(&session.token);
    let body = Json(json!({
        "success": true,
        "data": {
            "token": session.token,
            "expires_at": session.expires_at,
            "user": user,
        }
    }));
    (status, [(SET_COOKIE, cookie)], body).into_response()
}

fn session_cookie(token: &str) -> String {
    let security = &config::config().security;
    let max_age = security.session_ttl_hours * 3600;
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if security.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Validated string field out of a record; validation guarantees presence.
pub(crate) fn field<'a>(values: &'a Record, name: &str) -> &'a str {
    values.get(name).and_then(Value::as_str).unwrap_or("")
}

/// Email and username must be free among live accounts. Soft-deleted
/// accounts do not hold their identifiers.
pub(crate) async fn ensure_identity_free(
    pool: &SqlitePool,
    email: &str,
    username: &str,
    exclude_id: Option<i64>,
) -> Result<(), ApiError> {
    if !email.is_empty() && live_value_taken(pool, "email", email, exclude_id).await? {
        return Err(ApiError::conflict(format!("email '{email}' is already registered")));
    }
    if !username.is_empty() && live_value_taken(pool, "username", username, exclude_id).await? {
        return Err(ApiError::conflict(format!("username '{username}' is already registered")));
    }
    Ok(())
}

async fn live_value_taken(
    pool: &SqlitePool,
    column: &str,
    value: &str,
    exclude_id: Option<i64>,
) -> Result<bool, StoreError> {
    let mut sql = format!(
        "SELECT 1 FROM users WHERE {} = ? AND deleted_at IS NULL",
        quote_ident(column)
    );
    if exclude_id.is_some() {
        sql.push_str(" AND id != ?");
    }
    sql.push_str(" LIMIT 1");

    let mut query = sqlx::query(&sql).bind(value);
    if let Some(id) = exclude_id {
        query = query.bind(id);
    }
    Ok(query.fetch_optional(pool).await?.is_some())
}

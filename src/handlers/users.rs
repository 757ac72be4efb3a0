// handlers/users.rs - account administration
//
// Accounts soft delete: the row stays for the surveys that reference it,
// but the user can no longer sign in and their identifiers become free
// for reuse.

use axum::extract::{Path, State};
use serde_json::Value;
use sqlx::sqlite::SqlitePool;

use crate::database::row::row_to_json;
use crate::database::{now_utc, Record, StoreError};
use crate::error::ApiError;
use crate::extract::{CurrentUser, FieldBag};
use crate::handlers::auth::{ensure_identity_free, field};
use crate::response::{ApiResponse, ApiResult};
use crate::session;
use crate::validate::{opt, req, FieldKind, Mode, Schema};
use crate::AppState;

static USER_UPDATE: Schema = Schema {
    fields: &[
        req("name", FieldKind::Text { min: 2, max: 100 }),
        req("email", FieldKind::Email),
        req("username", FieldKind::Text { min: 3, max: 30 }),
        opt("password", FieldKind::Password { min: 8 }),
    ],
};

/// GET /api/users - List live accounts (admin only)
pub async fn list(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Value> {
    require_admin(&current)?;

    let rows = sqlx::query(
        "SELECT id, name, email, username, role, created_at, updated_at \
         FROM users WHERE deleted_at IS NULL ORDER BY id",
    )
    .fetch_all(&state.db)
    .await
    .map_err(StoreError::from)?;

    let users: Vec<Value> = rows.iter().map(|r| Value::Object(row_to_json(r))).collect();
    Ok(ApiResponse::success(Value::Array(users)))
}

/// PUT /api/users/:id - Update own account, or any account as admin
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    current: CurrentUser,
    bag: FieldBag,
) -> ApiResult<Value> {
    if current.user.id != id && !current.user.is_admin() {
        return Err(ApiError::forbidden("you can only change your own account"));
    }

    if !live_user_exists(&state.db, id).await? {
        return Err(ApiError::not_found("user not found"));
    }

    let values = crate::validate::validate(&USER_UPDATE, &bag.0, Mode::Update)?;
    ensure_identity_free(&state.db, field(&values, "email"), field(&values, "username"), Some(id))
        .await?;

    let mut sets: Vec<String> = Vec::new();
    let mut binds: Vec<String> = Vec::new();
    for key in ["name", "email", "username"] {
        if let Some(value) = values.get(key).and_then(Value::as_str) {
            sets.push(format!("{key} = ?"));
            binds.push(value.to_string());
        }
    }
    if let Some(raw) = values.get("password").and_then(Value::as_str) {
        sets.push("password_hash = ?".to_string());
        binds.push(session::hash_password(raw));
    }

    if sets.is_empty() {
        return Ok(ApiResponse::success(Value::Object(fetch_user(&state.db, id).await?)));
    }

    sets.push("updated_at = ?".to_string());
    binds.push(now_utc());

    let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
    let mut query = sqlx::query(&sql);
    for bind in &binds {
        query = query.bind(bind);
    }
    query.bind(id).execute(&state.db).await.map_err(StoreError::from)?;

    Ok(ApiResponse::success(Value::Object(fetch_user(&state.db, id).await?)))
}

/// DELETE /api/users/:id - Soft delete an account and revoke its sessions (admin only)
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    current: CurrentUser,
) -> ApiResult<Value> {
    require_admin(&current)?;
    if current.user.id == id {
        return Err(ApiError::forbidden("you cannot remove your own account"));
    }

    let now = now_utc();
    let rows = sqlx::query(
        "UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(&now)
    .bind(&now)
    .bind(id)
    .execute(&state.db)
    .await
    .map_err(StoreError::from)?
    .rows_affected();

    if rows == 0 {
        return Err(ApiError::not_found("user not found"));
    }

    session::revoke_all_for_user(&state.db, id).await?;
    Ok(ApiResponse::message("user removed"))
}

fn require_admin(current: &CurrentUser) -> Result<(), ApiError> {
    if current.user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("administrator access required"))
    }
}

async fn live_user_exists(pool: &SqlitePool, id: i64) -> Result<bool, StoreError> {
    let row = sqlx::query("SELECT 1 FROM users WHERE id = ? AND deleted_at IS NULL LIMIT 1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<Record, ApiError> {
    let row = sqlx::query(
        "SELECT id, name, email, username, role, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::from)?;

    row.as_ref().map(row_to_json).ok_or_else(|| ApiError::not_found("user not found"))
}

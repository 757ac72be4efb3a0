// handlers/data.rs - generic record endpoints under /api/data
//
// Entities are addressed by route name (/api/data/families, ...) and
// resolved against the registry; the action pipeline does the rest. All
// routes require a session.

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::Value;

use crate::actions;
use crate::entity::{self, EntityDef};
use crate::error::ApiError;
use crate::extract::{CurrentUser, FieldBag};
use crate::response::{ApiResponse, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct ScopeQuery {
    /// Narrow a list to one family's records.
    pub family_id: Option<i64>,
    /// Narrow a list to one member's records.
    pub member_id: Option<i64>,
}

/// POST /api/data/:entity - Create a record
pub async fn create(
    State(state): State<AppState>,
    Path(route): Path<String>,
    _user: CurrentUser,
    bag: FieldBag,
) -> ApiResult<Value> {
    let def = resolve(&route)?;
    let record = actions::create(&state.db, def, &bag).await?;
    Ok(ApiResponse::created(Value::Object(record)))
}

/// GET /api/data/:entity - List records, optionally scoped by parent id
pub async fn list(
    State(state): State<AppState>,
    Path(route): Path<String>,
    Query(scope): Query<ScopeQuery>,
    _user: CurrentUser,
) -> ApiResult<Value> {
    let def = resolve(&route)?;

    let mut filters: Vec<(&str, i64)> = Vec::new();
    if let Some(id) = scope.family_id {
        if has_field(def, "family_id") {
            filters.push(("family_id", id));
        }
    }
    if let Some(id) = scope.member_id {
        if has_field(def, "member_id") {
            filters.push(("member_id", id));
        }
    }

    let records = actions::list(&state.db, def, &filters).await?;
    Ok(ApiResponse::success(Value::Array(
        records.into_iter().map(Value::Object).collect(),
    )))
}

/// GET /api/data/:entity/:id - Get a single record by ID
pub async fn get(
    State(state): State<AppState>,
    Path((route, id)): Path<(String, i64)>,
    _user: CurrentUser,
) -> ApiResult<Value> {
    let def = resolve(&route)?;
    let record = actions::get(&state.db, def, id).await?;
    Ok(ApiResponse::success(Value::Object(record)))
}

/// PUT /api/data/:entity/:id - Update the provided fields of a record
pub async fn update(
    State(state): State<AppState>,
    Path((route, id)): Path<(String, i64)>,
    _user: CurrentUser,
    bag: FieldBag,
) -> ApiResult<Value> {
    let def = resolve(&route)?;
    let record = actions::update(&state.db, def, id, &bag).await?;
    Ok(ApiResponse::success(Value::Object(record)))
}

/// DELETE /api/data/:entity/:id - Delete a record unless dependents exist
pub async fn delete(
    State(state): State<AppState>,
    Path((route, id)): Path<(String, i64)>,
    _user: CurrentUser,
) -> ApiResult<Value> {
    let def = resolve(&route)?;
    actions::delete(&state.db, def, id).await?;
    Ok(ApiResponse::message(format!("{} deleted", def.name)))
}

fn resolve(route: &str) -> Result<&'static EntityDef, ApiError> {
    entity::lookup(route)
        .ok_or_else(|| ApiError::not_found(format!("unknown record type '{route}'")))
}

fn has_field(def: &EntityDef, name: &str) -> bool {
    def.schema.fields.iter().any(|f| f.name == name)
}

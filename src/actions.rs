//! Entity action pipeline.
//!
//! Every write runs the same stages in order: schema validation, parent
//! existence, uniqueness, then SQL through the generic repository. The
//! stages short-circuit, so the client sees exactly one error at a time
//! and nothing touches the database until the input has passed.

use serde_json::Value;
use sqlx::sqlite::SqlitePool;

use crate::database::{repository, DeleteOutcome, Record, Repository};
use crate::entity::EntityDef;
use crate::error::ApiError;
use crate::extract::FieldBag;
use crate::validate::{self, Mode};

pub async fn create(
    pool: &SqlitePool,
    def: &'static EntityDef,
    bag: &FieldBag,
) -> Result<Record, ApiError> {
    let values = validate::validate(&def.schema, &bag.0, Mode::Create)?;
    check_parents(pool, def, &values).await?;
    check_unique(pool, def, &values, None).await?;

    let repo = Repository::new(def, pool);
    let id = repo.insert(&values).await?;
    repo.find_by_id(id).await?.ok_or(ApiError::Internal)
}

pub async fn update(
    pool: &SqlitePool,
    def: &'static EntityDef,
    id: i64,
    bag: &FieldBag,
) -> Result<Record, ApiError> {
    if def.immutable {
        return Err(ApiError::forbidden(format!("{} records cannot be changed", def.name)));
    }

    let repo = Repository::new(def, pool);
    let existing = repo.find_by_id(id).await?.ok_or_else(|| not_found(def))?;

    let values = validate::validate(&def.schema, &bag.0, Mode::Update)?;
    if values.is_empty() {
        return Ok(existing);
    }

    check_parents(pool, def, &values).await?;
    check_unique(pool, def, &values, Some(id)).await?;

    if !repo.update(id, &values).await? {
        return Err(not_found(def));
    }
    repo.find_by_id(id).await?.ok_or(ApiError::Internal)
}

pub async fn delete(pool: &SqlitePool, def: &'static EntityDef, id: i64) -> Result<(), ApiError> {
    if def.immutable {
        return Err(ApiError::forbidden(format!("{} records cannot be deleted", def.name)));
    }

    let repo = Repository::new(def, pool);
    if def.dependents.is_empty() {
        if repo.delete(id).await? {
            return Ok(());
        }
        return Err(not_found(def));
    }

    match repo.delete_guarded(id).await? {
        DeleteOutcome::Deleted => Ok(()),
        DeleteOutcome::Blocked => Err(ApiError::dependency(format!(
            "cannot delete {}: dependent records exist",
            def.name
        ))),
        DeleteOutcome::Missing => Err(not_found(def)),
    }
}

pub async fn get(pool: &SqlitePool, def: &'static EntityDef, id: i64) -> Result<Record, ApiError> {
    Repository::new(def, pool).find_by_id(id).await?.ok_or_else(|| not_found(def))
}

pub async fn list(
    pool: &SqlitePool,
    def: &'static EntityDef,
    scope: &[(&str, i64)],
) -> Result<Vec<Record>, ApiError> {
    Ok(Repository::new(def, pool).list(scope).await?)
}

fn not_found(def: &EntityDef) -> ApiError {
    ApiError::not_found(format!("{} not found", def.name))
}

/// Each declared parent that carries a value must point at a real row.
async fn check_parents(
    pool: &SqlitePool,
    def: &EntityDef,
    values: &Record,
) -> Result<(), ApiError> {
    for parent in def.parents {
        let Some(value) = values.get(parent.field) else { continue };
        let Some(id) = value.as_i64() else { continue };
        if !repository::id_exists(pool, parent.table, id).await? {
            return Err(ApiError::validation(
                parent.field,
                format!("{} refers to a missing {}", parent.field, parent.label),
            ));
        }
    }
    Ok(())
}

/// Unique fields may not collide with any other row. On update the row
/// being written is excluded, so writing a value back to itself passes.
async fn check_unique(
    pool: &SqlitePool,
    def: &EntityDef,
    values: &Record,
    exclude_id: Option<i64>,
) -> Result<(), ApiError> {
    for rule in def.unique {
        let Some(value) = values.get(rule.field) else { continue };
        if value.is_null() {
            continue;
        }
        if repository::value_in_use(pool, def.table, rule.field, value, exclude_id).await? {
            let shown = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(ApiError::conflict(format!("{} '{shown}' is already in use", rule.label)));
        }
    }
    Ok(())
}

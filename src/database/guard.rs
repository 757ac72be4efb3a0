//! Referential integrity guard.
//!
//! Deletes go through here first: a row that is still referenced by any
//! dependent table stays put. Checks short-circuit on the first hit, and
//! callers run them inside the same transaction as the delete itself.

use sqlx::SqliteConnection;

use crate::database::{quote_ident, StoreError};
use crate::entity::EntityDef;

/// Returns true as soon as any dependent table still references `id`.
pub async fn has_dependents(
    conn: &mut SqliteConnection,
    def: &EntityDef,
    id: i64,
) -> Result<bool, StoreError> {
    for dep in def.dependents {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = ? LIMIT 1",
            quote_ident(dep.table),
            quote_ident(dep.fk)
        );
        let hit = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        if hit.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

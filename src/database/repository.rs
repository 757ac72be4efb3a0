//! Generic persistence over entity descriptors.
//!
//! One repository serves every entity. Column lists come from the entity's
//! schema, so SQL never mentions a concrete table beyond what the
//! descriptor declares, and values bind by JSON type.

use serde_json::{Map, Value};
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool};
use sqlx::Row;

use crate::database::row::row_to_json;
use crate::database::{guard, now_utc, quote_ident, StoreError};
use crate::entity::EntityDef;

pub type Record = Map<String, Value>;

#[derive(Debug, PartialEq)]
pub enum DeleteOutcome {
    Deleted,
    /// Dependent rows still reference the record.
    Blocked,
    Missing,
}

pub struct Repository {
    def: &'static EntityDef,
    pool: SqlitePool,
}

impl Repository {
    pub fn new(def: &'static EntityDef, pool: &SqlitePool) -> Self {
        Self { def, pool: pool.clone() }
    }

    /// Inserts the given column values and returns the new row id.
    pub async fn insert(&self, values: &Record) -> Result<i64, StoreError> {
        let columns = self.schema_columns(values);
        let now = now_utc();

        let mut sql = format!("INSERT INTO {} (", quote_ident(self.def.table));
        sql.push_str(
            &columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
        );
        sql.push_str(", created_at, updated_at) VALUES (");
        sql.push_str(&vec!["?"; columns.len() + 2].join(", "));
        sql.push(')');

        let mut query = sqlx::query(&sql);
        for column in &columns {
            query = bind_value(query, &values[*column]);
        }
        query = query.bind(&now).bind(&now);

        let result = query.execute(&self.pool).await?;
        Ok(result.last_insert_rowid())
    }

    /// Overwrites the provided columns on one row. Returns false when the
    /// row does not exist.
    pub async fn update(&self, id: i64, values: &Record) -> Result<bool, StoreError> {
        let columns = self.schema_columns(values);
        let now = now_utc();

        let mut sets: Vec<String> =
            columns.iter().map(|c| format!("{} = ?", quote_ident(c))).collect();
        sets.push("updated_at = ?".to_string());

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            quote_ident(self.def.table),
            sets.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for column in &columns {
            query = bind_value(query, &values[*column]);
        }
        query = query.bind(&now).bind(id);

        Ok(query.execute(&self.pool).await?.rows_affected() > 0)
    }

    /// Deletes one row with no dependency check. Use for leaf entities.
    pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", quote_ident(self.def.table));
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes one row unless dependent records still reference it. The
    /// check and the delete share a transaction so nothing can slip in
    /// between them.
    pub async fn delete_guarded(&self, id: i64) -> Result<DeleteOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        if guard::has_dependents(&mut tx, self.def, id).await? {
            tx.rollback().await?;
            return Ok(DeleteOutcome::Blocked);
        }

        let sql = format!("DELETE FROM {} WHERE id = ?", quote_ident(self.def.table));
        let rows = sqlx::query(&sql).bind(id).execute(&mut *tx).await?.rows_affected();
        tx.commit().await?;

        Ok(if rows > 0 { DeleteOutcome::Deleted } else { DeleteOutcome::Missing })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Record>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", quote_ident(self.def.table));
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(row_to_json))
    }

    /// Lists rows, optionally narrowed by `scope` equality filters. Parents
    /// that declare display columns are joined in.
    pub async fn list(&self, scope: &[(&str, i64)]) -> Result<Vec<Record>, StoreError> {
        let mut sql = "SELECT t.*".to_string();

        let joined: Vec<_> =
            self.def.parents.iter().enumerate().filter(|(_, p)| !p.display.is_empty()).collect();
        for (index, parent) in &joined {
            for column in parent.display {
                sql.push_str(&format!(", p{index}.{0} AS {0}", quote_ident(column)));
            }
        }

        sql.push_str(&format!(" FROM {} t", quote_ident(self.def.table)));
        for (index, parent) in &joined {
            sql.push_str(&format!(
                " LEFT JOIN {} p{index} ON t.{} = p{index}.id",
                quote_ident(parent.table),
                quote_ident(parent.field)
            ));
        }

        if !scope.is_empty() {
            let clauses: Vec<String> =
                scope.iter().map(|(field, _)| format!("t.{} = ?", quote_ident(field))).collect();
            sql.push_str(&format!(" WHERE {}", clauses.join(" AND ")));
        }

        let order: Vec<String> = self
            .def
            .order_by
            .split(',')
            .map(|c| format!("t.{}", quote_ident(c.trim())))
            .collect();
        sql.push_str(&format!(" ORDER BY {}", order.join(", ")));

        let mut query = sqlx::query(&sql);
        for (_, id) in scope {
            query = query.bind(*id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) AS n FROM {}", quote_ident(self.def.table));
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        Ok(row.try_get("n")?)
    }

    /// Fields from `values` that belong to the schema, in declaration order.
    fn schema_columns(&self, values: &Record) -> Vec<&'static str> {
        self.def
            .schema
            .fields
            .iter()
            .map(|f| f.name)
            .filter(|name| values.contains_key(*name))
            .collect()
    }
}

/// True when `id` exists in `table`.
pub async fn id_exists(pool: &SqlitePool, table: &str, id: i64) -> Result<bool, StoreError> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ? LIMIT 1", quote_ident(table));
    Ok(sqlx::query(&sql).bind(id).fetch_optional(pool).await?.is_some())
}

/// True when another row already holds `value` in `field`.
pub async fn value_in_use(
    pool: &SqlitePool,
    table: &str,
    field: &str,
    value: &Value,
    exclude_id: Option<i64>,
) -> Result<bool, StoreError> {
    let mut sql = format!("SELECT 1 FROM {} WHERE {} = ?", quote_ident(table), quote_ident(field));
    if exclude_id.is_some() {
        sql.push_str(" AND id != ?");
    }
    sql.push_str(" LIMIT 1");

    let mut query = bind_value(sqlx::query(&sql), value);
    if let Some(id) = exclude_id {
        query = query.bind(id);
    }
    Ok(query.fetch_optional(pool).await?.is_some())
}

/// Binds a JSON value by its own type.
pub(crate) fn bind_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) if n.is_i64() => query.bind(n.as_i64()),
        Value::Number(n) => query.bind(n.as_f64()),
        Value::String(s) => query.bind(s.as_str()),
        other => query.bind(other.to_string()),
    }
}

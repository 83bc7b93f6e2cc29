//! Raw parameterized statements against a module database

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::Row;
use sqlx_sqlite_module_mgr::ModuleDatabase;
use tracing::trace;

use crate::Result;
use crate::decode::decode_rows;

/// Result returned from write operations (e.g. INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteQueryResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted row ID (SQLite ROWID).
   ///
   /// Only meaningful for INSERT operations on tables with a ROWID.
   pub last_insert_id: i64,
}

/// Execute a write statement (INSERT/UPDATE/DELETE/DDL).
pub async fn execute(
   db: &ModuleDatabase,
   query: &str,
   values: Vec<JsonValue>,
) -> Result<WriteQueryResult> {
   trace!(module = %db.module(), sql = %query, "execute");

   let mut q = sqlx::query(query);
   for value in values {
      q = bind_value(q, value);
   }

   let result = q.execute(db.pool()?).await?;
   Ok(WriteQueryResult {
      rows_affected: result.rows_affected(),
      last_insert_id: result.last_insert_rowid(),
   })
}

/// Execute a SELECT query, returning every row as a column-name map.
pub async fn fetch_all(
   db: &ModuleDatabase,
   query: &str,
   values: Vec<JsonValue>,
) -> Result<Vec<IndexMap<String, JsonValue>>> {
   trace!(module = %db.module(), sql = %query, "fetch_all");

   let mut q = sqlx::query(query);
   for value in values {
      q = bind_value(q, value);
   }

   let rows = q.fetch_all(db.pool()?).await?;
   decode_rows(rows)
}

/// Execute a query whose first column is an integer, e.g. `SELECT COUNT(*)`.
pub async fn fetch_scalar_i64(
   db: &ModuleDatabase,
   query: &str,
   values: Vec<JsonValue>,
) -> Result<i64> {
   trace!(module = %db.module(), sql = %query, "fetch_scalar");

   let mut q = sqlx::query(query);
   for value in values {
      q = bind_value(q, value);
   }

   let row = q.fetch_one(db.pool()?).await?;
   Ok(row.try_get::<i64, _>(0)?)
}

/// Helper function to bind a JSON value to a SQLx query
pub(crate) fn bind_value<'a>(
   query: sqlx::query::Query<'a, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'a>>,
   value: JsonValue,
) -> sqlx::query::Query<'a, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'a>> {
   match value {
      JsonValue::Null => query.bind(None::<String>),
      JsonValue::Bool(flag) => query.bind(flag),
      JsonValue::String(text) => query.bind(text),
      JsonValue::Number(number) => {
         // Preserve integer precision by binding as i64 when possible
         if let Some(int_val) = number.as_i64() {
            query.bind(int_val)
         } else if let Some(uint_val) = number.as_u64() {
            // Value too large for i64, use f64 (will lose precision)
            query.bind(uint_val as f64)
         } else {
            query.bind(number.as_f64().unwrap_or_default())
         }
      }
      // Arrays and objects are stored as JSON text
      other => query.bind(other),
   }
}

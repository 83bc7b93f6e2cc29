//! Fluent query builder over a single module database
//!
//! Builder methods accumulate state and return the builder; terminal
//! methods (`get`, `first`, `insert`, `update`, `delete`, `count`) consume
//! it, render one SQL statement with numbered placeholders and execute it.
//!
//! Conditions are always combined with `AND`. There is no `OR` and no
//! grouping; issue separate queries when you need either.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use sqlx_sqlite_toolkit::{QueryBuilder, SortDirection};
//!
//! # async fn demo(db: &sqlx_sqlite_module_mgr::ModuleDatabase) -> sqlx_sqlite_toolkit::Result<()> {
//! let rows = QueryBuilder::new(db)
//!    .table("pages")
//!    .select(["id", "title"])
//!    .and_where("published", "=", 1)
//!    .order_by("id", SortDirection::Desc)
//!    .limit(10)
//!    .get()
//!    .await?;
//! # Ok(())
//! # }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx_sqlite_module_mgr::ModuleDatabase;

use crate::query::{WriteQueryResult, execute, fetch_all, fetch_scalar_i64};
use crate::{Error, Result};

/// Sort direction for an ORDER BY column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
   /// Ascending order (smallest first)
   Asc,
   /// Descending order (largest first)
   Desc,
}

impl SortDirection {
   fn as_sql(self) -> &'static str {
      match self {
         SortDirection::Asc => "ASC",
         SortDirection::Desc => "DESC",
      }
   }
}

/// Comparison operators accepted by [`QueryBuilder::and_where`].
const OPERATORS: &[&str] = &[
   "=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE", "IS", "IS NOT",
];

#[derive(Debug, Clone)]
struct Condition {
   column: String,
   operator: String,
   value: JsonValue,
}

/// Single-use SQL builder bound to one module database.
#[must_use = "a query builder does nothing until a terminal method is awaited"]
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
   db: &'a ModuleDatabase,
   table: Option<String>,
   columns: Vec<String>,
   conditions: Vec<Condition>,
   orders: Vec<(String, SortDirection)>,
   limit: Option<u64>,
   offset: Option<u64>,
}

impl<'a> QueryBuilder<'a> {
   pub fn new(db: &'a ModuleDatabase) -> Self {
      Self {
         db,
         table: None,
         columns: Vec::new(),
         conditions: Vec::new(),
         orders: Vec::new(),
         limit: None,
         offset: None,
      }
   }

   /// Target table.
   pub fn table(mut self, table: impl Into<String>) -> Self {
      self.table = Some(table.into());
      self
   }

   /// Columns to return from `get`/`first`. Defaults to `*`.
   pub fn select<I, S>(mut self, columns: I) -> Self
   where
      I: IntoIterator<Item = S>,
      S: Into<String>,
   {
      self.columns = columns.into_iter().map(Into::into).collect();
      self
   }

   /// Append `column <operator> value`, ANDed with earlier conditions.
   ///
   /// Every call gets its own placeholder, so filtering the same column
   /// twice is fine. Invalid operators are reported by the terminal method.
   pub fn and_where(
      mut self,
      column: impl Into<String>,
      operator: impl Into<String>,
      value: impl Into<JsonValue>,
   ) -> Self {
      self.conditions.push(Condition {
         column: column.into(),
         operator: operator.into(),
         value: value.into(),
      });
      self
   }

   pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
      self.orders.push((column.into(), direction));
      self
   }

   pub fn limit(mut self, limit: u64) -> Self {
      self.limit = Some(limit);
      self
   }

   pub fn offset(mut self, offset: u64) -> Self {
      self.offset = Some(offset);
      self
   }

   // ─── SQL rendering (pure) ───

   /// Render the SELECT statement and its bind values.
   pub fn to_select_sql(&self) -> Result<(String, Vec<JsonValue>)> {
      let table = self.quoted_table()?;

      let columns = if self.columns.is_empty() {
         "*".to_string()
      } else {
         self
            .columns
            .iter()
            .map(|c| if c == "*" { Ok("*".to_string()) } else { quoted(c) })
            .collect::<Result<Vec<_>>>()?
            .join(", ")
      };

      let (where_sql, values) = self.where_clause(1)?;
      let mut sql = format!("SELECT {} FROM {}{}", columns, table, where_sql);

      if !self.orders.is_empty() {
         let orders = self
            .orders
            .iter()
            .map(|(column, direction)| Ok(format!("{} {}", quoted(column)?, direction.as_sql())))
            .collect::<Result<Vec<_>>>()?;
         sql.push_str(" ORDER BY ");
         sql.push_str(&orders.join(", "));
      }

      match (self.limit, self.offset) {
         (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
         (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
         // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
         (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
         (None, None) => {}
      }

      Ok((sql, values))
   }

   /// Render `SELECT COUNT(*)` with the accumulated conditions.
   pub fn to_count_sql(&self) -> Result<(String, Vec<JsonValue>)> {
      let table = self.quoted_table()?;
      let (where_sql, values) = self.where_clause(1)?;
      Ok((format!("SELECT COUNT(*) FROM {}{}", table, where_sql), values))
   }

   /// Render an INSERT using the map's keys as columns.
   pub fn to_insert_sql<I>(&self, data: I) -> Result<(String, Vec<JsonValue>)>
   where
      I: IntoIterator<Item = (String, JsonValue)>,
   {
      let table = self.quoted_table()?;
      let data: Vec<(String, JsonValue)> = data.into_iter().collect();
      if data.is_empty() {
         return Err(Error::EmptyData { operation: "insert" });
      }

      let mut columns = Vec::with_capacity(data.len());
      let mut placeholders = Vec::with_capacity(data.len());
      let mut values = Vec::with_capacity(data.len());
      for (i, (column, value)) in data.into_iter().enumerate() {
         columns.push(quoted(&column)?);
         placeholders.push(format!("${}", i + 1));
         values.push(value);
      }

      Ok((
         format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
         ),
         values,
      ))
   }

   /// Render an UPDATE. SET values take `$1..$n`, WHERE values continue
   /// from `$n+1`, so the two never collide.
   ///
   /// Without conditions the statement updates every row.
   pub fn to_update_sql<I>(&self, data: I) -> Result<(String, Vec<JsonValue>)>
   where
      I: IntoIterator<Item = (String, JsonValue)>,
   {
      let table = self.quoted_table()?;
      let data: Vec<(String, JsonValue)> = data.into_iter().collect();
      if data.is_empty() {
         return Err(Error::EmptyData { operation: "update" });
      }

      let mut assignments = Vec::with_capacity(data.len());
      let mut values = Vec::with_capacity(data.len() + self.conditions.len());
      for (i, (column, value)) in data.into_iter().enumerate() {
         assignments.push(format!("{} = ${}", quoted(&column)?, i + 1));
         values.push(value);
      }

      let (where_sql, where_values) = self.where_clause(values.len() + 1)?;
      values.extend(where_values);

      Ok((
         format!("UPDATE {} SET {}{}", table, assignments.join(", "), where_sql),
         values,
      ))
   }

   /// Render a DELETE. Without conditions the statement deletes every row.
   pub fn to_delete_sql(&self) -> Result<(String, Vec<JsonValue>)> {
      let table = self.quoted_table()?;
      let (where_sql, values) = self.where_clause(1)?;
      Ok((format!("DELETE FROM {}{}", table, where_sql), values))
   }

   fn quoted_table(&self) -> Result<String> {
      match &self.table {
         Some(table) => quoted(table),
         None => Err(Error::MissingTable),
      }
   }

   /// ` WHERE a = $n AND b = $n+1 ...`, or an empty string without conditions.
   fn where_clause(&self, first_placeholder: usize) -> Result<(String, Vec<JsonValue>)> {
      if self.conditions.is_empty() {
         return Ok((String::new(), Vec::new()));
      }

      let mut parts = Vec::with_capacity(self.conditions.len());
      let mut values = Vec::with_capacity(self.conditions.len());
      for (i, condition) in self.conditions.iter().enumerate() {
         let operator = normalize_operator(&condition.operator)?;
         parts.push(format!(
            "{} {} ${}",
            quoted(&condition.column)?,
            operator,
            first_placeholder + i
         ));
         values.push(condition.value.clone());
      }

      Ok((format!(" WHERE {}", parts.join(" AND ")), values))
   }

   // ─── Terminal methods ───

   /// All matching rows, in engine order unless `order_by` was used.
   pub async fn get(self) -> Result<Vec<IndexMap<String, JsonValue>>> {
      let (sql, values) = self.to_select_sql()?;
      fetch_all(self.db, &sql, values).await
   }

   /// First matching row, or `None`.
   pub async fn first(mut self) -> Result<Option<IndexMap<String, JsonValue>>> {
      self.limit = Some(1);
      Ok(self.get().await?.into_iter().next())
   }

   pub async fn insert<I>(self, data: I) -> Result<WriteQueryResult>
   where
      I: IntoIterator<Item = (String, JsonValue)>,
   {
      let (sql, values) = self.to_insert_sql(data)?;
      execute(self.db, &sql, values).await
   }

   pub async fn update<I>(self, data: I) -> Result<WriteQueryResult>
   where
      I: IntoIterator<Item = (String, JsonValue)>,
   {
      let (sql, values) = self.to_update_sql(data)?;
      execute(self.db, &sql, values).await
   }

   pub async fn delete(self) -> Result<WriteQueryResult> {
      let (sql, values) = self.to_delete_sql()?;
      execute(self.db, &sql, values).await
   }

   pub async fn count(self) -> Result<i64> {
      let (sql, values) = self.to_count_sql()?;
      fetch_scalar_i64(self.db, &sql, values).await
   }
}

/// Validate that an identifier is safe for SQL interpolation.
///
/// Accepts names matching `[a-zA-Z_][a-zA-Z0-9_.]*`, which covers plain column
/// names, qualified names (e.g., `table.column`), and underscored identifiers.
pub(crate) fn validate_column_name(name: &str) -> Result<()> {
   let mut chars = name.chars();
   let valid_first = chars
      .next()
      .is_some_and(|first| first.is_ascii_alphabetic() || first == '_');

   if !valid_first || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.') {
      return Err(Error::InvalidColumnName {
         name: name.to_string(),
      });
   }

   Ok(())
}

/// Validate and double-quote an identifier; `table.column` becomes `"table"."column"`.
fn quoted(name: &str) -> Result<String> {
   validate_column_name(name)?;
   Ok(name
      .split('.')
      .map(|part| format!("\"{}\"", part))
      .collect::<Vec<_>>()
      .join("."))
}

fn normalize_operator(operator: &str) -> Result<String> {
   let normalized = operator
      .split_whitespace()
      .collect::<Vec<_>>()
      .join(" ")
      .to_ascii_uppercase();

   if OPERATORS.contains(&normalized.as_str()) {
      Ok(normalized)
   } else {
      Err(Error::InvalidOperator {
         operator: operator.to_string(),
      })
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;
   use sqlx_sqlite_module_mgr::ModuleConnectionFactory;

   fn pairs(data: JsonValue) -> Vec<(String, JsonValue)> {
      match data {
         JsonValue::Object(map) => map.into_iter().collect(),
         _ => panic!("expected object"),
      }
   }

   #[tokio::test]
   async fn test_select_sql_is_deterministic() {
      let factory = ModuleConnectionFactory::in_memory(None);
      let db = factory.get_connection("test").await.unwrap();

      let builder = QueryBuilder::new(&db)
         .table("users")
         .select(["id", "name"])
         .and_where("age", ">=", 18)
         .and_where("age", "<", 65)
         .order_by("name", SortDirection::Asc)
         .limit(10)
         .offset(20);

      let first = builder.to_select_sql().unwrap();
      let second = builder.to_select_sql().unwrap();

      assert_eq!(first, second);
      assert_eq!(
         first.0,
         r#"SELECT "id", "name" FROM "users" WHERE "age" >= $1 AND "age" < $2 ORDER BY "name" ASC LIMIT 10 OFFSET 20"#
      );
      assert_eq!(first.1, vec![json!(18), json!(65)]);
   }

   #[tokio::test]
   async fn test_offset_without_limit() {
      let factory = ModuleConnectionFactory::in_memory(None);
      let db = factory.get_connection("test").await.unwrap();

      let (sql, _) = QueryBuilder::new(&db).table("t").offset(5).to_select_sql().unwrap();

      assert_eq!(sql, r#"SELECT * FROM "t" LIMIT -1 OFFSET 5"#);
   }

   #[tokio::test]
   async fn test_update_placeholders_do_not_collide() {
      let factory = ModuleConnectionFactory::in_memory(None);
      let db = factory.get_connection("test").await.unwrap();

      let (sql, values) = QueryBuilder::new(&db)
         .table("users")
         .and_where("name", "=", "old")
         .and_where("id", "<=", 3)
         .to_update_sql(pairs(json!({"email": "e@example.com", "name": "new"})))
         .unwrap();

      assert_eq!(
         sql,
         r#"UPDATE "users" SET "email" = $1, "name" = $2 WHERE "name" = $3 AND "id" <= $4"#
      );
      assert_eq!(
         values,
         vec![json!("e@example.com"), json!("new"), json!("old"), json!(3)]
      );
   }

   #[tokio::test]
   async fn test_qualified_and_invalid_identifiers() {
      let factory = ModuleConnectionFactory::in_memory(None);
      let db = factory.get_connection("test").await.unwrap();

      let (sql, _) = QueryBuilder::new(&db)
         .table("users")
         .select(["users.id"])
         .to_select_sql()
         .unwrap();
      assert_eq!(sql, r#"SELECT "users"."id" FROM "users""#);

      for bad in ["", "1abc", "name; DROP TABLE users", "a\"b"] {
         let err = QueryBuilder::new(&db)
            .table("users")
            .and_where(bad, "=", 1)
            .to_select_sql()
            .unwrap_err();
         assert!(matches!(err, Error::InvalidColumnName { .. }), "{bad:?}");
      }
   }

   #[tokio::test]
   async fn test_operator_allow_list() {
      let factory = ModuleConnectionFactory::in_memory(None);
      let db = factory.get_connection("test").await.unwrap();

      let (sql, _) = QueryBuilder::new(&db)
         .table("t")
         .and_where("a", "not  like", "x%")
         .and_where("b", "is not", JsonValue::Null)
         .to_delete_sql()
         .unwrap();
      assert_eq!(sql, r#"DELETE FROM "t" WHERE "a" NOT LIKE $1 AND "b" IS NOT $2"#);

      let err = QueryBuilder::new(&db)
         .table("t")
         .and_where("a", "= 1 OR 1 =", 1)
         .to_delete_sql()
         .unwrap_err();
      assert!(matches!(err, Error::InvalidOperator { .. }));
   }

   #[tokio::test]
   async fn test_missing_table_and_empty_data() {
      let factory = ModuleConnectionFactory::in_memory(None);
      let db = factory.get_connection("test").await.unwrap();

      assert!(matches!(
         QueryBuilder::new(&db).count().await,
         Err(Error::MissingTable)
      ));
      assert!(matches!(
         QueryBuilder::new(&db)
            .table("t")
            .insert(Vec::<(String, JsonValue)>::new())
            .await,
         Err(Error::EmptyData { operation: "insert" })
      ));
   }
}

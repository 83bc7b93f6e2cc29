//! A single module's SQLite database

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::debug;

use crate::config::ModuleFactoryConfig;
use crate::error::{Error, Result};

/// Name of the bookkeeping table created in every module database.
pub const MIGRATIONS_TABLE: &str = "migrations";

/// Idempotent DDL for the bookkeeping table.
pub(crate) const CREATE_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS migrations (
   id INTEGER PRIMARY KEY AUTOINCREMENT,
   migration TEXT NOT NULL UNIQUE,
   executed_at DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Open database belonging to exactly one module.
///
/// ## State Management
///
/// - **`pool`**: connections to the module's file (or its private in-memory database)
/// - **`path`**: database file, `None` when the factory runs in memory
/// - **`closed`**: set by [`ModuleDatabase::close`]; all later access fails
///
/// Instances are created and cached by
/// [`ModuleConnectionFactory`](crate::ModuleConnectionFactory) and handed out
/// as `Arc<ModuleDatabase>`, so identity can be compared with `Arc::ptr_eq`.
#[derive(Debug)]
pub struct ModuleDatabase {
   module: String,
   path: Option<PathBuf>,
   pool: Pool<Sqlite>,
   closed: AtomicBool,
}

impl ModuleDatabase {
   /// Open the pool and make sure the bookkeeping table exists.
   ///
   /// The pool is closed again if initialization fails, so a failed open
   /// leaves nothing behind.
   pub(crate) async fn open(
      module: &str,
      path: Option<&Path>,
      config: &ModuleFactoryConfig,
   ) -> std::result::Result<Self, sqlx::Error> {
      let options = match path {
         Some(path) => SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true),
         // sqlx gives every parsed `:memory:` URL its own shared-cache name,
         // so modules never see each other's data
         None => SqliteConnectOptions::from_str("sqlite::memory:")?,
      }
      .foreign_keys(true)
      .busy_timeout(config.busy_timeout);

      let pool_options = SqlitePoolOptions::new().max_connections(config.max_connections.max(1));
      let pool_options = if path.is_some() {
         pool_options.idle_timeout(config.idle_timeout)
      } else {
         // A single long-lived connection keeps the database alive and avoids
         // shared-cache table locks, which ignore busy_timeout
         pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
      };

      let pool = pool_options.connect_with(options).await?;

      if let Err(e) = sqlx::query(CREATE_MIGRATIONS_TABLE).execute(&pool).await {
         pool.close().await;
         return Err(e);
      }

      debug!(module = %module, path = ?path, "Module database initialized");

      Ok(Self {
         module: module.to_string(),
         path: path.map(Path::to_path_buf),
         pool,
         closed: AtomicBool::new(false),
      })
   }

   /// Normalized module name this database belongs to.
   pub fn module(&self) -> &str {
      &self.module
   }

   /// Database file, or `None` for in-memory databases.
   pub fn path(&self) -> Option<&Path> {
      self.path.as_deref()
   }

   /// Connection pool for this module.
   ///
   /// Returns [`Error::DatabaseClosed`] once the database has been closed.
   pub fn pool(&self) -> Result<&Pool<Sqlite>> {
      if self.is_closed() {
         return Err(Error::DatabaseClosed);
      }
      Ok(&self.pool)
   }

   /// Check out a single connection, e.g. to run a manual transaction on it.
   pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
      Ok(self.pool()?.acquire().await?)
   }

   /// Whether a table with this name exists in the module database.
   pub async fn has_table(&self, table: &str) -> Result<bool> {
      let count: i64 =
         sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1")
            .bind(table)
            .fetch_one(self.pool()?)
            .await?;
      Ok(count > 0)
   }

   pub fn is_closed(&self) -> bool {
      self.closed.load(Ordering::SeqCst)
   }

   /// Close all pooled connections. Closing twice is a no-op.
   pub async fn close(&self) {
      if self.closed.swap(true, Ordering::SeqCst) {
         return;
      }
      self.pool.close().await;
      debug!(module = %self.module, "Module database closed");
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[tokio::test]
   async fn test_open_creates_bookkeeping_table() {
      let db = ModuleDatabase::open("page", None, &ModuleFactoryConfig::default())
         .await
         .unwrap();

      assert!(db.has_table(MIGRATIONS_TABLE).await.unwrap());
      let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
         .fetch_one(db.pool().unwrap())
         .await
         .unwrap();
      assert_eq!(rows, 0);
   }

   #[tokio::test]
   async fn test_bookkeeping_ddl_is_idempotent() {
      let db = ModuleDatabase::open("page", None, &ModuleFactoryConfig::default())
         .await
         .unwrap();

      sqlx::query(CREATE_MIGRATIONS_TABLE)
         .execute(db.pool().unwrap())
         .await
         .expect("second CREATE TABLE IF NOT EXISTS must not fail");
   }

   #[tokio::test]
   async fn test_foreign_keys_enabled() {
      let db = ModuleDatabase::open("page", None, &ModuleFactoryConfig::default())
         .await
         .unwrap();

      let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
         .fetch_one(db.pool().unwrap())
         .await
         .unwrap();
      assert_eq!(enabled, 1);
   }

   #[tokio::test]
   async fn test_closed_database_rejects_access() {
      let db = ModuleDatabase::open("page", None, &ModuleFactoryConfig::default())
         .await
         .unwrap();

      db.close().await;
      db.close().await;

      assert!(db.is_closed());
      assert!(matches!(db.pool(), Err(Error::DatabaseClosed)));
   }
}

//! Running and inspecting per-module migrations

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libsqlite3_sys::{sqlite3, sqlite3_get_autocommit};
use serde::Serialize;
use sqlx::SqliteConnection;
use sqlx_sqlite_module_mgr::{ModuleConnectionFactory, normalize_module_name};
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::discovery::{self, MIGRATION_EXTENSION, MigrationScript};
use crate::error::{Error, Result};
use crate::scaffold;

/// One row of [`ModuleMigrator::migration_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
   pub name: String,
   pub file: PathBuf,
   pub executed: bool,
}

/// Why a single migration did not commit.
enum ApplyFailure {
   Statement(sqlx::Error),
   Rollback {
      transaction_error: String,
      rollback_error: String,
   },
}

/// Runs forward-only SQL migrations stored as `<root>/<module>/<name>.sql`.
///
/// Each script is applied in its own transaction together with its row in the
/// module's `migrations` table, so a script is either fully applied and
/// recorded or not at all.
#[derive(Debug, Clone)]
pub struct ModuleMigrator {
   factory: Arc<ModuleConnectionFactory>,
   root: PathBuf,
}

impl ModuleMigrator {
   pub fn new(factory: Arc<ModuleConnectionFactory>, root: impl Into<PathBuf>) -> Self {
      Self {
         factory,
         root: root.into(),
      }
   }

   pub fn factory(&self) -> &Arc<ModuleConnectionFactory> {
      &self.factory
   }

   /// Directory holding one sub-directory of scripts per module.
   pub fn root(&self) -> &Path {
      &self.root
   }

   /// `<root>/<module>` for a validated module name.
   pub fn module_directory(&self, module: &str) -> Result<PathBuf> {
      Ok(self.root.join(normalize_module_name(module)?))
   }

   /// Scripts for a module in execution order. Empty when the module has no directory.
   pub async fn discover_migrations(&self, module: &str) -> Result<Vec<MigrationScript>> {
      let dir = self.module_directory(module)?;
      Ok(discovery::list_scripts(&dir).await)
   }

   /// Module directories under the root, sorted.
   ///
   /// A module can have migrations before its database file exists, so this
   /// lists the migrations root rather than the factory's database directory.
   pub async fn discover_modules(&self) -> Result<Vec<String>> {
      discovery::list_module_directories(&self.root).await
   }

   /// Apply every pending migration of `module`, in file-name order.
   ///
   /// Returns the names applied by this call. Stops at the first failing
   /// script; migrations committed before it stay applied and are listed in
   /// the error's `applied`.
   pub async fn run_migrations(&self, module: &str) -> Result<Vec<String>> {
      let module = normalize_module_name(module)?;
      let db = self.factory.get_connection(&module).await?;
      let scripts = self.discover_migrations(&module).await?;

      if scripts.is_empty() {
         debug!(module = %module, "No migrations to run");
         return Ok(Vec::new());
      }

      let mut conn = db.acquire().await?;
      let executed = executed_migrations(&mut conn).await?;
      let mut applied = Vec::new();

      for script in scripts {
         if executed.contains(&script.name) {
            continue;
         }

         let sql = match tokio::fs::read_to_string(&script.path).await {
            Ok(sql) => sql,
            Err(source) => {
               return Err(Error::ReadMigration {
                  module,
                  migration: script.name,
                  path: script.path,
                  applied,
                  source,
               });
            }
         };

         debug!(module = %module, migration = %script.name, "Applying migration");

         match apply_migration(&mut conn, &script.name, &sql).await {
            Ok(()) => {
               info!(module = %module, migration = %script.name, "Migration applied");
               applied.push(script.name);
            }
            Err(ApplyFailure::Statement(source)) => {
               warn!(module = %module, migration = %script.name, error = %source, "Migration failed, rolled back");
               return Err(Error::MigrationFailed {
                  module,
                  migration: script.name,
                  applied,
                  source,
               });
            }
            Err(ApplyFailure::Rollback {
               transaction_error,
               rollback_error,
            }) => {
               warn!(module = %module, migration = %script.name, "Migration failed and rollback failed");
               return Err(Error::TransactionRollbackFailed {
                  module,
                  migration: script.name,
                  applied,
                  transaction_error,
                  rollback_error,
               });
            }
         }
      }

      Ok(applied)
   }

   /// Run [`run_migrations`](Self::run_migrations) for every module directory, in sorted order.
   ///
   /// Aborts at the first failing module with [`Error::BatchAborted`]; its
   /// `completed` map holds the results of the modules before it.
   pub async fn run_all_migrations(&self) -> Result<BTreeMap<String, Vec<String>>> {
      let mut completed = BTreeMap::new();

      for module in self.discover_modules().await? {
         match self.run_migrations(&module).await {
            Ok(applied) => {
               completed.insert(module, applied);
            }
            Err(source) => {
               return Err(Error::BatchAborted {
                  module,
                  completed,
                  source: Box::new(source),
               });
            }
         }
      }

      Ok(completed)
   }

   /// Discovered scripts of `module` with their executed flag, in execution order.
   ///
   /// Applies nothing. A persistent module whose database file does not exist
   /// yet is reported as fully pending without creating the file.
   pub async fn migration_status(&self, module: &str) -> Result<Vec<MigrationStatus>> {
      let module = normalize_module_name(module)?;
      let scripts = self.discover_migrations(&module).await?;

      let executed = if self.factory.is_persistent() && !self.factory.module_exists(&module)? {
         HashSet::new()
      } else {
         let db = self.factory.get_connection(&module).await?;
         let mut conn = db.acquire().await?;
         executed_migrations(&mut conn).await?
      };

      Ok(scripts
         .into_iter()
         .map(|script| MigrationStatus {
            executed: executed.contains(&script.name),
            name: script.name,
            file: script.path,
         })
         .collect())
   }

   /// Write an empty, timestamped migration for `module` and return its path.
   ///
   /// Creates the module directory if needed. Never overwrites an existing file.
   pub async fn create_migration(&self, module: &str, name: &str) -> Result<PathBuf> {
      let module = normalize_module_name(module)?;
      scaffold::validate_migration_name(name)?;

      let dir = self.root.join(&module);
      tokio::fs::create_dir_all(&dir).await?;

      let now = OffsetDateTime::now_utc();
      let migration = scaffold::migration_name(name, now)?;
      let path = dir.join(format!("{migration}.{MIGRATION_EXTENSION}"));
      let body = scaffold::render_template(&module, &migration, now)?;

      let mut file = match tokio::fs::OpenOptions::new()
         .write(true)
         .create_new(true)
         .open(&path)
         .await
      {
         Ok(file) => file,
         Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(Error::MigrationExists { path });
         }
         Err(e) => return Err(e.into()),
      };
      file.write_all(body.as_bytes()).await?;
      file.flush().await?;

      info!(module = %module, path = %path.display(), "Created migration");
      Ok(path)
   }
}

async fn executed_migrations(conn: &mut SqliteConnection) -> Result<HashSet<String>> {
   let names: Vec<String> = sqlx::query_scalar("SELECT migration FROM migrations")
      .fetch_all(&mut *conn)
      .await?;
   Ok(names.into_iter().collect())
}

async fn apply_migration(
   conn: &mut SqliteConnection,
   migration: &str,
   sql: &str,
) -> std::result::Result<(), ApplyFailure> {
   sqlx::query("BEGIN IMMEDIATE")
      .execute(&mut *conn)
      .await
      .map_err(ApplyFailure::Statement)?;

   let result = async {
      sqlx::raw_sql(sql).execute(&mut *conn).await?;
      sqlx::query("INSERT INTO migrations (migration) VALUES ($1)")
         .bind(migration)
         .execute(&mut *conn)
         .await?;
      sqlx::query("COMMIT").execute(&mut *conn).await?;
      Ok::<(), sqlx::Error>(())
   }
   .await;

   match result {
      Ok(()) => Ok(()),
      Err(e) => {
         // ON CONFLICT ROLLBACK and similar make SQLite end the transaction itself
         if let Ok(false) = in_transaction(conn).await {
            return Err(ApplyFailure::Statement(e));
         }

         match sqlx::query("ROLLBACK").execute(&mut *conn).await {
            Ok(_) => Err(ApplyFailure::Statement(e)),
            Err(rollback_err) => Err(ApplyFailure::Rollback {
               transaction_error: e.to_string(),
               rollback_error: rollback_err.to_string(),
            }),
         }
      }
   }
}

/// Whether the connection has an open transaction.
async fn in_transaction(conn: &mut SqliteConnection) -> std::result::Result<bool, sqlx::Error> {
   let mut handle = conn.lock_handle().await?;
   let db: *mut sqlite3 = handle.as_raw_handle().as_ptr();

   // SAFETY: the locked handle keeps `db` valid and unshared for this call
   Ok(unsafe { sqlite3_get_autocommit(db) } == 0)
}

//! Error types for sqlx-sqlite-migrator

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while discovering, applying or scaffolding migrations.
///
/// Failures while applying carry `applied`: the migrations that were
/// committed earlier in the same call. Those stay applied.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from the module connection manager (bad module name, open failure, ...).
   #[error(transparent)]
   ConnectionManager(#[from] sqlx_sqlite_module_mgr::Error),

   /// Error from SQLx outside of a migration script, e.g. reading the bookkeeping table.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// I/O error while scaffolding a migration.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),

   /// The migrations root exists but cannot be listed.
   #[error("unable to list migrations directory {}: {source}", path.display())]
   Discovery {
      path: PathBuf,
      #[source]
      source: std::io::Error,
   },

   /// A discovered script could not be read.
   #[error("unable to read migration '{migration}' for module '{module}' ({}): {source}", path.display())]
   ReadMigration {
      module: String,
      migration: String,
      path: PathBuf,
      applied: Vec<String>,
      #[source]
      source: std::io::Error,
   },

   /// A migration script failed; its transaction was rolled back.
   #[error("migration '{migration}' failed for module '{module}': {source}")]
   MigrationFailed {
      module: String,
      migration: String,
      applied: Vec<String>,
      #[source]
      source: sqlx::Error,
   },

   /// A migration script failed and the rollback failed as well.
   #[error(
      "migration '{migration}' failed for module '{module}': {transaction_error}; rollback also failed: {rollback_error}"
   )]
   TransactionRollbackFailed {
      module: String,
      migration: String,
      applied: Vec<String>,
      transaction_error: String,
      rollback_error: String,
   },

   /// `run_all_migrations` stopped at a failing module.
   ///
   /// `completed` holds the results of the modules processed before it.
   #[error("migrations aborted at module '{module}': {source}")]
   BatchAborted {
      module: String,
      completed: BTreeMap<String, Vec<String>>,
      #[source]
      source: Box<Error>,
   },

   /// Migration names must match `[A-Za-z0-9_-]+`.
   #[error("invalid migration name '{0}': expected letters, digits, '_' or '-'")]
   InvalidMigrationName(String),

   /// Scaffolding would overwrite an existing file.
   #[error("migration file already exists: {}", path.display())]
   MigrationExists { path: PathBuf },

   /// Formatting the migration timestamp failed.
   #[error("unable to format migration timestamp: {0}")]
   Timestamp(#[from] time::error::Format),
}

impl Error {
   /// Extract a structured error code from the error type.
   pub fn error_code(&self) -> String {
      match self {
         Error::ConnectionManager(e) => e.error_code(),
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::Io(_) => "IO_ERROR".to_string(),
         Error::Discovery { .. } => "MIGRATION_DISCOVERY_FAILED".to_string(),
         Error::ReadMigration { .. } => "MIGRATION_READ_FAILED".to_string(),
         Error::MigrationFailed { .. } => "MIGRATION_FAILED".to_string(),
         Error::TransactionRollbackFailed { .. } => "TRANSACTION_ROLLBACK_FAILED".to_string(),
         Error::BatchAborted { .. } => "MIGRATION_BATCH_ABORTED".to_string(),
         Error::InvalidMigrationName(_) => "INVALID_MIGRATION_NAME".to_string(),
         Error::MigrationExists { .. } => "MIGRATION_EXISTS".to_string(),
         Error::Timestamp(_) => "TIMESTAMP_ERROR".to_string(),
      }
   }

   /// Migrations committed earlier in the failing call.
   ///
   /// For [`Error::BatchAborted`] this is the partial progress of the module
   /// that failed; see `completed` for the modules before it.
   pub fn applied(&self) -> &[String] {
      match self {
         Error::ReadMigration { applied, .. }
         | Error::MigrationFailed { applied, .. }
         | Error::TransactionRollbackFailed { applied, .. } => applied.as_slice(),
         Error::BatchAborted { source, .. } => source.applied(),
         _ => &[],
      }
   }

   /// Name of the migration that failed, if any.
   pub fn migration(&self) -> Option<&str> {
      match self {
         Error::ReadMigration { migration, .. }
         | Error::MigrationFailed { migration, .. }
         | Error::TransactionRollbackFailed { migration, .. } => Some(migration.as_str()),
         Error::BatchAborted { source, .. } => source.migration(),
         _ => None,
      }
   }
}

//! # sqlx-sqlite-migrator
//!
//! Forward-only SQL migrations for databases opened by `sqlx-sqlite-module-mgr`.
//!
//! Scripts live in one directory per module and are applied in file-name order:
//!
//! ```text
//! migrations/
//!   page/
//!     2025_01_10_120000_create_pages.sql
//!     2025_02_01_090000_add_published.sql
//!   user/
//!     2025_01_10_120500_create_users.sql
//! ```
//!
//! Each script runs in its own transaction together with the row that records
//! it in the module's `migrations` table. Re-running is safe: recorded scripts
//! are skipped.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use sqlx_sqlite_migrator::ModuleMigrator;
//! use sqlx_sqlite_module_mgr::ModuleConnectionFactory;
//!
//! #[tokio::main]
//! async fn main() -> sqlx_sqlite_migrator::Result<()> {
//!     let factory = Arc::new(ModuleConnectionFactory::new(PathBuf::from("storage/database"), None)?);
//!     let migrator = ModuleMigrator::new(factory, "migrations");
//!
//!     let applied = migrator.run_migrations("user").await?;
//!     println!("applied {applied:?}");
//!
//!     for status in migrator.migration_status("page").await? {
//!         println!("{} executed={}", status.name, status.executed);
//!     }
//!     Ok(())
//! }
//! ```

mod discovery;
mod error;
mod runner;
mod scaffold;

pub use discovery::{MIGRATION_EXTENSION, MigrationScript};
pub use error::{Error, Result};
pub use runner::{MigrationStatus, ModuleMigrator};

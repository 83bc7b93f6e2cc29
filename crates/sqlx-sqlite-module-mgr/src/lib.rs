//! # sqlx-sqlite-module-mgr
//!
//! A minimal wrapper around SQLx that gives every application module its own
//! SQLite database file.
//!
//! ## Core Types
//!
//! - **[`ModuleConnectionFactory`]**: Opens, caches and closes one database per module name
//! - **[`ModuleDatabase`]**: A module's connection pool, seeded with the `migrations` table
//! - **[`ModuleStorage`]**: Base directory, or in-memory mode
//! - **[`ModuleFactoryConfig`]**: Connection pool settings
//! - **[`Error`]**: Error type for database operations
//!
//! ## Usage
//!
//! ```no_run
//! use sqlx_sqlite_module_mgr::ModuleConnectionFactory;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> sqlx_sqlite_module_mgr::Result<()> {
//!     let factory = ModuleConnectionFactory::new(PathBuf::from("storage/database"), None)?;
//!
//!     // Opens storage/database/page.sqlite on first use
//!     let page = factory.get_connection("page").await?;
//!     let again = factory.get_connection("page").await?;
//!     assert!(Arc::ptr_eq(&page, &again));
//!
//!     let rows = sqlx::query("SELECT migration FROM migrations")
//!         .fetch_all(page.pool()?)
//!         .await?;
//!
//!     factory.close_connections().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection Policy
//!
//! - Foreign key enforcement is enabled on every connection
//! - The `migrations` bookkeeping table is created idempotently when a module is opened
//! - In-memory modules keep one connection open so their data lives as long as the factory

mod config;
mod database;
mod error;
mod factory;
mod name;

// Re-export public types
pub use config::{MEMORY_SENTINEL, ModuleFactoryConfig, ModuleStorage};
pub use database::{MIGRATIONS_TABLE, ModuleDatabase};
pub use error::{Error, Result};
pub use factory::ModuleConnectionFactory;
pub use name::normalize_module_name;

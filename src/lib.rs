//! # modular-sqlite
//!
//! One SQLite database per application module, with forward-only SQL
//! migrations and typed repositories on top.
//!
//! The building blocks live in their own crates and are re-exported here:
//!
//! - [`sqlx_sqlite_module_mgr`]: [`ModuleConnectionFactory`] opens and caches module databases
//! - [`sqlx_sqlite_migrator`]: [`ModuleMigrator`] applies `migrations/<module>/*.sql`
//! - [`sqlx_sqlite_toolkit`]: [`QueryBuilder`] for single-table queries
//!
//! This crate adds [`Settings`] and the `page`/`user` repositories.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use modular_sqlite::{NewPage, PageRepository, Settings};
//!
//! #[tokio::main]
//! async fn main() -> modular_sqlite::Result<()> {
//!     let settings = Settings::load(None)?;
//!     let factory = Arc::new(settings.connection_factory()?);
//!     settings.migrator(Arc::clone(&factory)).run_all_migrations().await?;
//!
//!     let pages = PageRepository::new(&factory).await?;
//!     let id = pages
//!         .create(NewPage {
//!             title: "About".into(),
//!             slug: "about".into(),
//!             content: "Hello".into(),
//!             published: true,
//!         })
//!         .await?;
//!     assert!(pages.find(id).await?.is_some());
//!
//!     factory.close_connections().await;
//!     Ok(())
//! }
//! ```

mod error;
mod repositories;
mod settings;

pub use error::{Error, Result};
pub use repositories::{
   NewPage, NewUser, Page, PageChanges, PageRepository, User, UserRepository,
};
pub use settings::{ENV_PREFIX, Settings};

pub use sqlx_sqlite_migrator::{self, MigrationStatus, ModuleMigrator};
pub use sqlx_sqlite_module_mgr::{self, ModuleConnectionFactory, ModuleDatabase};
pub use sqlx_sqlite_toolkit::{self, QueryBuilder, SortDirection};

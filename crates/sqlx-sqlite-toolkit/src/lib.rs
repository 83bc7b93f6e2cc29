//! # sqlx-sqlite-toolkit
//!
//! Query helpers for module databases opened by `sqlx-sqlite-module-mgr`.
//!
//! - **[`QueryBuilder`]**: fluent SELECT/INSERT/UPDATE/DELETE/COUNT against one table
//! - **[`execute`] / [`fetch_all`]**: raw parameterized statements
//! - Rows decode to `IndexMap<String, serde_json::Value>`, preserving column order

mod builders;
mod decode;
mod error;
mod query;

pub use builders::{QueryBuilder, SortDirection};
pub use error::{Error, Result};
pub use query::{WriteQueryResult, execute, fetch_all, fetch_scalar_i64};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx_sqlite_module_mgr::{ModuleConnectionFactory, ModuleDatabase};
use sqlx_sqlite_toolkit::{QueryBuilder, SortDirection};

use super::{bool_from_int, from_row, from_rows, now_timestamp, to_columns};
use crate::error::Result;

const TABLE: &str = "pages";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
   pub id: i64,
   pub title: String,
   pub slug: String,
   pub content: String,
   #[serde(deserialize_with = "bool_from_int")]
   pub published: bool,
   pub created_at: String,
   pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPage {
   pub title: String,
   pub slug: String,
   pub content: String,
   pub published: bool,
}

/// Fields to change on an existing page; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageChanges {
   pub title: Option<String>,
   pub slug: Option<String>,
   pub content: Option<String>,
   pub published: Option<bool>,
}

impl PageChanges {
   pub fn is_empty(&self) -> bool {
      self.title.is_none() && self.slug.is_none() && self.content.is_none() && self.published.is_none()
   }
}

/// Pages stored in the `page` module database.
#[derive(Debug, Clone)]
pub struct PageRepository {
   db: Arc<ModuleDatabase>,
}

impl PageRepository {
   pub const MODULE: &'static str = "page";

   /// Repository over the factory's `page` database.
   pub async fn new(factory: &ModuleConnectionFactory) -> Result<Self> {
      Ok(Self {
         db: factory.get_connection(Self::MODULE).await?,
      })
   }

   fn query(&self) -> QueryBuilder<'_> {
      QueryBuilder::new(&self.db).table(TABLE)
   }

   /// Every page, oldest first.
   pub async fn all(&self) -> Result<Vec<Page>> {
      from_rows(self.query().order_by("id", SortDirection::Asc).get().await?)
   }

   /// Published pages, newest first.
   pub async fn published(&self) -> Result<Vec<Page>> {
      let rows = self
         .query()
         .and_where("published", "=", 1)
         .order_by("created_at", SortDirection::Desc)
         .order_by("id", SortDirection::Desc)
         .get()
         .await?;
      from_rows(rows)
   }

   pub async fn find(&self, id: i64) -> Result<Option<Page>> {
      self
         .query()
         .and_where("id", "=", id)
         .first()
         .await?
         .map(from_row)
         .transpose()
   }

   pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Page>> {
      self
         .query()
         .and_where("slug", "=", slug)
         .first()
         .await?
         .map(from_row)
         .transpose()
   }

   /// Insert a page and return its id. Duplicate slugs fail with the engine's constraint error.
   pub async fn create(&self, page: NewPage) -> Result<i64> {
      let result = self.query().insert(to_columns(&page)?).await?;
      Ok(result.last_insert_id)
   }

   /// Apply `changes` and bump `updated_at`. Returns whether a page was changed.
   pub async fn update(&self, id: i64, changes: PageChanges) -> Result<bool> {
      if changes.is_empty() {
         return Ok(false);
      }

      let mut columns = to_columns(&changes)?;
      columns.push(("updated_at".to_string(), json!(now_timestamp()?)));

      let result = self.query().and_where("id", "=", id).update(columns).await?;
      Ok(result.rows_affected > 0)
   }

   pub async fn delete(&self, id: i64) -> Result<bool> {
      let result = self.query().and_where("id", "=", id).delete().await?;
      Ok(result.rows_affected > 0)
   }

   pub async fn count(&self) -> Result<i64> {
      Ok(self.query().count().await?)
   }
}

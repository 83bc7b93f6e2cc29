use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx_sqlite_module_mgr::{ModuleConnectionFactory, ModuleDatabase};
use sqlx_sqlite_toolkit::QueryBuilder;

use super::{from_row, to_columns};
use crate::error::Result;

const TABLE: &str = "users";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
   pub id: i64,
   pub name: String,
   pub email: String,
   #[serde(skip_serializing)]
   pub password_hash: String,
   pub created_at: String,
}

/// A user to insert. The password must already be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
   pub name: String,
   pub email: String,
   pub password_hash: String,
}

/// Users stored in the `user` module database.
#[derive(Debug, Clone)]
pub struct UserRepository {
   db: Arc<ModuleDatabase>,
}

impl UserRepository {
   pub const MODULE: &'static str = "user";

   pub async fn new(factory: &ModuleConnectionFactory) -> Result<Self> {
      Ok(Self {
         db: factory.get_connection(Self::MODULE).await?,
      })
   }

   fn query(&self) -> QueryBuilder<'_> {
      QueryBuilder::new(&self.db).table(TABLE)
   }

   pub async fn find(&self, id: i64) -> Result<Option<User>> {
      self
         .query()
         .and_where("id", "=", id)
         .first()
         .await?
         .map(from_row)
         .transpose()
   }

   pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
      self
         .query()
         .and_where("email", "=", email)
         .first()
         .await?
         .map(from_row)
         .transpose()
   }

   /// Insert a user and return its id. Duplicate emails fail with the engine's constraint error.
   pub async fn create(&self, user: NewUser) -> Result<i64> {
      let result = self.query().insert(to_columns(&user)?).await?;
      Ok(result.last_insert_id)
   }

   pub async fn update_name(&self, id: i64, name: &str) -> Result<bool> {
      let result = self
         .query()
         .and_where("id", "=", id)
         .update(vec![("name".to_string(), json!(name))])
         .await?;
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

//! Repository adapters over module databases
//!
//! Each repository owns one module's database handle and maps its rows to a
//! typed entity. Table layouts come from the scripts under `migrations/<module>/`,
//! so run the migrator before using a repository.

mod page;
mod user;

pub use page::{NewPage, Page, PageChanges, PageRepository};
pub use user::{NewUser, User, UserRepository};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::error::Result;

/// Same layout as SQLite's `CURRENT_TIMESTAMP`.
const SQLITE_TIMESTAMP: &[BorrowedFormatItem<'static>] =
   format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

fn from_row<T: DeserializeOwned>(row: IndexMap<String, JsonValue>) -> Result<T> {
   Ok(serde_json::from_value(JsonValue::Object(row.into_iter().collect()))?)
}

fn from_rows<T: DeserializeOwned>(rows: Vec<IndexMap<String, JsonValue>>) -> Result<Vec<T>> {
   rows.into_iter().map(from_row).collect()
}

/// Column/value pairs of a serializable struct, skipping absent options.
fn to_columns<T: Serialize>(value: &T) -> Result<Vec<(String, JsonValue)>> {
   match serde_json::to_value(value)? {
      JsonValue::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
      _ => Ok(Vec::new()),
   }
}

fn now_timestamp() -> Result<String> {
   Ok(OffsetDateTime::now_utc().format(SQLITE_TIMESTAMP)?)
}

/// SQLite has no boolean storage class; flags come back as 0/1.
fn bool_from_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
   D: Deserializer<'de>,
{
   #[derive(Deserialize)]
   #[serde(untagged)]
   enum Flag {
      Bool(bool),
      Int(i64),
   }

   Ok(match Flag::deserialize(deserializer)? {
      Flag::Bool(flag) => flag,
      Flag::Int(value) => value != 0,
   })
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   #[derive(Debug, Deserialize, PartialEq)]
   struct Flagged {
      #[serde(deserialize_with = "bool_from_int")]
      flag: bool,
   }

   #[test]
   fn test_bool_from_int() {
      let row: IndexMap<String, JsonValue> = [("flag".to_string(), json!(1))].into_iter().collect();
      assert_eq!(from_row::<Flagged>(row).unwrap(), Flagged { flag: true });

      let row: IndexMap<String, JsonValue> = [("flag".to_string(), json!(0))].into_iter().collect();
      assert_eq!(from_row::<Flagged>(row).unwrap(), Flagged { flag: false });
   }

   #[test]
   fn test_to_columns_skips_unset_fields() {
      #[derive(Serialize)]
      struct Changes {
         title: Option<String>,
         slug: Option<String>,
      }

      let columns = to_columns(&Changes {
         title: Some("T".into()),
         slug: None,
      })
      .unwrap();

      assert_eq!(columns, vec![("title".to_string(), json!("T"))]);
   }

   #[test]
   fn test_now_timestamp_layout() {
      let now = now_timestamp().unwrap();
      assert_eq!(now.len(), 19);
      assert_eq!(&now[4..5], "-");
      assert_eq!(&now[10..11], " ");
   }
}

//! SQLite value to JSON conversion

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteRow, SqliteValueRef};
use sqlx::{Column, Row, TypeInfo, Value, ValueRef};

use crate::Error;

/// Convert a single SQLite value to JSON.
///
/// Non-null values report their storage class, so only the five SQLite
/// storage classes need handling. BLOBs become base64 strings.
pub(crate) fn to_json(value: SqliteValueRef<'_>) -> Result<JsonValue, Error> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let owned = ValueRef::to_owned(&value);
   let type_name = owned.type_info().name().to_string();

   let decoded = match type_name.as_str() {
      "INTEGER" | "BOOLEAN" => owned.try_decode_unchecked::<i64>().map(JsonValue::from),
      "REAL" => owned.try_decode_unchecked::<f64>().map(|v| {
         serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
      }),
      "TEXT" | "DATETIME" | "DATE" | "TIME" => {
         owned.try_decode_unchecked::<String>().map(JsonValue::String)
      }
      "BLOB" => owned
         .try_decode_unchecked::<Vec<u8>>()
         .map(|bytes| JsonValue::String(STANDARD.encode(bytes))),
      other => return Err(Error::UnsupportedDatatype(other.to_string())),
   };

   decoded.map_err(|e| Error::Sqlx(sqlx::Error::Decode(Box::new(e))))
}

/// Decode rows into ordered column-name maps.
pub(crate) fn decode_rows(rows: Vec<SqliteRow>) -> Result<Vec<IndexMap<String, JsonValue>>, Error> {
   let mut values = Vec::with_capacity(rows.len());
   for row in rows {
      let mut value = IndexMap::default();
      for (i, column) in row.columns().iter().enumerate() {
         let v = row.try_get_raw(i)?;
         value.insert(column.name().to_string(), to_json(v)?);
      }
      values.push(value);
   }
   Ok(values)
}

//! Migration file naming and templates

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::error::{Error, Result};

/// `YYYY_MM_DD_HHMMSS`; sorts lexicographically in chronological order.
const FILE_TIMESTAMP: &[BorrowedFormatItem<'static>] =
   format_description!("[year]_[month]_[day]_[hour][minute][second]");

const HEADER_TIMESTAMP: &[BorrowedFormatItem<'static>] =
   format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");

pub(crate) fn validate_migration_name(name: &str) -> Result<()> {
   let valid = !name.is_empty()
      && name
         .chars()
         .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');

   if !valid {
      return Err(Error::InvalidMigrationName(name.to_string()));
   }
   Ok(())
}

/// `<timestamp>_<name>`, the migration name used for both file and bookkeeping.
pub(crate) fn migration_name(name: &str, at: OffsetDateTime) -> Result<String> {
   Ok(format!("{}_{}", at.format(FILE_TIMESTAMP)?, name))
}

pub(crate) fn render_template(module: &str, migration: &str, at: OffsetDateTime) -> Result<String> {
   Ok(format!(
      "-- Migration: {migration}\n\
       -- Module: {module}\n\
       -- Created at: {created}\n\
       \n",
      created = at.format(HEADER_TIMESTAMP)?,
   ))
}

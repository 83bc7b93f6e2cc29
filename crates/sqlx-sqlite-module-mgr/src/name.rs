//! Module name normalization

use crate::error::{Error, Result};

/// Trim and lower-case a module name, rejecting anything that is not a
/// plain `[a-z0-9_-]+` identifier.
///
/// Module names become file names and directory names, so separators,
/// dots and other punctuation are never accepted.
pub fn normalize_module_name(name: &str) -> Result<String> {
   let normalized = name.trim().to_ascii_lowercase();

   let valid = !normalized.is_empty()
      && normalized
         .chars()
         .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');

   if !valid {
      return Err(Error::InvalidModuleName(name.to_string()));
   }

   Ok(normalized)
}

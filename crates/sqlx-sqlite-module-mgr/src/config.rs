//! Storage location and connection settings for module databases

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sentinel accepted by [`ModuleStorage::parse`] for ephemeral storage.
pub const MEMORY_SENTINEL: &str = ":memory:";

/// Where module databases live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleStorage {
   /// One `<module>.<extension>` file per module inside this directory
   Directory(PathBuf),

   /// Transient in-memory databases; nothing is ever written to disk
   InMemory,
}

impl ModuleStorage {
   /// Interpret a configured storage string.
   ///
   /// `":memory:"` and `"sqlite::memory:"` select [`ModuleStorage::InMemory`];
   /// anything else is treated as a directory path.
   pub fn parse(value: &str) -> Self {
      let trimmed = value.trim();
      if trimmed == MEMORY_SENTINEL || trimmed == "sqlite::memory:" {
         ModuleStorage::InMemory
      } else {
         ModuleStorage::Directory(PathBuf::from(trimmed))
      }
   }

   /// Base directory, or `None` for in-memory storage.
   pub fn directory(&self) -> Option<&Path> {
      match self {
         ModuleStorage::Directory(path) => Some(path),
         ModuleStorage::InMemory => None,
      }
   }

   pub fn is_in_memory(&self) -> bool {
      matches!(self, ModuleStorage::InMemory)
   }
}

impl From<PathBuf> for ModuleStorage {
   fn from(path: PathBuf) -> Self {
      ModuleStorage::Directory(path)
   }
}

impl From<&Path> for ModuleStorage {
   fn from(path: &Path) -> Self {
      ModuleStorage::Directory(path.to_path_buf())
   }
}

/// Configuration for module database connection pools
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_module_mgr::ModuleFactoryConfig;
/// use std::time::Duration;
///
/// // Use defaults
/// let config = ModuleFactoryConfig::default();
///
/// // Override just one field
/// let config = ModuleFactoryConfig {
///     busy_timeout: Duration::from_secs(1),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ModuleFactoryConfig {
   /// File extension of module database files, without the leading dot
   ///
   /// Default: `sqlite`
   pub extension: String,

   /// Maximum number of pooled connections per file-backed module database
   ///
   /// In-memory databases always use a single connection.
   ///
   /// Default: 4
   pub max_connections: u32,

   /// How long a statement waits on a locked database file before failing
   ///
   /// Default: 5 seconds
   pub busy_timeout: Duration,

   /// Idle timeout for pooled connections of file-backed modules
   ///
   /// In-memory databases ignore this and keep one connection open for the
   /// lifetime of the factory, otherwise their contents would be discarded.
   ///
   /// Default: 30 seconds
   pub idle_timeout: Duration,
}

impl Default for ModuleFactoryConfig {
   fn default() -> Self {
      Self {
         extension: "sqlite".to_string(),
         max_connections: 4,
         busy_timeout: Duration::from_secs(5),
         idle_timeout: Duration::from_secs(30),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_parse_memory_sentinels() {
      assert_eq!(ModuleStorage::parse(":memory:"), ModuleStorage::InMemory);
      assert_eq!(ModuleStorage::parse(" sqlite::memory: "), ModuleStorage::InMemory);
   }

   #[test]
   fn test_parse_directory() {
      let storage = ModuleStorage::parse("storage/database");
      assert_eq!(storage.directory(), Some(Path::new("storage/database")));
      assert!(!storage.is_in_memory());
   }
}

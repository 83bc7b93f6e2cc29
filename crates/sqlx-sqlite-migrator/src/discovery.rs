//! Finding migration scripts and module directories on disk

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sqlx_sqlite_module_mgr::normalize_module_name;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// File extension of migration scripts.
pub const MIGRATION_EXTENSION: &str = "sql";

/// A migration script found under `<root>/<module>/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationScript {
   /// File name without extension; the key recorded in the bookkeeping table
   pub name: String,
   pub path: PathBuf,
}

/// List `*.sql` files in `dir`, sorted by file name.
///
/// A missing or unreadable directory yields an empty list: a module without
/// migrations is not an error.
pub(crate) async fn list_scripts(dir: &Path) -> Vec<MigrationScript> {
   let mut entries = match tokio::fs::read_dir(dir).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => {
         debug!(dir = %dir.display(), "No migrations directory");
         return Vec::new();
      }
      Err(e) => {
         warn!(dir = %dir.display(), error = %e, "Unable to read migrations directory, treating as empty");
         return Vec::new();
      }
   };

   let mut scripts = Vec::new();
   loop {
      let entry = match entries.next_entry().await {
         Ok(Some(entry)) => entry,
         Ok(None) => break,
         Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Stopped listing migrations directory early");
            break;
         }
      };

      let path = entry.path();
      if path.extension().and_then(|ext| ext.to_str()) != Some(MIGRATION_EXTENSION) {
         continue;
      }
      if !tokio::fs::metadata(&path)
         .await
         .map(|meta| meta.is_file())
         .unwrap_or(false)
      {
         continue;
      }
      let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
         warn!(path = %path.display(), "Skipping migration with non UTF-8 name");
         continue;
      };

      scripts.push(MigrationScript {
         name: name.to_string(),
         path,
      });
   }

   // Timestamp-prefixed names make file-name order chronological
   scripts.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
   scripts
}

/// List module sub-directories of the migrations root, sorted.
///
/// A missing root means no modules. A root that exists but cannot be listed
/// is a configuration problem and is reported as [`Error::Discovery`].
pub(crate) async fn list_module_directories(root: &Path) -> Result<Vec<String>> {
   let mut entries = match tokio::fs::read_dir(root).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => {
         debug!(root = %root.display(), "No migrations root");
         return Ok(Vec::new());
      }
      Err(source) => {
         return Err(Error::Discovery {
            path: root.to_path_buf(),
            source,
         });
      }
   };

   let mut modules = Vec::new();
   while let Some(entry) = entries
      .next_entry()
      .await
      .map_err(|source| Error::Discovery {
         path: root.to_path_buf(),
         source,
      })?
   {
      let path = entry.path();
      if !tokio::fs::metadata(&path)
         .await
         .map(|meta| meta.is_dir())
         .unwrap_or(false)
      {
         continue;
      }

      let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
         continue;
      };

      // Only directories that are already normalized can be found again by module name
      match normalize_module_name(name) {
         Ok(normalized) if normalized == name => modules.push(normalized),
         _ => warn!(dir = %path.display(), "Skipping directory that is not a valid module name"),
      }
   }

   modules.sort();
   Ok(modules)
}

#[cfg(test)]
mod tests {
   use super::*;
   use tempfile::TempDir;

   #[tokio::test]
   async fn test_list_scripts_filters_and_sorts() {
      let temp = TempDir::new().unwrap();
      for file in [
         "2025_03_01_000000_third.sql",
         "2025_01_01_000000_first.sql",
         "notes.txt",
         "2025_02_01_000000_second.sql",
      ] {
         std::fs::write(temp.path().join(file), "").unwrap();
      }
      std::fs::create_dir(temp.path().join("2025_00_00_000000_dir.sql")).unwrap();

      let names: Vec<String> = list_scripts(temp.path())
         .await
         .into_iter()
         .map(|s| s.name)
         .collect();

      assert_eq!(
         names,
         vec![
            "2025_01_01_000000_first",
            "2025_02_01_000000_second",
            "2025_03_01_000000_third"
         ]
      );
   }

   #[tokio::test]
   async fn test_list_scripts_missing_directory_is_empty() {
      let temp = TempDir::new().unwrap();
      assert!(list_scripts(&temp.path().join("nope")).await.is_empty());
   }

   #[tokio::test]
   async fn test_list_module_directories() {
      let temp = TempDir::new().unwrap();
      for dir in ["user", "page", "Bad.Name"] {
         std::fs::create_dir(temp.path().join(dir)).unwrap();
      }
      std::fs::write(temp.path().join("README.sql"), "").unwrap();

      assert_eq!(
         list_module_directories(temp.path()).await.unwrap(),
         vec!["page", "user"]
      );
      assert!(
         list_module_directories(&temp.path().join("missing"))
            .await
            .unwrap()
            .is_empty()
      );
   }

   #[tokio::test]
   async fn test_list_module_directories_on_file_is_discovery_error() {
      let temp = TempDir::new().unwrap();
      let file = temp.path().join("root.txt");
      std::fs::write(&file, "").unwrap();

      let err = list_module_directories(&file).await.unwrap_err();
      assert!(matches!(err, Error::Discovery { .. }));
   }
}

//! Error types for sqlx-sqlite-module-mgr

use std::path::PathBuf;

use thiserror::Error;

/// Errors that may occur when working with sqlx-sqlite-module-mgr
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing database files. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// Database has been closed and cannot be used
   #[error("Database has been closed")]
   DatabaseClosed,

   /// Module name is empty or contains characters outside `[a-z0-9_-]`
   #[error("invalid module name '{0}': expected letters, digits, '_' or '-'")]
   InvalidModuleName(String),

   /// The base storage directory could not be created when the factory was built
   #[error("unable to create database directory {}: {source}", path.display())]
   CreateBaseDirectory {
      path: PathBuf,
      #[source]
      source: std::io::Error,
   },

   /// Opening or initializing a module's database failed
   #[error("unable to open database for module '{module}': {source}")]
   Connection {
      module: String,
      #[source]
      source: sqlx::Error,
   },
}

impl Error {
   /// Machine-readable error code.
   pub fn error_code(&self) -> String {
      match self {
         Error::Io(_) => "IO_ERROR".to_string(),
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::DatabaseClosed => "DATABASE_CLOSED".to_string(),
         Error::InvalidModuleName(_) => "INVALID_MODULE_NAME".to_string(),
         Error::CreateBaseDirectory { .. } => "CONFIGURATION_ERROR".to_string(),
         Error::Connection { .. } => "CONNECTION_ERROR".to_string(),
      }
   }
}

/// A type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_connection_error_names_module() {
      let err = Error::Connection {
         module: "contact".into(),
         source: sqlx::Error::PoolTimedOut,
      };
      assert_eq!(err.error_code(), "CONNECTION_ERROR");
      assert!(err.to_string().contains("contact"));
   }

   #[test]
   fn test_create_base_directory_error_names_path() {
      let err = Error::CreateBaseDirectory {
         path: PathBuf::from("/nope/db"),
         source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
      };
      assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
      assert!(err.to_string().contains("/nope/db"));
   }

   #[test]
   fn test_invalid_module_name_code() {
      let err = Error::InvalidModuleName("../etc".into());
      assert_eq!(err.error_code(), "INVALID_MODULE_NAME");
      assert!(err.to_string().contains("../etc"));
   }
}

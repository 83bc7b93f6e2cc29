/// Result type alias for application-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by settings loading and the repository adapters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Opening or managing a module database failed.
   #[error(transparent)]
   ConnectionManager(#[from] sqlx_sqlite_module_mgr::Error),

   /// Discovering, applying or scaffolding migrations failed.
   #[error(transparent)]
   Migration(#[from] sqlx_sqlite_migrator::Error),

   /// A query built by a repository failed.
   #[error(transparent)]
   Toolkit(#[from] sqlx_sqlite_toolkit::Error),

   /// Settings file or environment could not be read.
   #[error("invalid configuration: {0}")]
   Config(#[from] config::ConfigError),

   /// Formatting a stored timestamp failed.
   #[error("unable to format timestamp: {0}")]
   Timestamp(#[from] time::error::Format),

   /// A row did not match the entity it was mapped to.
   #[error("unable to decode row: {0}")]
   Decode(#[from] serde_json::Error),
}

impl Error {
   /// Extract a structured error code from the error type.
   pub fn error_code(&self) -> String {
      match self {
         Error::ConnectionManager(e) => e.error_code(),
         Error::Migration(e) => e.error_code(),
         Error::Toolkit(e) => e.error_code(),
         Error::Config(_) => "CONFIGURATION_ERROR".to_string(),
         Error::Timestamp(_) => "TIMESTAMP_ERROR".to_string(),
         Error::Decode(_) => "DECODE_ERROR".to_string(),
      }
   }
}

/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SQLite toolkit operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx operations, including SQL the engine rejected.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Error from the module connection manager.
   #[error(transparent)]
   ConnectionManager(#[from] sqlx_sqlite_module_mgr::Error),

   /// SQLite type that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// Table or column name contains invalid characters.
   ///
   /// Identifiers must match `[a-zA-Z_][a-zA-Z0-9_.]*` (letters, digits,
   /// underscores, and dots for qualified names like `table.column`).
   #[error("invalid identifier '{name}': must match [a-zA-Z_][a-zA-Z0-9_.]*")]
   InvalidColumnName { name: String },

   /// Comparison operator is not in the supported set.
   #[error("unsupported comparison operator '{operator}'")]
   InvalidOperator { operator: String },

   /// A terminal method ran before `table()` was called.
   #[error("no table selected; call table() before executing the query")]
   MissingTable,

   /// `insert()` or `update()` was given no columns.
   #[error("{operation} requires at least one column")]
   EmptyData { operation: &'static str },
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::ConnectionManager(e) => e.error_code(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::InvalidColumnName { .. } => "INVALID_COLUMN_NAME".to_string(),
         Error::InvalidOperator { .. } => "INVALID_OPERATOR".to_string(),
         Error::MissingTable => "MISSING_TABLE".to_string(),
         Error::EmptyData { .. } => "EMPTY_DATA".to_string(),
      }
   }
}

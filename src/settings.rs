//! Application settings: where module databases and migrations live

use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use sqlx_sqlite_migrator::ModuleMigrator;
use sqlx_sqlite_module_mgr::{ModuleConnectionFactory, ModuleFactoryConfig, ModuleStorage};
use tracing::debug;

use crate::error::Result;

/// Prefix of environment overrides, e.g. `MODULAR_SQLITE_DATABASE_DIR=:memory:`.
pub const ENV_PREFIX: &str = "MODULAR_SQLITE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
   /// Base directory for module database files, or `:memory:`
   pub database_dir: String,

   /// Root holding one sub-directory of migration scripts per module
   pub migrations_dir: PathBuf,

   /// Extension of module database files
   pub extension: String,

   /// Pool size per file-backed module database
   pub max_connections: u32,
}

impl Default for Settings {
   fn default() -> Self {
      let factory = ModuleFactoryConfig::default();
      Self {
         database_dir: "storage/database".to_string(),
         migrations_dir: PathBuf::from("migrations"),
         extension: factory.extension,
         max_connections: factory.max_connections,
      }
   }
}

impl Settings {
   /// Load settings from an optional TOML file, then `MODULAR_SQLITE_*` environment variables.
   ///
   /// A file that was named explicitly must exist. Anything left unset keeps
   /// its default.
   pub fn load(path: Option<&Path>) -> Result<Self> {
      Self::load_with(path, Environment::with_prefix(ENV_PREFIX))
   }

   fn load_with(path: Option<&Path>, environment: Environment) -> Result<Self> {
      let mut builder = Config::builder();

      if let Some(path) = path {
         debug!(path = %path.display(), "Reading settings file");
         builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
      }

      builder = builder.add_source(environment.try_parsing(true));

      Ok(builder.build()?.try_deserialize::<Settings>()?)
   }

   pub fn storage(&self) -> ModuleStorage {
      ModuleStorage::parse(&self.database_dir)
   }

   pub fn factory_config(&self) -> ModuleFactoryConfig {
      ModuleFactoryConfig {
         extension: self.extension.clone(),
         max_connections: self.max_connections,
         ..Default::default()
      }
   }

   /// Build the connection factory these settings describe.
   pub fn connection_factory(&self) -> Result<ModuleConnectionFactory> {
      Ok(ModuleConnectionFactory::new(
         self.storage(),
         Some(self.factory_config()),
      )?)
   }

   pub fn migrator(&self, factory: Arc<ModuleConnectionFactory>) -> ModuleMigrator {
      ModuleMigrator::new(factory, self.migrations_dir.clone())
   }
}

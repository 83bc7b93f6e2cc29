//! Lazily-opened, cached module databases

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{ModuleFactoryConfig, ModuleStorage};
use crate::database::ModuleDatabase;
use crate::error::{Error, Result};
use crate::name::normalize_module_name;

/// Owns one [`ModuleDatabase`] per module name.
///
/// ## Lifecycle
///
/// ```text
/// 1. new()             creates the base directory (fails fast if it cannot)
/// 2. get_connection()  opens <base>/<module>.<ext> on first use, seeds the
///                      `migrations` table and caches the handle
/// 3. get_connection()  returns the cached handle for the same module
/// 4. close_connections() closes and forgets every cached handle
/// ```
///
/// The cache belongs to the factory instance; share the factory (for example
/// behind an `Arc`) to share its connections.
#[derive(Debug)]
pub struct ModuleConnectionFactory {
   storage: ModuleStorage,
   config: ModuleFactoryConfig,
   connections: RwLock<HashMap<String, Arc<ModuleDatabase>>>,
}

impl ModuleConnectionFactory {
   /// Create a factory over the given storage.
   ///
   /// For directory storage the directory (and its parents) is created now;
   /// failure is reported as [`Error::CreateBaseDirectory`].
   pub fn new(
      storage: impl Into<ModuleStorage>,
      custom_config: Option<ModuleFactoryConfig>,
   ) -> Result<Self> {
      let storage = storage.into();

      if let ModuleStorage::Directory(dir) = &storage {
         std::fs::create_dir_all(dir).map_err(|source| Error::CreateBaseDirectory {
            path: dir.clone(),
            source,
         })?;
      }

      info!(storage = ?storage, "Module connection factory ready");

      Ok(Self {
         storage,
         config: custom_config.unwrap_or_default(),
         connections: RwLock::new(HashMap::new()),
      })
   }

   /// Factory whose module databases live only in memory.
   pub fn in_memory(custom_config: Option<ModuleFactoryConfig>) -> Self {
      Self {
         storage: ModuleStorage::InMemory,
         config: custom_config.unwrap_or_default(),
         connections: RwLock::new(HashMap::new()),
      }
   }

   pub fn storage(&self) -> &ModuleStorage {
      &self.storage
   }

   pub fn config(&self) -> &ModuleFactoryConfig {
      &self.config
   }

   /// `false` when running in memory.
   pub fn is_persistent(&self) -> bool {
      !self.storage.is_in_memory()
   }

   /// Physical file for a module, or `None` in memory.
   pub fn database_path(&self, module: &str) -> Result<Option<PathBuf>> {
      let module = normalize_module_name(module)?;
      Ok(self.path_for(&module))
   }

   fn path_for(&self, module: &str) -> Option<PathBuf> {
      self
         .storage
         .directory()
         .map(|dir| dir.join(format!("{}.{}", module, self.config.extension)))
   }

   /// Return the module's database, opening and initializing it on first use.
   ///
   /// Repeated calls return the same `Arc` until [`close_connections`] runs.
   /// A failed open is reported as [`Error::Connection`] and nothing is cached.
   ///
   /// [`close_connections`]: ModuleConnectionFactory::close_connections
   pub async fn get_connection(&self, module: &str) -> Result<Arc<ModuleDatabase>> {
      let module = normalize_module_name(module)?;

      {
         let connections = self.connections.read().await;
         if let Some(db) = connections.get(&module) {
            return Ok(Arc::clone(db));
         }
      }

      let mut connections = self.connections.write().await;

      // Another caller may have opened it while we waited for the write lock
      if let Some(db) = connections.get(&module) {
         return Ok(Arc::clone(db));
      }

      let path = self.path_for(&module);
      debug!(module = %module, path = ?path, "Opening module database");

      let db = ModuleDatabase::open(&module, path.as_deref(), &self.config)
         .await
         .map_err(|source| Error::Connection {
            module: module.clone(),
            source,
         })?;

      let db = Arc::new(db);
      connections.insert(module, Arc::clone(&db));
      Ok(db)
   }

   /// Whether the module's database file exists on disk.
   ///
   /// Independent of what has been opened this run. Always `false` in memory.
   pub fn module_exists(&self, module: &str) -> Result<bool> {
      let module = normalize_module_name(module)?;
      match self.path_for(&module) {
         Some(path) => Ok(path.try_exists()?),
         None => Ok(false),
      }
   }

   /// Create the module's database file and its bookkeeping table.
   ///
   /// No-op if the file already exists or when running in memory.
   pub async fn create_module_database(&self, module: &str) -> Result<()> {
      let module = normalize_module_name(module)?;
      let Some(path) = self.path_for(&module) else {
         return Ok(());
      };

      if path.try_exists()? {
         return Ok(());
      }

      OpenOptions::new().write(true).create(true).truncate(false).open(&path)?;
      info!(module = %module, path = %path.display(), "Created module database");

      self.get_connection(&module).await?;
      Ok(())
   }

   /// Module names with a database file in the base directory, sorted.
   ///
   /// This lists the filesystem, not the cache. Empty in memory.
   pub fn available_modules(&self) -> Result<Vec<String>> {
      let Some(dir) = self.storage.directory() else {
         return Ok(Vec::new());
      };

      let mut modules = Vec::new();
      for entry in std::fs::read_dir(dir)? {
         let path = entry?.path();
         if !path.is_file() {
            continue;
         }
         if path.extension().and_then(|ext| ext.to_str()) != Some(self.config.extension.as_str()) {
            continue;
         }
         if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            modules.push(stem.to_string());
         }
      }

      modules.sort();
      Ok(modules)
   }

   /// Names of modules with a cached connection, sorted.
   pub async fn open_modules(&self) -> Vec<String> {
      let mut modules: Vec<String> = self.connections.read().await.keys().cloned().collect();
      modules.sort();
      modules
   }

   /// Close every cached connection and empty the cache. Files are kept.
   ///
   /// The next [`get_connection`](ModuleConnectionFactory::get_connection)
   /// opens a brand-new handle, even for modules seen before.
   pub async fn close_connections(&self) {
      let drained: Vec<(String, Arc<ModuleDatabase>)> =
         self.connections.write().await.drain().collect();

      debug!("Closing {} module database(s)", drained.len());

      for (_, db) in drained {
         db.close().await;
      }
   }
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use modular_sqlite::sqlx_sqlite_migrator::Error as MigrationError;
use modular_sqlite::{Error, ModuleMigrator, Settings};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
   /// Settings file (TOML); `MODULAR_SQLITE_*` environment variables override it
   #[clap(short, long, global = true, env = "MODULAR_SQLITE_CONFIG")]
   config: Option<PathBuf>,

   /// Print debug information
   #[clap(long, global = true)]
   debug: bool,

   #[clap(subcommand)]
   command: Commands,
}

#[derive(Subcommand)]
enum Commands {
   /// Apply pending migrations for one module, or for every module directory
   Migrate {
      /// Module to migrate; all modules when omitted
      module: Option<String>,
   },

   /// Show which migrations of a module have run
   Status { module: String },

   /// Create an empty, timestamped migration file
   MakeMigration { module: String, name: String },

   /// Create a module's database file and bookkeeping table
   Create { module: String },

   /// List module databases and migration directories
   Modules,
}

#[tokio::main]
async fn main() -> ExitCode {
   let cli = Cli::parse();

   let default_level = if cli.debug { "debug" } else { "info" };
   tracing_subscriber::fmt()
      .with_env_filter(
         EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
      )
      .with_writer(std::io::stderr)
      .init();

   let settings = match Settings::load(cli.config.as_deref()) {
      Ok(settings) => settings,
      Err(e) => {
         eprintln!("error: {e}");
         return ExitCode::FAILURE;
      }
   };
   debug!(?settings, "Loaded settings");

   let factory = match settings.connection_factory() {
      Ok(factory) => Arc::new(factory),
      Err(e) => {
         eprintln!("error: {e}");
         return ExitCode::FAILURE;
      }
   };
   let migrator = settings.migrator(Arc::clone(&factory));

   let result = run(cli.command, &migrator).await;
   factory.close_connections().await;

   match result {
      Ok(()) => ExitCode::SUCCESS,
      Err(e) => {
         report(&e);
         ExitCode::FAILURE
      }
   }
}

async fn run(command: Commands, migrator: &ModuleMigrator) -> Result<(), Error> {
   let factory = migrator.factory();

   match command {
      Commands::Migrate { module: Some(module) } => {
         let applied = migrator.run_migrations(&module).await?;
         print_applied(&module, &applied);
      }
      Commands::Migrate { module: None } => {
         let results = migrator.run_all_migrations().await?;
         if results.is_empty() {
            println!("No module migration directories under {}", migrator.root().display());
         }
         for (module, applied) in &results {
            print_applied(module, applied);
         }
      }
      Commands::Status { module } => {
         let status = migrator.migration_status(&module).await?;
         if status.is_empty() {
            println!("{module}: no migrations");
         }
         for entry in status {
            let mark = if entry.executed { "ran    " } else { "pending" };
            println!("[{mark}] {}", entry.name);
         }
      }
      Commands::MakeMigration { module, name } => {
         let path = migrator.create_migration(&module, &name).await?;
         println!("Created {}", path.display());
      }
      Commands::Create { module } => {
         factory.create_module_database(&module).await?;
         match factory.database_path(&module)? {
            Some(path) => println!("Module database ready at {}", path.display()),
            None => println!("Module '{module}' opened in memory"),
         }
      }
      Commands::Modules => {
         println!("Databases:");
         for module in factory.available_modules()? {
            println!("  {module}");
         }
         println!("Migration directories:");
         for module in migrator.discover_modules().await? {
            println!("  {module}");
         }
      }
   }

   Ok(())
}

fn print_applied(module: &str, applied: &[String]) {
   if applied.is_empty() {
      println!("{module}: nothing to migrate");
      return;
   }
   for migration in applied {
      println!("{module}: applied {migration}");
   }
}

/// Name what failed and what had already been applied before it.
fn report(error: &Error) {
   eprintln!("error [{}]: {error}", error.error_code());

   if let Error::Migration(migration_error) = error {
      if let MigrationError::BatchAborted { completed, .. } = migration_error {
         for (module, applied) in completed {
            for migration in applied {
               eprintln!("  already applied in {module}: {migration}");
            }
         }
      }
      for migration in migration_error.applied() {
         eprintln!("  applied before the failure: {migration}");
      }
   }
}

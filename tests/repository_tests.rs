use std::path::PathBuf;
use std::sync::Arc;

use modular_sqlite::{
   ModuleConnectionFactory, NewPage, NewUser, PageChanges, PageRepository, Settings,
   UserRepository,
};
use tempfile::TempDir;

fn bundled_migrations() -> PathBuf {
   PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

async fn migrated_factory() -> (Arc<ModuleConnectionFactory>, TempDir) {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let settings = Settings {
      database_dir: temp_dir.path().join("database").to_string_lossy().into_owned(),
      migrations_dir: bundled_migrations(),
      ..Default::default()
   };

   let factory = Arc::new(settings.connection_factory().expect("Failed to create factory"));
   settings
      .migrator(Arc::clone(&factory))
      .run_all_migrations()
      .await
      .expect("Bundled migrations should apply");

   (factory, temp_dir)
}

fn new_page(slug: &str, published: bool) -> NewPage {
   NewPage {
      title: format!("Title {slug}"),
      slug: slug.to_string(),
      content: format!("Body of {slug}"),
      published,
   }
}

fn new_user(name: &str, email: &str) -> NewUser {
   NewUser {
      name: name.to_string(),
      email: email.to_string(),
      password_hash: "$argon2id$placeholder".to_string(),
   }
}

// ─── Bundled migrations ───

#[tokio::test]
async fn bundled_migrations_apply_once() {
   let temp_dir = TempDir::new().unwrap();
   let factory = Arc::new(ModuleConnectionFactory::new(temp_dir.path().to_path_buf(), None).unwrap());
   let migrator = modular_sqlite::ModuleMigrator::new(Arc::clone(&factory), bundled_migrations());

   let first = migrator.run_all_migrations().await.unwrap();
   assert_eq!(first["page"].len(), 2);
   assert_eq!(first["user"].len(), 1);

   let second = migrator.run_all_migrations().await.unwrap();
   assert!(second.values().all(Vec::is_empty));
   assert_eq!(factory.available_modules().unwrap(), vec!["page", "user"]);
}

// ─── Pages ───

#[tokio::test]
async fn page_create_and_find() {
   let (factory, _temp) = migrated_factory().await;
   let pages = PageRepository::new(&factory).await.unwrap();

   let id = pages.create(new_page("about", true)).await.unwrap();

   let page = pages.find(id).await.unwrap().expect("page should exist");
   assert_eq!(page.slug, "about");
   assert_eq!(page.title, "Title about");
   assert!(page.published);
   assert!(!page.created_at.is_empty());

   let by_slug = pages.find_by_slug("about").await.unwrap().unwrap();
   assert_eq!(by_slug, page);
   assert!(pages.find_by_slug("missing").await.unwrap().is_none());
   assert!(pages.find(id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn page_listing_and_published_filter() {
   let (factory, _temp) = migrated_factory().await;
   let pages = PageRepository::new(&factory).await.unwrap();

   pages.create(new_page("one", true)).await.unwrap();
   pages.create(new_page("draft", false)).await.unwrap();
   pages.create(new_page("two", true)).await.unwrap();

   let all: Vec<String> = pages.all().await.unwrap().into_iter().map(|p| p.slug).collect();
   assert_eq!(all, vec!["one", "draft", "two"]);

   // Ties on created_at fall back to the newest id
   let published: Vec<String> = pages
      .published()
      .await
      .unwrap()
      .into_iter()
      .map(|p| p.slug)
      .collect();
   assert_eq!(published, vec!["two", "one"]);
   assert_eq!(pages.count().await.unwrap(), 3);
}

#[tokio::test]
async fn page_update_changes_only_given_fields() {
   let (factory, _temp) = migrated_factory().await;
   let pages = PageRepository::new(&factory).await.unwrap();
   let id = pages.create(new_page("draft", false)).await.unwrap();

   let changed = pages
      .update(
         id,
         PageChanges {
            title: Some("Launched".into()),
            published: Some(true),
            ..Default::default()
         },
      )
      .await
      .unwrap();
   assert!(changed);

   let page = pages.find(id).await.unwrap().unwrap();
   assert_eq!(page.title, "Launched");
   assert!(page.published);
   assert_eq!(page.slug, "draft");
   assert_eq!(page.content, "Body of draft");

   assert!(!pages.update(id, PageChanges::default()).await.unwrap());
   assert!(
      !pages
         .update(id + 1, PageChanges { title: Some("x".into()), ..Default::default() })
         .await
         .unwrap()
   );
}

#[tokio::test]
async fn page_duplicate_slug_is_rejected() {
   let (factory, _temp) = migrated_factory().await;
   let pages = PageRepository::new(&factory).await.unwrap();
   pages.create(new_page("home", true)).await.unwrap();

   let err = pages.create(new_page("home", false)).await.unwrap_err();

   assert!(err.error_code().starts_with("SQLITE_"));
   assert_eq!(pages.count().await.unwrap(), 1);
}

#[tokio::test]
async fn page_delete() {
   let (factory, _temp) = migrated_factory().await;
   let pages = PageRepository::new(&factory).await.unwrap();
   let id = pages.create(new_page("gone", true)).await.unwrap();

   assert!(pages.delete(id).await.unwrap());
   assert!(!pages.delete(id).await.unwrap());
   assert_eq!(pages.count().await.unwrap(), 0);
}

// ─── Users ───

#[tokio::test]
async fn user_lifecycle() {
   let (factory, _temp) = migrated_factory().await;
   let users = UserRepository::new(&factory).await.unwrap();

   let id = users.create(new_user("Ada", "ada@example.com")).await.unwrap();

   let user = users.find_by_email("ada@example.com").await.unwrap().unwrap();
   assert_eq!(user.id, id);
   assert_eq!(user.name, "Ada");
   assert_eq!(user.password_hash, "$argon2id$placeholder");

   assert!(users.update_name(id, "Ada Lovelace").await.unwrap());
   assert_eq!(users.find(id).await.unwrap().unwrap().name, "Ada Lovelace");

   assert_eq!(users.count().await.unwrap(), 1);
   assert!(users.delete(id).await.unwrap());
   assert!(users.find(id).await.unwrap().is_none());
}

#[tokio::test]
async fn user_serialization_hides_password_hash() {
   let (factory, _temp) = migrated_factory().await;
   let users = UserRepository::new(&factory).await.unwrap();
   let id = users.create(new_user("Bo", "bo@example.com")).await.unwrap();

   let user = users.find(id).await.unwrap().unwrap();
   let json = serde_json::to_value(&user).unwrap();

   assert!(json.get("password_hash").is_none());
   assert_eq!(json["email"], "bo@example.com");
}

#[tokio::test]
async fn modules_are_isolated() {
   let (factory, _temp) = migrated_factory().await;
   let pages = PageRepository::new(&factory).await.unwrap();
   let users = UserRepository::new(&factory).await.unwrap();
   users.create(new_user("Cy", "cy@example.com")).await.unwrap();

   let page_db = factory.get_connection("page").await.unwrap();
   assert!(!page_db.has_table("users").await.unwrap());
   assert_eq!(pages.count().await.unwrap(), 0);
}

// ─── Ephemeral storage ───

#[tokio::test]
async fn repositories_work_in_memory() {
   let settings = Settings {
      database_dir: ":memory:".to_string(),
      migrations_dir: bundled_migrations(),
      ..Default::default()
   };
   let factory = Arc::new(settings.connection_factory().unwrap());
   settings
      .migrator(Arc::clone(&factory))
      .run_all_migrations()
      .await
      .unwrap();

   let pages = PageRepository::new(&factory).await.unwrap();
   pages.create(new_page("mem", true)).await.unwrap();

   assert_eq!(pages.count().await.unwrap(), 1);
   assert!(!factory.module_exists("page").unwrap());
   assert!(factory.available_modules().unwrap().is_empty());
}

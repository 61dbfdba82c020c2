//! Integration tests for `SqliteStore` against an in-memory database.

use educollab_core::{
  ContentStore, Error as CoreError, IdentityConfig, IdentityStore, Storage,
  content::{Category, NewGroup, NewPost},
  identity::{NewIdentity, RoleProfile},
  storage::KeyValueStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Raw key-value behaviour ─────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_key_returns_none() {
  let s = store().await;
  assert!(s.get("nothing").await.unwrap().is_none());
}

#[tokio::test]
async fn set_then_get() {
  let s = store().await;
  s.set("k", "[1,2,3]".into()).await.unwrap();
  assert_eq!(s.get("k").await.unwrap().as_deref(), Some("[1,2,3]"));
}

#[tokio::test]
async fn set_overwrites_previous_value() {
  let s = store().await;
  s.set("k", "old".into()).await.unwrap();
  s.set("k", "new".into()).await.unwrap();

  assert_eq!(s.get("k").await.unwrap().as_deref(), Some("new"));
  assert_eq!(s.keys().await.unwrap(), vec!["k".to_string()]);
}

#[tokio::test]
async fn remove_deletes_and_tolerates_absent_keys() {
  let s = store().await;
  s.set("k", "v".into()).await.unwrap();

  s.remove("k").await.unwrap();
  s.remove("k").await.unwrap();

  assert!(s.get("k").await.unwrap().is_none());
  assert!(s.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn clones_share_the_database() {
  let a = store().await;
  let b = a.clone();
  a.set("shared", "yes".into()).await.unwrap();
  assert_eq!(b.get("shared").await.unwrap().as_deref(), Some("yes"));
}

// ─── Stores over SQLite ──────────────────────────────────────────────────────

#[tokio::test]
async fn stores_use_namespaced_keys() {
  let s = store().await;
  let storage = Storage::new(s.clone());

  let mut ids = IdentityStore::restore(storage.clone(), IdentityConfig::default())
    .await
    .unwrap();
  ids
    .register(NewIdentity::new("Ada", "a@x.edu", "p", RoleProfile::Organization))
    .await
    .unwrap();

  let mut content = ContentStore::load(storage).await.unwrap();
  let author = ids.current().unwrap().clone();
  content
    .add_post(NewPost::new(&author, "hello", "world", Category::General))
    .await
    .unwrap();

  assert_eq!(s.keys().await.unwrap(), vec![
    "educollab_current-identity".to_string(),
    "educollab_identity-registry".to_string(),
    "educollab_posts".to_string(),
  ]);
}

#[tokio::test]
async fn session_and_content_survive_restart() {
  let s = store().await;
  let storage = Storage::new(s.clone());

  let mut ids = IdentityStore::restore(storage.clone(), IdentityConfig::default())
    .await
    .unwrap();
  ids.authenticate("b@x.edu", "p", None).await.unwrap();
  let me = ids.current().unwrap().clone();

  let mut content = ContentStore::load(storage.clone()).await.unwrap();
  let post = content
    .add_post(NewPost::new(&me, "persisted", "body", Category::Idea))
    .await
    .unwrap();
  content.add_comment(post.id, (&me).into(), "first!").await.unwrap();
  content
    .add_group(NewGroup {
      name:           "Algorithms".into(),
      description:    "weekly problem sets".into(),
      members:        vec![me.id],
      created_by:     me.id,
      avatar:         None,
      is_study_group: true,
    })
    .await
    .unwrap();

  // A fresh pair of stores over the same database stands in for a restart.
  let restored_ids = IdentityStore::restore(storage.clone(), IdentityConfig::default())
    .await
    .unwrap();
  assert_eq!(restored_ids.current(), Some(&me));

  let restored = ContentStore::load(storage).await.unwrap();
  assert_eq!(restored.posts(), content.posts());
  assert_eq!(restored.groups(), content.groups());
  assert_eq!(restored.user_groups(me.id).len(), 1);
  assert!(restored.user_groups(Uuid::new_v4()).is_empty());
}

#[tokio::test]
async fn malformed_collection_fails_to_load() {
  let s = store().await;
  s.set("educollab_posts", "[{\"id\":".into()).await.unwrap();

  let Err(err) = ContentStore::load(Storage::new(s)).await else {
    panic!("malformed posts must not load");
  };
  assert!(matches!(err, CoreError::Corrupt { ref key, .. } if key == "educollab_posts"));
}

//! The durable key-value seam and the JSON layer on top of it.
//!
//! Backends (e.g. `educollab-store-sqlite`, or [`MemoryStore`] for tests)
//! implement [`KeyValueStore`]; they only ever see opaque strings. The stores
//! talk to [`Storage`], which owns the namespace prefix and the JSON encoding.

use std::{
  collections::BTreeMap,
  convert::Infallible,
  fmt,
  future::Future,
  sync::{Arc, Mutex, PoisonError},
};

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

/// Prefix applied to every key unless the caller picks another one.
pub const DEFAULT_NAMESPACE: &str = "educollab";

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Every value the application persists lives under one of these keys.
/// Each key is read and written independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
  /// The session identity, secret stripped.
  CurrentIdentity,
  /// All known identities, each with its secret.
  IdentityRegistry,
  Posts,
  Events,
  Groups,
  Messages,
}

impl StorageKey {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::CurrentIdentity => "current-identity",
      Self::IdentityRegistry => "identity-registry",
      Self::Posts => "posts",
      Self::Events => "events",
      Self::Groups => "groups",
      Self::Messages => "messages",
    }
  }
}

impl fmt::Display for StorageKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a durable string-to-string map.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the value stored under `key`. Returns `None` if absent.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Store `value` under `key`, replacing any previous value.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove `key`. Removing an absent key is not an error.
  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── JSON layer ──────────────────────────────────────────────────────────────

/// A namespaced, JSON-encoding view over a [`KeyValueStore`].
///
/// Cloning is as cheap as cloning the backend.
#[derive(Debug, Clone)]
pub struct Storage<S> {
  backend:   S,
  namespace: String,
}

impl<S: KeyValueStore> Storage<S> {
  pub fn new(backend: S) -> Self {
    Self::with_namespace(backend, DEFAULT_NAMESPACE)
  }

  pub fn with_namespace(backend: S, namespace: impl Into<String>) -> Self {
    Self { backend, namespace: namespace.into() }
  }

  pub fn backend(&self) -> &S { &self.backend }

  /// The backend key a [`StorageKey`] is stored under.
  pub fn qualify(&self, key: StorageKey) -> String {
    format!("{}_{}", self.namespace, key.as_str())
  }

  /// Decode the value under `key`. A missing key is `Ok(None)`; a value that
  /// fails to decode is [`Error::Corrupt`].
  pub async fn load<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Option<T>> {
    let full = self.qualify(key);
    let raw = self.backend.get(&full).await.map_err(storage_error)?;

    match raw {
      None => Ok(None),
      Some(text) => serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| Error::Corrupt { key: full, source }),
    }
  }

  /// Like [`Storage::load`], with an absent key read as `T::default()`.
  pub async fn load_or_default<T: DeserializeOwned + Default>(
    &self,
    key: StorageKey,
  ) -> Result<T> {
    Ok(self.load(key).await?.unwrap_or_default())
  }

  /// Encode `value` and write it under `key`.
  pub async fn save<T: Serialize + ?Sized>(&self, key: StorageKey, value: &T) -> Result<()> {
    let full = self.qualify(key);
    let text = serde_json::to_string(value)?;
    self.backend.set(&full, text).await.map_err(storage_error)
  }

  pub async fn clear(&self, key: StorageKey) -> Result<()> {
    let full = self.qualify(key);
    self.backend.remove(&full).await.map_err(storage_error)
  }
}

fn storage_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::Storage(Box::new(e))
}

// ─── In-memory backend ───────────────────────────────────────────────────────

/// A [`KeyValueStore`] that lives only as long as the process.
///
/// Clones share the same map, so building a second store over a clone
/// behaves like restarting the application against the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Raw backend contents, keyed by fully-qualified key.
  pub fn snapshot(&self) -> BTreeMap<String, String> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

impl KeyValueStore for MemoryStore {
  type Error = Infallible;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a {
    async move {
      let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
      Ok(entries.get(key).cloned())
    }
  }

  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a {
    async move {
      let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
      entries.insert(key.to_owned(), value);
      Ok(())
    }
  }

  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a {
    async move {
      let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
      entries.remove(key);
      Ok(())
    }
  }
}

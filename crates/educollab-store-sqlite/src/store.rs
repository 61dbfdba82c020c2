//! [`SqliteStore`] — the SQLite implementation of [`KeyValueStore`].

use std::{future::Future, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use educollab_core::storage::KeyValueStore;

use crate::{Error, Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// EduCollab durable storage backed by a single SQLite file.
///
/// Cloning is cheap. The inner connection is reference-counted, and clones
/// see the same data.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every stored key, sorted.
  pub async fn keys(&self) -> Result<Vec<String>> {
    let keys = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT key FROM entries ORDER BY key")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(keys)
  }
}

// ─── KeyValueStore impl ──────────────────────────────────────────────────────

impl KeyValueStore for SqliteStore {
  type Error = Error;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>>> + Send + 'a {
    let key = key.to_owned();
    async move {
      let value: Option<String> = self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT value FROM entries WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
              )
              .optional()?,
          )
        })
        .await?;
      Ok(value)
    }
  }

  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<()>> + Send + 'a {
    let key    = key.to_owned();
    let at_str = Utc::now().to_rfc3339();
    async move {
      self
        .conn
        .call(move |conn| {
          conn.execute(
            "INSERT INTO entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (key) DO UPDATE
               SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, at_str],
          )?;
          Ok(())
        })
        .await?;
      Ok(())
    }
  }

  fn remove<'a>(&'a self, key: &'a str) -> impl Future<Output = Result<()>> + Send + 'a {
    let key = key.to_owned();
    async move {
      self
        .conn
        .call(move |conn| {
          conn.execute("DELETE FROM entries WHERE key = ?1", rusqlite::params![key])?;
          Ok(())
        })
        .await?;
      Ok(())
    }
  }
}

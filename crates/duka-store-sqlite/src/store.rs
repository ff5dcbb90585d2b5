//! [`SqliteStore`], the SQLite implementation of [`KeyValueStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use serde_json::Value;

use duka_core::store::KeyValueStore;

use crate::{
  encode::{decode_in_call, decode_value, encode_dt, encode_value},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Duka key-value store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
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
}

const UPSERT: &str = "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
  ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

// ─── KeyValueStore impl ──────────────────────────────────────────────────────

impl KeyValueStore for SqliteStore {
  type Error = Error;

  async fn get<'a>(&'a self, key: &'a str) -> Result<Option<Value>> {
    let key = key.to_owned();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT value FROM kv WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(raw.as_deref().map(decode_value).transpose()?)
  }

  async fn set<'a>(&'a self, key: &'a str, value: Value) -> Result<()> {
    let key = key.to_owned();
    let value_str = encode_value(&value);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(UPSERT, rusqlite::params![key, value_str, at_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete<'a>(&'a self, key: &'a str) -> Result<bool> {
    let key = key.to_owned();

    let removed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?))
      .await?;
    Ok(removed > 0)
  }

  async fn get_by_prefix<'a>(&'a self, prefix: &'a str) -> Result<Vec<Value>> {
    let prefix = prefix.to_owned();

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT value FROM kv
           WHERE key >= ?1 AND substr(key, 1, length(?1)) = ?1
           ORDER BY key",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![prefix], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .iter()
      .map(|raw| decode_value(raw).map_err(Error::from))
      .collect()
  }

  async fn mget<'a>(&'a self, keys: &'a [String]) -> Result<Vec<Option<Value>>> {
    let keys = keys.to_vec();

    let raws: Vec<Option<String>> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
        let mut out = Vec::with_capacity(keys.len());
        for key in &keys {
          out.push(
            stmt
              .query_row(rusqlite::params![key], |row| row.get(0))
              .optional()?,
          );
        }
        Ok(out)
      })
      .await?;

    raws
      .iter()
      .map(|raw| raw.as_deref().map(decode_value).transpose().map_err(Error::from))
      .collect()
  }

  async fn update<'a, F>(&'a self, key: &'a str, apply: F) -> Result<Value>
  where
    F: FnOnce(Option<Value>) -> serde_json::Result<Value> + Send + 'static,
  {
    let key = key.to_owned();
    let at_str = encode_dt(Utc::now());

    // Read, apply and write under one immediate transaction so concurrent
    // updaters of the same key serialise on the write lock.
    let next = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<String> = tx
          .query_row(
            "SELECT value FROM kv WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
          )
          .optional()?;
        let current = current.as_deref().map(decode_in_call).transpose()?;
        let next =
          apply(current).map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        tx.execute(UPSERT, rusqlite::params![key, encode_value(&next), at_str])?;
        tx.commit()?;
        Ok(next)
      })
      .await?;
    Ok(next)
  }
}

//! The `KeyValueStore` trait.
//!
//! Every piece of persisted state (resources, events, daily rollups, users,
//! sessions) lives behind this abstraction as a JSON value addressed by a
//! string key. Keys are namespaced by a `type:` prefix so that a prefix scan
//! enumerates one collection.
//!
//! Backends (e.g. `duka-store-sqlite`) implement the trait; the services in
//! this crate and the HTTP layer depend only on it.

use std::future::Future;

use serde_json::Value;

/// Abstraction over a durable string → JSON mapping.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + From<serde_json::Error> + Send + Sync + 'static;

  /// Point lookup. Returns `None` if the key is absent.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send + 'a;

  /// Insert or overwrite the value at `key`.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove `key`. Returns whether a value was present.
  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// All values whose key starts with `prefix`, in ascending key order.
  fn get_by_prefix<'a>(
    &'a self,
    prefix: &'a str,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send + 'a;

  /// Batch lookup. The result has one slot per requested key, in order.
  fn mget<'a>(
    &'a self,
    keys: &'a [String],
  ) -> impl Future<Output = Result<Vec<Option<Value>>, Self::Error>> + Send + 'a;

  /// Atomically replace the value at `key` with `apply(current)` and return
  /// the new value.
  ///
  /// Implementations must guarantee that no other write to `key` interleaves
  /// between the read and the write. Counter rollups rely on this.
  fn update<'a, F>(
    &'a self,
    key: &'a str,
    apply: F,
  ) -> impl Future<Output = Result<Value, Self::Error>> + Send + 'a
  where
    F: FnOnce(Option<Value>) -> serde_json::Result<Value> + Send + 'static;
}

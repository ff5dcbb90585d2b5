//! In-process test doubles for the store and identity provider traits.

use std::{
  collections::{BTreeMap, HashMap},
  sync::Mutex,
};

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  identity::{Identity, IdentityProvider, NewUser, Role, Session, SignupOutcome},
  store::KeyValueStore,
};

#[derive(Debug, Error)]
pub enum TestStoreError {
  #[error("store unavailable")]
  Unavailable,
  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

// ─── MemoryStore ─────────────────────────────────────────────────────────────

/// Ordered in-memory map. `update` holds the lock across read and write.
#[derive(Default)]
pub struct MemoryStore {
  map: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
  fn with_map<T>(&self, f: impl FnOnce(&mut BTreeMap<String, Value>) -> T) -> T {
    let mut guard = self.map.lock().unwrap();
    f(&mut guard)
  }
}

impl KeyValueStore for MemoryStore {
  type Error = TestStoreError;

  async fn get<'a>(&'a self, key: &'a str) -> Result<Option<Value>, Self::Error> {
    Ok(self.with_map(|m| m.get(key).cloned()))
  }

  async fn set<'a>(&'a self, key: &'a str, value: Value) -> Result<(), Self::Error> {
    self.with_map(|m| m.insert(key.to_owned(), value));
    Ok(())
  }

  async fn delete<'a>(&'a self, key: &'a str) -> Result<bool, Self::Error> {
    Ok(self.with_map(|m| m.remove(key).is_some()))
  }

  async fn get_by_prefix<'a>(&'a self, prefix: &'a str) -> Result<Vec<Value>, Self::Error> {
    Ok(self.with_map(|m| {
      m.range(prefix.to_owned()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(_, v)| v.clone())
        .collect()
    }))
  }

  async fn mget<'a>(&'a self, keys: &'a [String]) -> Result<Vec<Option<Value>>, Self::Error> {
    Ok(self.with_map(|m| keys.iter().map(|k| m.get(k).cloned()).collect()))
  }

  async fn update<'a, F>(&'a self, key: &'a str, apply: F) -> Result<Value, Self::Error>
  where
    F: FnOnce(Option<Value>) -> serde_json::Result<Value> + Send + 'static,
  {
    self.with_map(|m| {
      let next = apply(m.get(key).cloned())?;
      m.insert(key.to_owned(), next.clone());
      Ok(next)
    })
  }
}

// ─── FailingStore ────────────────────────────────────────────────────────────

/// Every operation fails.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
  type Error = TestStoreError;

  async fn get<'a>(&'a self, _: &'a str) -> Result<Option<Value>, Self::Error> {
    Err(TestStoreError::Unavailable)
  }

  async fn set<'a>(&'a self, _: &'a str, _: Value) -> Result<(), Self::Error> {
    Err(TestStoreError::Unavailable)
  }

  async fn delete<'a>(&'a self, _: &'a str) -> Result<bool, Self::Error> {
    Err(TestStoreError::Unavailable)
  }

  async fn get_by_prefix<'a>(&'a self, _: &'a str) -> Result<Vec<Value>, Self::Error> {
    Err(TestStoreError::Unavailable)
  }

  async fn mget<'a>(&'a self, _: &'a [String]) -> Result<Vec<Option<Value>>, Self::Error> {
    Err(TestStoreError::Unavailable)
  }

  async fn update<'a, F>(&'a self, _: &'a str, _: F) -> Result<Value, Self::Error>
  where
    F: FnOnce(Option<Value>) -> serde_json::Result<Value> + Send + 'static,
  {
    Err(TestStoreError::Unavailable)
  }
}

// ─── StaticProvider ──────────────────────────────────────────────────────────

/// Fixed token → identity table.
#[derive(Default)]
pub struct StaticProvider {
  tokens:  HashMap<String, Identity>,
  failing: bool,
}

impl StaticProvider {
  pub fn with_token(mut self, token: &str, identity: Identity) -> Self {
    self.tokens.insert(token.to_owned(), identity);
    self
  }

  pub fn failing(mut self) -> Self {
    self.failing = true;
    self
  }
}

pub fn identity(email: &str, role: Role) -> Identity {
  Identity {
    id: Uuid::new_v4(),
    email: email.to_owned(),
    name: "Test".to_owned(),
    role,
  }
}

impl IdentityProvider for StaticProvider {
  type Error = TestStoreError;

  async fn resolve_token<'a>(&'a self, token: &'a str) -> Result<Option<Identity>, Self::Error> {
    if self.failing {
      return Err(TestStoreError::Unavailable);
    }
    Ok(self.tokens.get(token).cloned())
  }

  async fn create_user(&self, _: NewUser) -> Result<SignupOutcome, Self::Error> {
    unimplemented!()
  }

  async fn issue_session<'a>(&'a self, _: &'a str, _: &'a str) -> Result<Option<Session>, Self::Error> {
    unimplemented!()
  }

  async fn set_role<'a>(&'a self, _: &'a str, _: Role) -> Result<bool, Self::Error> {
    unimplemented!()
  }
}

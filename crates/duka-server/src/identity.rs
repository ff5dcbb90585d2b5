//! [`KvIdentityProvider`]: users and sessions kept in the same key-value
//! store as everything else.
//!
//! Users live at `users:{email}` with an argon2 PHC password hash. A session
//! is stored at `sessions:{sha256(token)}`, so the store never holds a usable
//! bearer token.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use duka_core::{
  clock::Clock,
  identity::{Identity, IdentityProvider, NewUser, Role, Session, SignupOutcome},
  resource::sanitize,
  store::KeyValueStore,
};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use thiserror::Error;
use uuid::Uuid;

const USER_PREFIX: &str = "users:";
const SESSION_PREFIX: &str = "sessions:";
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum IdentityError {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("password hashing failed: {0}")]
  Hash(String),
}

impl IdentityError {
  fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    IdentityError::Store(Box::new(err))
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
  id:            Uuid,
  email:         String,
  name:          String,
  #[serde(default)]
  role:          Role,
  password_hash: String,
  created_at:    DateTime<Utc>,
}

impl UserRecord {
  fn identity(&self) -> Identity {
    Identity {
      id:    self.id,
      email: self.email.clone(),
      name:  self.name.clone(),
      role:  self.role,
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
  email:      String,
  expires_at: DateTime<Utc>,
}

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn user_key(email: &str) -> String { format!("{USER_PREFIX}{}", normalize_email(email)) }

fn session_key(token: &str) -> String {
  format!("{SESSION_PREFIX}{}", hex::encode(Sha256::digest(token.as_bytes())))
}

fn new_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

async fn hash_password(password: String) -> Result<String, IdentityError> {
  tokio::task::spawn_blocking(move || {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map(|h| h.to_string())
      .map_err(|e| IdentityError::Hash(e.to_string()))
  })
  .await
  .map_err(|e| IdentityError::Hash(e.to_string()))?
}

async fn verify_password(password: String, phc: String) -> Result<bool, IdentityError> {
  tokio::task::spawn_blocking(move || {
    let parsed = PasswordHash::new(&phc).map_err(|e| IdentityError::Hash(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
  })
  .await
  .map_err(|e| IdentityError::Hash(e.to_string()))?
}

// ─── Provider ────────────────────────────────────────────────────────────────

pub struct KvIdentityProvider<S> {
  store:       Arc<S>,
  clock:       Arc<dyn Clock>,
  session_ttl: Duration,
}

impl<S: KeyValueStore> KvIdentityProvider<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, session_ttl: Duration) -> Self {
    Self { store, clock, session_ttl }
  }

  async fn user(&self, email: &str) -> Result<Option<UserRecord>, IdentityError> {
    let raw = self.store.get(&user_key(email)).await.map_err(IdentityError::store)?;
    Ok(raw.map(serde_json::from_value).transpose()?)
  }
}

impl<S: KeyValueStore> IdentityProvider for KvIdentityProvider<S> {
  type Error = IdentityError;

  async fn resolve_token<'a>(&'a self, token: &'a str) -> Result<Option<Identity>, IdentityError> {
    let key = session_key(token);
    let Some(raw) = self.store.get(&key).await.map_err(IdentityError::store)? else {
      return Ok(None);
    };
    let session: SessionRecord = serde_json::from_value(raw)?;

    if session.expires_at <= self.clock.now() {
      self.store.delete(&key).await.map_err(IdentityError::store)?;
      return Ok(None);
    }

    // Re-read the user so role changes apply to live sessions.
    Ok(self.user(&session.email).await?.map(|u| u.identity()))
  }

  async fn create_user(&self, user: NewUser) -> Result<SignupOutcome, IdentityError> {
    let key = user_key(&user.email);
    if self.user(&user.email).await?.is_some() {
      return Ok(SignupOutcome::AlreadyExists);
    }

    let record = UserRecord {
      id:            Uuid::new_v4(),
      email:         normalize_email(&user.email),
      name:          sanitize(user.name.trim()),
      role:          Role::User,
      password_hash: hash_password(user.password).await?,
      created_at:    self.clock.now(),
    };

    // Insert only if absent; a concurrent signup for the same email keeps
    // whichever record landed first.
    let candidate = serde_json::to_value(&record)?;
    let stored = self
      .store
      .update(&key, move |current| Ok(current.unwrap_or(candidate)))
      .await
      .map_err(IdentityError::store)?;
    let stored: UserRecord = serde_json::from_value(stored)?;

    if stored.id != record.id {
      return Ok(SignupOutcome::AlreadyExists);
    }
    tracing::info!(email = %record.email, "user created");
    Ok(SignupOutcome::Created(record.identity()))
  }

  async fn issue_session<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> Result<Option<Session>, IdentityError> {
    let Some(user) = self.user(email).await? else {
      return Ok(None);
    };
    if !verify_password(password.to_owned(), user.password_hash.clone()).await? {
      return Ok(None);
    }

    let token = new_token();
    let expires_at = self.clock.now() + self.session_ttl;
    let record = SessionRecord { email: user.email.clone(), expires_at };
    self
      .store
      .set(&session_key(&token), serde_json::to_value(&record)?)
      .await
      .map_err(IdentityError::store)?;

    Ok(Some(Session { token, expires_at, user: user.identity() }))
  }

  async fn set_role<'a>(&'a self, email: &'a str, role: Role) -> Result<bool, IdentityError> {
    let Some(mut user) = self.user(email).await? else {
      return Ok(false);
    };
    user.role = role;
    self
      .store
      .set(&user_key(email), serde_json::to_value(&user)?)
      .await
      .map_err(IdentityError::store)?;
    tracing::info!(email = %user.email, %role, "role changed");
    Ok(true)
  }
}

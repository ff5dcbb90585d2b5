//! Identities and the `IdentityProvider` trait.
//!
//! The provider is the external authentication collaborator: it owns user
//! records and sessions and turns a bearer token into an [`Identity`]. Nothing
//! here caches identities; each request resolves its token afresh.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  #[default]
  User,
  Admin,
}

/// The principal behind a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:    Uuid,
  pub email: String,
  pub name:  String,
  pub role:  Role,
}

impl Identity {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// Input to [`IdentityProvider::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:    String,
  pub password: String,
  pub name:     String,
}

#[derive(Debug, Clone)]
pub enum SignupOutcome {
  Created(Identity),
  /// A user with this email is already registered; nothing was changed.
  AlreadyExists,
}

/// A bearer token issued by [`IdentityProvider::issue_session`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
  pub user:       Identity,
}

pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Resolve a bearer token. Unknown and expired tokens yield `Ok(None)`;
  /// `Err` is reserved for failures of the provider itself.
  fn resolve_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Register a user with [`Role::User`].
  fn create_user(
    &self,
    user: NewUser,
  ) -> impl Future<Output = Result<SignupOutcome, Self::Error>> + Send + '_;

  /// Exchange credentials for a session. Returns `None` on bad credentials.
  fn issue_session<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + 'a;

  /// Change a user's role. Returns `false` if no such user exists.
  fn set_role<'a>(
    &'a self,
    email: &'a str,
    role: Role,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

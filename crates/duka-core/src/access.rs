//! The access gate: bearer token → identity → allow or deny.

use std::sync::Arc;

use thiserror::Error;

use crate::{
  clock::Clock,
  identity::{Identity, IdentityProvider},
};

#[derive(Debug, Error)]
pub enum AccessError {
  #[error("Authentication required")]
  Unauthenticated,

  #[error("Forbidden: Admin privileges required")]
  Forbidden,

  #[error("identity provider error: {0}")]
  Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AccessError {
  /// HTTP status code a denial maps to.
  pub fn status_code(&self) -> u16 {
    match self {
      AccessError::Unauthenticated => 401,
      AccessError::Forbidden => 403,
      AccessError::Upstream(_) => 500,
    }
  }
}

/// Stateless gate in front of protected operations.
///
/// Every call re-resolves the token through the provider, so a role change
/// or a revoked session takes effect on the very next request.
pub struct AccessGate<P> {
  provider: Arc<P>,
  clock:    Arc<dyn Clock>,
}

impl<P> Clone for AccessGate<P> {
  fn clone(&self) -> Self {
    Self { provider: self.provider.clone(), clock: self.clock.clone() }
  }
}

impl<P: IdentityProvider> AccessGate<P> {
  pub fn new(provider: Arc<P>, clock: Arc<dyn Clock>) -> Self {
    Self { provider, clock }
  }

  /// Resolve `token` to an identity. A missing, unknown or expired token is
  /// `Ok(None)`; callers decide whether anonymous access is allowed.
  pub async fn authenticate(
    &self,
    token: Option<&str>,
  ) -> Result<Option<Identity>, AccessError> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
      return Ok(None);
    };
    self
      .provider
      .resolve_token(token)
      .await
      .map_err(|e| AccessError::Upstream(Box::new(e)))
  }

  /// Any authenticated identity.
  pub async fn require_user(&self, token: Option<&str>) -> Result<Identity, AccessError> {
    self.authenticate(token).await?.ok_or(AccessError::Unauthenticated)
  }

  /// An identity with [`Role::Admin`](crate::identity::Role::Admin).
  ///
  /// Denials of an authenticated non-admin are written to the `security`
  /// log target with the caller's email; they are not business events.
  pub async fn require_admin(&self, token: Option<&str>) -> Result<Identity, AccessError> {
    let identity = self.require_user(token).await?;
    if !identity.is_admin() {
      tracing::warn!(
        target: "security",
        email = %identity.email,
        at = %self.clock.now().to_rfc3339(),
        "unauthorized admin access attempt"
      );
      return Err(AccessError::Forbidden);
    }
    Ok(identity)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    clock::SystemClock,
    testing::{StaticProvider, identity},
    identity::Role,
  };

  fn gate() -> AccessGate<StaticProvider> {
    let provider = StaticProvider::default()
      .with_token("user-token", identity("user@example.com", Role::User))
      .with_token("admin-token", identity("admin@example.com", Role::Admin));
    AccessGate::new(Arc::new(provider), Arc::new(SystemClock))
  }

  #[tokio::test]
  async fn no_token_is_401() {
    let err = gate().require_admin(None).await.unwrap_err();
    assert!(matches!(err, AccessError::Unauthenticated));
    assert_eq!(err.status_code(), 401);
    assert_eq!(err.to_string(), "Authentication required");
  }

  #[tokio::test]
  async fn unknown_token_is_401() {
    let err = gate().require_admin(Some("bogus")).await.unwrap_err();
    assert_eq!(err.status_code(), 401);
  }

  #[tokio::test]
  async fn user_role_is_403() {
    let err = gate().require_admin(Some("user-token")).await.unwrap_err();
    assert!(matches!(err, AccessError::Forbidden));
    assert_eq!(err.status_code(), 403);
    assert_eq!(err.to_string(), "Forbidden: Admin privileges required");
  }

  #[tokio::test]
  async fn admin_role_is_authorized() {
    let who = gate().require_admin(Some("admin-token")).await.unwrap();
    assert_eq!(who.email, "admin@example.com");
  }

  #[tokio::test]
  async fn authenticate_fails_soft() {
    let g = gate();
    assert!(g.authenticate(None).await.unwrap().is_none());
    assert!(g.authenticate(Some("")).await.unwrap().is_none());
    assert!(g.authenticate(Some("bogus")).await.unwrap().is_none());
    assert!(g.authenticate(Some("user-token")).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn provider_failure_is_upstream() {
    let g = AccessGate::new(
      Arc::new(StaticProvider::default().failing()),
      Arc::new(SystemClock) as Arc<dyn Clock>,
    );
    let err = g.require_user(Some("anything")).await.unwrap_err();
    assert_eq!(err.status_code(), 500);
  }
}

//! Bearer-token extractors backed by the [`AccessGate`](duka_core::access::AccessGate).

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use duka_core::{identity::Identity, store::KeyValueStore};

use crate::{AppState, error::ApiError};

/// The token from an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;
  scheme
    .eq_ignore_ascii_case("bearer")
    .then(|| token.trim())
    .filter(|t| !t.is_empty())
}

/// Any signed-in caller.
pub struct CurrentUser(pub Identity);

/// A caller holding the admin role.
pub struct AdminUser(pub Identity);

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: KeyValueStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let identity = state.gate.require_user(bearer_token(&parts.headers)).await?;
    Ok(CurrentUser(identity))
  }
}

impl<S> FromRequestParts<AppState<S>> for AdminUser
where
  S: KeyValueStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let identity = state.gate.require_admin(bearer_token(&parts.headers)).await?;
    Ok(AdminUser(identity))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn extracts_bearer_token() {
    assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
    assert_eq!(bearer_token(&headers("bearer abc123")), Some("abc123"));
  }

  #[test]
  fn other_schemes_are_ignored() {
    assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
  }

  #[test]
  fn empty_token_is_none() {
    assert_eq!(bearer_token(&headers("Bearer ")), None);
    assert_eq!(bearer_token(&HeaderMap::new()), None);
  }
}

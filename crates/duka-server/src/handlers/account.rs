//! Handlers for `/signup`, `/login` and `/me`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/signup` | Body: `{"email","password","name"}` |
//! | `POST` | `/login`  | Body: `{"email","password"}`; returns a bearer token |
//! | `GET`  | `/me`     | Requires a bearer token |

use axum::{Json, extract::State};
use duka_core::{
  event::EventType,
  identity::{IdentityProvider, NewUser, SignupOutcome},
  store::KeyValueStore,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{JsonBody, body};
use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
  pub email:    Option<String>,
  pub password: Option<String>,
  pub name:     Option<String>,
}

/// Names of the listed fields that are absent or blank.
fn missing(fields: &[(&'static str, &Option<String>)]) -> Vec<&'static str> {
  fields
    .iter()
    .filter(|(_, v)| v.as_deref().is_none_or(|s| s.trim().is_empty()))
    .map(|(name, _)| *name)
    .collect()
}

/// `POST /signup`
pub async fn signup<S>(
  State(state): State<AppState<S>>,
  payload: JsonBody<Credentials>,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let creds = body(payload)?;
  let absent = missing(&[
    ("email", &creds.email),
    ("password", &creds.password),
    ("name", &creds.name),
  ]);
  if !absent.is_empty() {
    return Err(ApiError::BadRequest(format!(
      "Missing required fields: {}",
      absent.join(", ")
    )));
  }
  let (Some(email), Some(password), Some(name)) = (creds.email, creds.password, creds.name)
  else {
    return Err(ApiError::BadRequest("Missing required fields".to_owned()));
  };
  if !email.contains('@') {
    return Err(ApiError::BadRequest("Invalid email address".to_owned()));
  }

  let outcome = state
    .identity
    .create_user(NewUser { email, password, name })
    .await
    .map_err(ApiError::internal)?;

  match outcome {
    SignupOutcome::Created(user) => {
      state
        .tracker
        .record(EventType::UserSignup, json!({ "email": user.email, "name": user.name }))
        .await;
      Ok(Json(json!({ "success": true, "user": user })))
    }
    SignupOutcome::AlreadyExists => {
      Ok(Json(json!({ "success": true, "message": "User already exists" })))
    }
  }
}

/// `POST /login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  payload: JsonBody<Credentials>,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let creds = body(payload)?;
  let absent = missing(&[("email", &creds.email), ("password", &creds.password)]);
  if !absent.is_empty() {
    return Err(ApiError::BadRequest(format!(
      "Missing required fields: {}",
      absent.join(", ")
    )));
  }
  let email = creds.email.unwrap_or_default();
  let password = creds.password.unwrap_or_default();

  let session = state
    .identity
    .issue_session(&email, &password)
    .await
    .map_err(ApiError::internal)?
    .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_owned()))?;
  Ok(Json(serde_json::to_value(session).map_err(ApiError::internal)?))
}

/// `GET /me`
pub async fn me<S>(CurrentUser(user): CurrentUser) -> Json<Value>
where
  S: KeyValueStore + 'static,
{
  Json(json!({ "user": user }))
}

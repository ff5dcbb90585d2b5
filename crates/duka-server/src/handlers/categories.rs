//! `GET|POST /categories/{store}`

use axum::{
  Json,
  extract::{Path, State},
};
use duka_core::store::KeyValueStore;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{JsonBody, body};
use crate::{AppState, auth::AdminUser, error::ApiError};

pub async fn list<S>(
  State(state): State<AppState<S>>,
  Path(store): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let categories = state.repo.categories(&store).await?;
  Ok(Json(json!({ "categories": categories })))
}

#[derive(Debug, Deserialize)]
pub struct ReplaceBody {
  pub categories: Vec<Value>,
}

pub async fn replace<S>(
  State(state): State<AppState<S>>,
  _: AdminUser,
  Path(store): Path<String>,
  payload: JsonBody<ReplaceBody>,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  state.repo.replace_categories(&store, body(payload)?.categories).await?;
  Ok(Json(json!({ "success": true })))
}

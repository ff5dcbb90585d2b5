//! Handlers for `/blog` endpoints.

use axum::{
  Json,
  extract::{Path, State},
};
use duka_core::{resource::ResourceKind, store::KeyValueStore};
use serde_json::{Value, json};

use super::{JsonBody, body};
use crate::{AppState, auth::AdminUser, error::ApiError};

/// `GET /blog`
pub async fn list<S>(State(state): State<AppState<S>>) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let posts = state.repo.browse(ResourceKind::Blog, None).await?;
  Ok(Json(json!({ "posts": posts })))
}

/// `GET /blog/{id}`; `id` may be the bare suffix or the full `blog:` key.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let post = state.repo.view(ResourceKind::Blog, &id).await?;
  Ok(Json(json!({ "post": post })))
}

/// `POST /blog`
pub async fn upsert<S>(
  State(state): State<AppState<S>>,
  AdminUser(admin): AdminUser,
  payload: JsonBody,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let id = state.repo.upsert(ResourceKind::Blog, body(payload)?).await?;
  tracing::info!(%id, by = %admin.email, "post saved");
  Ok(Json(json!({ "success": true, "id": id })))
}

/// `DELETE /blog/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  AdminUser(admin): AdminUser,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  state.repo.remove(ResourceKind::Blog, &id).await?;
  tracing::info!(%id, by = %admin.email, "post deleted");
  Ok(Json(json!({ "success": true })))
}

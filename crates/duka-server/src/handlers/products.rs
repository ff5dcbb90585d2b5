//! Handlers for `/products` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/products` | Optional `?store=main\|lingerie` |
//! | `GET`    | `/products/{id}` | 404 if not found; records a product view |
//! | `POST`   | `/products` | Admin; create or replace |
//! | `DELETE` | `/products/{id}` | Admin |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use duka_core::{resource::ResourceKind, store::KeyValueStore};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{JsonBody, body};
use crate::{AppState, auth::AdminUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub store: Option<String>,
}

/// `GET /products[?store=<store>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let products = state
    .repo
    .browse(ResourceKind::Product, params.store.as_deref())
    .await?;
  Ok(Json(json!({ "products": products })))
}

/// `GET /products/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let product = state.repo.view(ResourceKind::Product, &id).await?;
  Ok(Json(json!({ "product": product })))
}

/// `POST /products`
pub async fn upsert<S>(
  State(state): State<AppState<S>>,
  AdminUser(admin): AdminUser,
  payload: JsonBody,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let id = state.repo.upsert(ResourceKind::Product, body(payload)?).await?;
  tracing::info!(%id, by = %admin.email, "product saved");
  Ok(Json(json!({ "success": true, "id": id })))
}

/// `DELETE /products/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  AdminUser(admin): AdminUser,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  state.repo.remove(ResourceKind::Product, &id).await?;
  tracing::info!(%id, by = %admin.email, "product deleted");
  Ok(Json(json!({ "success": true })))
}

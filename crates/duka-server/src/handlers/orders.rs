//! Handlers for `/orders` endpoints. Customers place orders anonymously;
//! listing and status changes are admin-only.

use axum::{
  Json,
  extract::{Path, State},
};
use duka_core::{resource::ResourceKind, store::KeyValueStore};
use serde_json::{Value, json};

use super::{JsonBody, body};
use crate::{AppState, auth::AdminUser, error::ApiError};

/// `POST /orders`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  payload: JsonBody,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let id = state.repo.upsert(ResourceKind::Order, body(payload)?).await?;
  tracing::info!(%id, "order placed");
  Ok(Json(json!({ "success": true, "orderId": id })))
}

/// `GET /orders`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _: AdminUser,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let orders = state.repo.list(ResourceKind::Order, None).await?;
  Ok(Json(json!({ "orders": orders })))
}

/// `PATCH /orders/{id}`; body is a partial order, typically `{"status": ..}`.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  AdminUser(admin): AdminUser,
  Path(id): Path<String>,
  payload: JsonBody,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let order = state.repo.patch_order(&id, body(payload)?).await?;
  tracing::info!(%id, by = %admin.email, "order updated");
  Ok(Json(json!({ "success": true, "order": order })))
}

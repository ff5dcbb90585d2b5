//! Delivery table and checkout quotes. Both are public.

use axum::{Json, extract::State};
use duka_core::{
  checkout::{self, QuoteRequest},
  delivery,
  store::KeyValueStore,
};
use serde_json::{Value, json};

use super::{JsonBody, body};
use crate::{AppState, error::ApiError};

/// `GET /delivery/regions`
pub async fn regions() -> Json<Value> {
  Json(json!({
    "regions": delivery::regions(),
    "areas": delivery::areas(),
  }))
}

/// `POST /checkout/quote`
pub async fn quote<S>(
  State(state): State<AppState<S>>,
  payload: JsonBody<QuoteRequest>,
) -> Result<Json<checkout::Quote>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let quote = checkout::quote(&body(payload)?, &state.config.merchant())?;
  Ok(Json(quote))
}

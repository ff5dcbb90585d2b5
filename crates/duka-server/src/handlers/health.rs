//! `GET /health`

use axum::{Json, extract::State};
use duka_core::store::KeyValueStore;
use serde_json::{Value, json};

use crate::AppState;

pub async fn handler<S>(State(state): State<AppState<S>>) -> Json<Value>
where
  S: KeyValueStore + 'static,
{
  Json(json!({
    "status": "healthy",
    "timestamp": state.clock.now(),
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

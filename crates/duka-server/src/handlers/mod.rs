//! Route handlers, one module per resource.
//!
//! Handlers are generic over the store so the router can be driven by the
//! SQLite backend in production and by an in-memory database in tests.

pub mod account;
pub mod analytics;
pub mod blog;
pub mod categories;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod products;
pub mod uploads;

use axum::{Json, extract::rejection::JsonRejection};
use serde_json::Value;

use crate::error::ApiError;

/// A JSON request body whose rejection is reported as a JSON error.
pub(crate) type JsonBody<T = Value> = Result<Json<T>, JsonRejection>;

pub(crate) fn body<T>(payload: JsonBody<T>) -> Result<T, ApiError> {
  let Json(value) = payload?;
  Ok(value)
}

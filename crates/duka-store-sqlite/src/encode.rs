//! Conversions between JSON values and their stored text form.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

pub fn encode_value(value: &Value) -> String { value.to_string() }

pub fn decode_value(raw: &str) -> serde_json::Result<Value> { serde_json::from_str(raw) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a row's value inside a `call` closure, where errors must be
/// `tokio_rusqlite::Error`.
pub fn decode_in_call(raw: &str) -> tokio_rusqlite::Result<Value> {
  decode_value(raw).map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))
}

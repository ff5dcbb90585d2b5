//! Business events and the per-day rollups derived from them.
//!
//! Events are append-only: written once under a unique key and never updated
//! or deleted. [`DailyStat`] records are the only aggregates; one exists per
//! calendar day and its counters only ever grow.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resource::as_number;

/// Key prefix of the raw event log.
pub const EVENT_PREFIX: &str = "analytics:events:";
/// Key prefix of the daily rollup table.
pub const DAILY_PREFIX: &str = "analytics:daily:";

// ─── Event ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
  PageView,
  ProductView,
  OrderCreated,
  OrderUpdated,
  UserSignup,
  ProductCreated,
  ProductDeleted,
  BlogCreated,
  BlogDeleted,
  BlogView,
}

/// One immutable entry in the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub id:         String,
  #[serde(rename = "type")]
  pub event_type: EventType,
  pub data:       Value,
  pub timestamp:  DateTime<Utc>,
}

// ─── Daily rollup ────────────────────────────────────────────────────────────

/// Aggregate counters for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
  pub date:          NaiveDate,
  #[serde(default)]
  pub page_views:    u64,
  #[serde(default)]
  pub product_views: u64,
  #[serde(default)]
  pub orders:        u64,
  #[serde(default)]
  pub revenue:       f64,
  #[serde(default)]
  pub signups:       u64,
}

impl DailyStat {
  pub fn empty(date: NaiveDate) -> Self {
    Self {
      date,
      page_views: 0,
      product_views: 0,
      orders: 0,
      revenue: 0.0,
      signups: 0,
    }
  }

  /// Decode a stored rollup; a missing record is an empty day. An unreadable
  /// one is an error so that a rewrite never resets its counters.
  pub fn from_stored(date: NaiveDate, stored: Option<Value>) -> serde_json::Result<Self> {
    let Some(value) = stored else {
      return Ok(Self::empty(date));
    };
    let mut stat: DailyStat = serde_json::from_value(value)?;
    stat.date = date;
    Ok(stat)
  }

  /// Fold one event into the counters. Event types without a counter leave
  /// the record unchanged.
  pub fn apply(&mut self, event_type: EventType, data: &Value) {
    match event_type {
      EventType::PageView => self.page_views += 1,
      EventType::ProductView => self.product_views += 1,
      EventType::OrderCreated => {
        self.orders += 1;
        self.revenue += order_amount(data);
      }
      EventType::UserSignup => self.signups += 1,
      _ => {}
    }
  }
}

/// Key of the rollup for `date`, e.g. `analytics:daily:2025-03-09`.
pub fn daily_key(date: NaiveDate) -> String {
  format!("{DAILY_PREFIX}{}", date.format("%Y-%m-%d"))
}

/// The `amount` carried by an `order_created` payload. Missing, negative and
/// non-finite amounts count as zero so revenue never decreases.
fn order_amount(data: &Value) -> f64 {
  as_number(data.get("amount"))
    .filter(|a| a.is_finite() && *a > 0.0)
    .unwrap_or(0.0)
}

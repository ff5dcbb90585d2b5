//! Resource collections (products, orders, blog posts) and the document rules
//! they share: key namespacing, required-field validation and free-text
//! sanitization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result, event::EventType};

pub const CATEGORY_PREFIX: &str = "categories:";

// ─── Kinds ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
  Product,
  Order,
  Blog,
}

impl ResourceKind {
  /// Key prefix shared by every document of this kind.
  pub fn prefix(self) -> &'static str {
    match self {
      ResourceKind::Product => "products:",
      ResourceKind::Order => "orders:",
      ResourceKind::Blog => "blog:",
    }
  }

  pub fn required_fields(self) -> &'static [&'static str] {
    match self {
      ResourceKind::Product => &["name", "price", "category", "store"],
      ResourceKind::Order => &["customerName", "phone", "total"],
      ResourceKind::Blog => &["title", "content", "category"],
    }
  }

  /// Free-text fields that are HTML-escaped before storage.
  pub fn sanitized_fields(self) -> &'static [&'static str] {
    match self {
      ResourceKind::Product => &["name", "description"],
      ResourceKind::Order => &["customerName", "notes"],
      ResourceKind::Blog => &["title", "excerpt"],
    }
  }

  /// Field name under which event payloads reference a document.
  pub(crate) fn event_id_field(self) -> &'static str {
    match self {
      ResourceKind::Product => "productId",
      ResourceKind::Order => "orderId",
      ResourceKind::Blog => "postId",
    }
  }

  /// The human-readable label field copied into event payloads.
  pub(crate) fn label_field(self) -> &'static str {
    match self {
      ResourceKind::Product => "name",
      ResourceKind::Order => "customerName",
      ResourceKind::Blog => "title",
    }
  }

  pub(crate) fn created_event(self) -> EventType {
    match self {
      ResourceKind::Product => EventType::ProductCreated,
      ResourceKind::Order => EventType::OrderCreated,
      ResourceKind::Blog => EventType::BlogCreated,
    }
  }

  pub(crate) fn deleted_event(self) -> Option<EventType> {
    match self {
      ResourceKind::Product => Some(EventType::ProductDeleted),
      ResourceKind::Blog => Some(EventType::BlogDeleted),
      ResourceKind::Order => None,
    }
  }

  pub(crate) fn view_event(self) -> Option<EventType> {
    match self {
      ResourceKind::Product => Some(EventType::ProductView),
      ResourceKind::Blog => Some(EventType::BlogView),
      ResourceKind::Order => None,
    }
  }

  /// Resolve an identifier to its store key. Identifiers already carrying the
  /// kind's prefix are used verbatim; bare suffixes get the prefix added.
  pub fn key_for(self, id: &str) -> String {
    if id.starts_with(self.prefix()) {
      id.to_owned()
    } else {
      format!("{}{id}", self.prefix())
    }
  }
}

// ─── Order status ────────────────────────────────────────────────────────────

/// Order lifecycle labels. Any status may be replaced by any other; there is
/// no transition graph.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
  strum::VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
  Completed,
}

// ─── Document rules ──────────────────────────────────────────────────────────

/// Require `value` to be a JSON object.
pub fn into_object(value: Value) -> Result<Map<String, Value>> {
  match value {
    Value::Object(map) => Ok(map),
    _ => Err(Error::Validation("expected a JSON object".to_owned())),
  }
}

/// Fail with the first field in `required` that is absent, null, false or a
/// blank string.
pub fn validate_required(doc: &Map<String, Value>, required: &[&str]) -> Result<()> {
  for field in required {
    let present = match doc.get(*field) {
      None | Some(Value::Null) | Some(Value::Bool(false)) => false,
      Some(Value::String(s)) => !s.trim().is_empty(),
      Some(_) => true,
    };
    if !present {
      return Err(Error::missing_field(field));
    }
  }
  Ok(())
}

/// HTML-escape the characters that could open or close markup.
pub fn sanitize(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for c in input.chars() {
    match c {
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#x27;"),
      '/' => out.push_str("&#x2F;"),
      c => out.push(c),
    }
  }
  out
}

/// Sanitize every string-valued field of `doc` named in `fields`.
pub fn sanitize_fields(doc: &mut Map<String, Value>, fields: &[&str]) {
  for field in fields {
    if let Some(Value::String(s)) = doc.get_mut(*field) {
      *s = sanitize(s);
    }
  }
}

/// Read a JSON number, accepting numeric strings as well.
pub fn as_number(value: Option<&Value>) -> Option<f64> {
  match value? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// Render a scalar as a plain string (strings unquoted, numbers as written).
pub(crate) fn as_text(value: Option<&Value>) -> Option<String> {
  match value? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

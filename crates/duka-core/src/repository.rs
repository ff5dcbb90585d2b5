//! CRUD over the key-value store for products, orders, blog posts and
//! per-store category lists.
//!
//! Every mutation is followed by an [`EventTracker::record`] call. Tracking is
//! best-effort and happens after the primary write, so a tracking failure can
//! never undo it.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use strum::VariantNames as _;

use crate::{
  Error, Result,
  clock::Clock,
  delivery,
  event::EventType,
  resource::{
    CATEGORY_PREFIX, OrderStatus, ResourceKind, as_text, into_object, sanitize_fields,
    validate_required,
  },
  store::KeyValueStore,
  tracker::EventTracker,
};

pub struct Repository<S> {
  store:   Arc<S>,
  tracker: EventTracker<S>,
  clock:   Arc<dyn Clock>,
}

impl<S: KeyValueStore> Repository<S> {
  pub fn new(store: Arc<S>, tracker: EventTracker<S>, clock: Arc<dyn Clock>) -> Self {
    Self { store, tracker, clock }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// All documents of `kind`, optionally narrowed to one storefront
  /// (`products:{store}:`). The filter only applies to products.
  pub async fn list(&self, kind: ResourceKind, store_filter: Option<&str>) -> Result<Vec<Value>> {
    let prefix = match (kind, store_filter) {
      (ResourceKind::Product, Some(store)) if !store.is_empty() => {
        format!("{}{store}:", kind.prefix())
      }
      _ => kind.prefix().to_owned(),
    };
    self.store.get_by_prefix(&prefix).await.map_err(Error::store)
  }

  pub async fn get(&self, kind: ResourceKind, id: &str) -> Result<Value> {
    let key = kind.key_for(id);
    self
      .store
      .get(&key)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("{} not found", not_found_label(kind))))
  }

  /// [`list`](Self::list) for a public catalogue page; records a `page_view`.
  pub async fn browse(&self, kind: ResourceKind, store_filter: Option<&str>) -> Result<Vec<Value>> {
    let docs = self.list(kind, store_filter).await?;
    let page = match kind {
      ResourceKind::Product => "products",
      ResourceKind::Blog => "blog",
      ResourceKind::Order => "orders",
    };
    let mut data = json!({ "page": page });
    if let Some(store) = store_filter {
      data["store"] = json!(store);
    }
    self.tracker.record(EventType::PageView, data).await;
    Ok(docs)
  }

  /// [`get`](Self::get) for a public detail page; records the kind's view
  /// event.
  pub async fn view(&self, kind: ResourceKind, id: &str) -> Result<Value> {
    let doc = self.get(kind, id).await?;
    if let Some(event) = kind.view_event() {
      self
        .tracker
        .record(
          event,
          json!({
            kind.event_id_field(): id,
            kind.label_field(): doc.get(kind.label_field()).cloned().unwrap_or(Value::Null),
          }),
        )
        .await;
    }
    Ok(doc)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Validate, sanitize, key and store a document; returns its key.
  ///
  /// Products and posts keep a caller-supplied `id` (a bare id gains the
  /// kind's prefix); orders always receive a fresh timestamp key, start as
  /// `pending` and are stamped `createdAt`.
  pub async fn upsert(&self, kind: ResourceKind, doc: Value) -> Result<String> {
    let mut doc = into_object(doc)?;
    validate_required(&doc, kind.required_fields())?;
    sanitize_fields(&mut doc, kind.sanitized_fields());

    let now = self.clock.now();
    doc.insert("updatedAt".into(), json!(now.to_rfc3339()));
    match kind {
      ResourceKind::Blog => {
        doc.entry("likes").or_insert(json!(0));
        doc.entry("comments").or_insert(json!(0));
      }
      ResourceKind::Order => prepare_order(&mut doc, now),
      ResourceKind::Product => {}
    }

    let key = match kind {
      ResourceKind::Order => self.insert_order(&mut doc, now).await?,
      _ => {
        let key = document_key(kind, &doc, now);
        doc.insert("id".into(), json!(key));
        self
          .store
          .set(&key, Value::Object(doc.clone()))
          .await
          .map_err(Error::store)?;
        key
      }
    };

    self
      .tracker
      .record(kind.created_event(), created_payload(kind, &key, &doc))
      .await;

    Ok(key)
  }

  /// Delete a product or post. Deleting an absent key is not an error.
  pub async fn remove(&self, kind: ResourceKind, id: &str) -> Result<()> {
    let Some(event) = kind.deleted_event() else {
      return Err(Error::Validation(format!("{kind} records cannot be deleted")));
    };
    let key = kind.key_for(id);
    self.store.delete(&key).await.map_err(Error::store)?;
    self
      .tracker
      .record(event, json!({ kind.event_id_field(): id }))
      .await;
    Ok(())
  }

  /// Merge `partial` into an existing order.
  ///
  /// A `status` in the partial must be one of the [`OrderStatus`] labels; any
  /// status may follow any other. `id` and `createdAt` are never overwritten.
  pub async fn patch_order(&self, id: &str, partial: Value) -> Result<Value> {
    let partial = into_object(partial)?;
    let status = match partial.get("status") {
      None | Some(Value::Null) => None,
      Some(v) => Some(parse_status(v)?),
    };

    let kind = ResourceKind::Order;
    let key = kind.key_for(id);
    let existing = self
      .store
      .get(&key)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound("Order not found".to_owned()))?;
    let mut order = into_object(existing)?;

    for (field, value) in partial {
      if field == "id" || field == "createdAt" {
        continue;
      }
      order.insert(field, value);
    }
    order.insert("updatedAt".into(), json!(self.clock.now().to_rfc3339()));

    let order = Value::Object(order);
    self
      .store
      .set(&key, order.clone())
      .await
      .map_err(Error::store)?;
    self
      .tracker
      .record(EventType::OrderUpdated, json!({ "orderId": key, "status": status }))
      .await;

    Ok(order)
  }

  // ── Categories ────────────────────────────────────────────────────────────

  pub async fn categories(&self, store: &str) -> Result<Vec<Value>> {
    let stored = self
      .store
      .get(&format!("{CATEGORY_PREFIX}{store}"))
      .await
      .map_err(Error::store)?;
    Ok(match stored {
      Some(Value::Array(list)) => list,
      _ => Vec::new(),
    })
  }

  pub async fn replace_categories(&self, store: &str, categories: Vec<Value>) -> Result<()> {
    self
      .store
      .set(&format!("{CATEGORY_PREFIX}{store}"), Value::Array(categories))
      .await
      .map_err(Error::store)
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  /// Store `doc` at `orders:{millis}`, moving the timestamp forward while the
  /// key is taken. Each claim is a single insert-if-absent, so concurrent
  /// orders never land on the same key.
  async fn insert_order(&self, doc: &mut Map<String, Value>, now: DateTime<Utc>) -> Result<String> {
    let mut millis = now.timestamp_millis();
    loop {
      let key = format!("{}{millis}", ResourceKind::Order.prefix());
      doc.insert("id".into(), json!(key));

      let candidate = Value::Object(doc.clone());
      let claimed = Arc::new(AtomicBool::new(false));
      let flag = claimed.clone();
      self
        .store
        .update(&key, move |current| {
          Ok(current.unwrap_or_else(|| {
            flag.store(true, Ordering::SeqCst);
            candidate
          }))
        })
        .await
        .map_err(Error::store)?;

      if claimed.load(Ordering::SeqCst) {
        return Ok(key);
      }
      millis += 1;
    }
  }
}

/// Key for a new or replaced product or post.
fn document_key(kind: ResourceKind, doc: &Map<String, Value>, now: DateTime<Utc>) -> String {
  let supplied = doc
    .get("id")
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|id| !id.is_empty());
  match (kind, supplied) {
    (_, Some(id)) => kind.key_for(id),
    (ResourceKind::Product, None) => {
      format!("{}{}:{}", kind.prefix(), store_of(doc), now.timestamp_millis())
    }
    (_, None) => format!("{}{}", kind.prefix(), now.timestamp_millis()),
  }
}

fn not_found_label(kind: ResourceKind) -> &'static str {
  match kind {
    ResourceKind::Product => "Product",
    ResourceKind::Order => "Order",
    ResourceKind::Blog => "Post",
  }
}

fn store_of(doc: &Map<String, Value>) -> String {
  as_text(doc.get("store")).unwrap_or_default()
}

fn parse_status(value: &Value) -> Result<OrderStatus> {
  value
    .as_str()
    .and_then(|s| s.parse().ok())
    .ok_or_else(|| {
      Error::Validation(format!(
        "Invalid order status: expected one of {}",
        OrderStatus::VARIANTS.join(", ")
      ))
    })
}

/// Order-only defaults: pending status, creation time, delivery fee lookup.
fn prepare_order(doc: &mut Map<String, Value>, now: DateTime<Utc>) {
  doc.insert("status".into(), json!(OrderStatus::Pending));
  doc.insert("createdAt".into(), json!(now.to_rfc3339()));
  if !doc.contains_key("deliveryFee")
    && let Some(fee) = doc
      .get("region")
      .and_then(Value::as_str)
      .and_then(delivery::fee_for)
  {
    doc.insert("deliveryFee".into(), json!(fee));
  }
}

fn created_payload(kind: ResourceKind, key: &str, doc: &Map<String, Value>) -> Value {
  match kind {
    ResourceKind::Order => json!({
      "orderId": key,
      "amount": doc.get("total").cloned().unwrap_or(json!(0)),
      "items": doc.get("items").and_then(Value::as_array).map_or(0, Vec::len),
    }),
    _ => json!({
      kind.event_id_field(): key,
      kind.label_field(): doc.get(kind.label_field()).cloned().unwrap_or(Value::Null),
    }),
  }
}

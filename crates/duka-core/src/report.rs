//! Read-only analytics: the admin dashboard, period sales reports and data
//! export bundles.
//!
//! Flow metrics (revenue, orders, views, signups) come from the trailing
//! window of [`DailyStat`] rollups. Stock metrics (product count, pending and
//! completed orders) are counted over the full collections and are therefore
//! all-time figures. None of these operations records an event.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::{
  Error, Result,
  clock::Clock,
  event::{DailyStat, daily_key},
  resource::{OrderStatus, ResourceKind, as_number, as_text},
  store::KeyValueStore,
};

/// Days covered by the dashboard window, today included.
pub const DASHBOARD_DAYS: u32 = 30;
/// Days of rollups exported before today.
pub const EXPORT_ANALYTICS_DAYS: u32 = 90;
pub const EXPORT_VERSION: &str = "1.0";
const TOP_PRODUCTS: usize = 10;

// ─── Output types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
  pub total_revenue:       f64,
  pub total_orders:        u64,
  pub total_page_views:    u64,
  pub total_product_views: u64,
  pub total_signups:       u64,
  pub average_order_value: f64,
  pub conversion_rate:     f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
  pub summary:          Summary,
  pub today:            DailyStat,
  pub chart_data:       Vec<DailyStat>,
  pub product_count:    usize,
  pub pending_orders:   usize,
  pub completed_orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSales {
  pub id:       String,
  pub name:     Option<String>,
  pub quantity: u64,
  pub revenue:  f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
  pub period:              String,
  pub total_orders:        usize,
  pub total_sales:         f64,
  pub average_order_value: f64,
  pub by_status:           BTreeMap<String, u64>,
  pub top_products:        Vec<ProductSales>,
  pub orders:              Vec<Value>,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum ExportKind {
  Products,
  Orders,
  Blog,
  Analytics,
  All,
}

impl ExportKind {
  fn includes(self, part: ExportKind) -> bool { self == part || self == ExportKind::All }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub products:    Option<Vec<Value>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub orders:      Option<Vec<Value>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub blog:        Option<Vec<Value>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub analytics:   Option<Vec<DailyStat>>,
  pub exported_at: DateTime<Utc>,
  pub version:     &'static str,
}

// ─── Pure folds ──────────────────────────────────────────────────────────────

/// Sum a window of rollups and derive the ratios. Both ratios are 0 when
/// their denominator is 0.
pub fn summarize(days: &[DailyStat]) -> Summary {
  let mut s = Summary {
    total_revenue:       0.0,
    total_orders:        0,
    total_page_views:    0,
    total_product_views: 0,
    total_signups:       0,
    average_order_value: 0.0,
    conversion_rate:     0.0,
  };
  for day in days {
    s.total_revenue += day.revenue;
    s.total_orders += day.orders;
    s.total_page_views += day.page_views;
    s.total_product_views += day.product_views;
    s.total_signups += day.signups;
  }
  if s.total_orders > 0 {
    s.average_order_value = s.total_revenue / s.total_orders as f64;
  }
  if s.total_page_views > 0 {
    s.conversion_rate = s.total_orders as f64 / s.total_page_views as f64 * 100.0;
  }
  s
}

/// `count` consecutive dates ending at `today`, oldest first.
pub fn trailing_days(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
  (0..count)
    .rev()
    .filter_map(|back| today.checked_sub_signed(Duration::days(back.into())))
    .collect()
}

fn status_of(order: &Value) -> String {
  order
    .get("status")
    .and_then(Value::as_str)
    .map(str::to_owned)
    .unwrap_or_else(|| OrderStatus::Pending.to_string())
}

fn created_at(order: &Value) -> Option<DateTime<Utc>> {
  let raw = order.get("createdAt")?.as_str()?;
  DateTime::parse_from_rfc3339(raw)
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}

/// Per-product quantity and revenue across the `items` of `orders`, highest
/// revenue first, at most ten entries.
pub fn top_products(orders: &[Value]) -> Vec<ProductSales> {
  let mut acc: BTreeMap<String, ProductSales> = BTreeMap::new();
  for item in orders
    .iter()
    .filter_map(|o| o.get("items").and_then(Value::as_array))
    .flatten()
  {
    let Some(id) = as_text(item.get("id")) else { continue };
    let quantity = item
      .get("quantity")
      .and_then(Value::as_u64)
      .filter(|q| *q > 0)
      .unwrap_or(1);
    let price = as_number(item.get("price")).unwrap_or(0.0);

    let entry = acc.entry(id.clone()).or_insert_with(|| ProductSales {
      id,
      name: as_text(item.get("name")),
      quantity: 0,
      revenue: 0.0,
    });
    entry.quantity += quantity;
    entry.revenue += price * quantity as f64;
  }

  let mut ranked: Vec<ProductSales> = acc.into_values().collect();
  ranked.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
  ranked.truncate(TOP_PRODUCTS);
  ranked
}

// ─── Builder ─────────────────────────────────────────────────────────────────

pub struct AnalyticsReportBuilder<S> {
  store: Arc<S>,
  clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> AnalyticsReportBuilder<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self { Self { store, clock } }

  async fn daily_stats(&self, days: &[NaiveDate]) -> Result<Vec<Option<DailyStat>>> {
    let keys: Vec<String> = days.iter().copied().map(daily_key).collect();
    let stored = self.store.mget(&keys).await.map_err(Error::store)?;
    Ok(
      days
        .iter()
        .zip(stored)
        .map(|(date, v)| v.map(|v| DailyStat::from_stored(*date, Some(v))).transpose())
        .collect::<serde_json::Result<_>>()?,
    )
  }

  async fn collection(&self, kind: ResourceKind) -> Result<Vec<Value>> {
    self
      .store
      .get_by_prefix(kind.prefix())
      .await
      .map_err(Error::store)
  }

  pub async fn dashboard(&self) -> Result<DashboardSnapshot> {
    let today = self.clock.today();
    let days = trailing_days(today, DASHBOARD_DAYS);

    let chart_data: Vec<DailyStat> = days
      .iter()
      .zip(self.daily_stats(&days).await?)
      .map(|(date, stat)| stat.unwrap_or_else(|| DailyStat::empty(*date)))
      .collect();
    let summary = summarize(&chart_data);

    let today_stat = DailyStat::from_stored(
      today,
      self.store.get(&daily_key(today)).await.map_err(Error::store)?,
    )?;

    let orders = self.collection(ResourceKind::Order).await?;
    let products = self.collection(ResourceKind::Product).await?;
    let count_status = |status: OrderStatus| {
      orders
        .iter()
        .filter(|o| o.get("status").and_then(Value::as_str) == Some(status.as_ref()))
        .count()
    };

    Ok(DashboardSnapshot {
      summary,
      today: today_stat,
      chart_data,
      product_count: products.len(),
      pending_orders: count_status(OrderStatus::Pending),
      completed_orders: count_status(OrderStatus::Completed),
    })
  }

  /// Orders created within the last `period_days` days, with totals and a
  /// product ranking.
  pub async fn sales_report(&self, period_days: u32) -> Result<SalesReport> {
    // A period reaching past the representable range covers every order.
    let cutoff = Duration::try_days(period_days.into())
      .and_then(|span| self.clock.now().checked_sub_signed(span))
      .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut orders: Vec<(DateTime<Utc>, Value)> = self
      .collection(ResourceKind::Order)
      .await?
      .into_iter()
      .filter_map(|o| created_at(&o).map(|at| (at, o)))
      .filter(|(at, _)| *at >= cutoff)
      .collect();
    orders.sort_by(|a, b| b.0.cmp(&a.0));
    let orders: Vec<Value> = orders.into_iter().map(|(_, o)| o).collect();

    let total_sales: f64 = orders
      .iter()
      .map(|o| as_number(o.get("total")).unwrap_or(0.0))
      .sum();
    let average_order_value = if orders.is_empty() {
      0.0
    } else {
      total_sales / orders.len() as f64
    };

    let mut by_status = BTreeMap::new();
    for order in &orders {
      *by_status.entry(status_of(order)).or_insert(0) += 1;
    }

    Ok(SalesReport {
      period: format!("Last {period_days} days"),
      total_orders: orders.len(),
      total_sales,
      average_order_value,
      by_status,
      top_products: top_products(&orders),
      orders,
    })
  }

  pub async fn export(&self, kind: ExportKind) -> Result<ExportBundle> {
    let mut bundle = ExportBundle {
      products:    None,
      orders:      None,
      blog:        None,
      analytics:   None,
      exported_at: self.clock.now(),
      version:     EXPORT_VERSION,
    };

    if kind.includes(ExportKind::Products) {
      bundle.products = Some(self.collection(ResourceKind::Product).await?);
    }
    if kind.includes(ExportKind::Orders) {
      bundle.orders = Some(self.collection(ResourceKind::Order).await?);
    }
    if kind.includes(ExportKind::Blog) {
      bundle.blog = Some(self.collection(ResourceKind::Blog).await?);
    }
    if kind.includes(ExportKind::Analytics) {
      let days = trailing_days(self.clock.today(), EXPORT_ANALYTICS_DAYS + 1);
      bundle.analytics = Some(self.daily_stats(&days).await?.into_iter().flatten().collect());
    }

    Ok(bundle)
  }
}

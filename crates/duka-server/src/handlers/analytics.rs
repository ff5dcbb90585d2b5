//! Admin reports: dashboard, sales report and data export.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/analytics/dashboard` | Trailing 30-day summary |
//! | `GET`  | `/analytics/sales-report` | Optional `?period=<days>`, default 30 |
//! | `GET`  | `/export/{kind}` | `products\|orders\|blog\|analytics\|all` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use duka_core::{
  report::{DashboardSnapshot, ExportBundle, ExportKind, SalesReport},
  store::KeyValueStore,
};
use serde::Deserialize;

use crate::{AppState, auth::AdminUser, error::ApiError};

const DEFAULT_PERIOD_DAYS: u32 = 30;

/// `GET /analytics/dashboard`
pub async fn dashboard<S>(
  State(state): State<AppState<S>>,
  _: AdminUser,
) -> Result<Json<DashboardSnapshot>, ApiError>
where
  S: KeyValueStore + 'static,
{
  Ok(Json(state.reports.dashboard().await?))
}

#[derive(Debug, Deserialize)]
pub struct SalesParams {
  pub period: Option<String>,
}

fn parse_period(raw: Option<&str>) -> Result<u32, ApiError> {
  let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
    return Ok(DEFAULT_PERIOD_DAYS);
  };
  raw
    .parse::<u32>()
    .ok()
    .filter(|days| *days > 0)
    .ok_or_else(|| ApiError::BadRequest(format!("Invalid period: {raw}")))
}

/// `GET /analytics/sales-report[?period=<days>]`
pub async fn sales_report<S>(
  State(state): State<AppState<S>>,
  _: AdminUser,
  Query(params): Query<SalesParams>,
) -> Result<Json<SalesReport>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let days = parse_period(params.period.as_deref())?;
  Ok(Json(state.reports.sales_report(days).await?))
}

/// `GET /export/{kind}`
pub async fn export<S>(
  State(state): State<AppState<S>>,
  AdminUser(admin): AdminUser,
  Path(kind): Path<String>,
) -> Result<Json<ExportBundle>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let kind = kind
    .parse::<ExportKind>()
    .map_err(|_| ApiError::BadRequest(format!("Invalid export type: {kind}")))?;
  tracing::info!(%kind, by = %admin.email, "data export");
  Ok(Json(state.reports.export(kind).await?))
}

//! HTTP surface for the Duka storefront.
//!
//! Exposes an axum [`Router`] over any [`KeyValueStore`]: resource CRUD,
//! role-gated admin operations, analytics reports, checkout quotes and image
//! uploads.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod media;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, patch, post},
};
use duka_core::{
  access::AccessGate,
  checkout::MerchantContact,
  clock::Clock,
  report::AnalyticsReportBuilder,
  repository::Repository,
  store::KeyValueStore,
  tracker::EventTracker,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use handlers::{account, analytics, blog, categories, checkout, health, orders, products, uploads};
use identity::KvIdentityProvider;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `DUKA_*`
/// environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  /// Path every API route is nested under. Empty or `/` mounts at the root.
  pub api_prefix:           String,
  pub store_path:           PathBuf,
  pub media_dir:            PathBuf,
  pub session_ttl_hours:    i64,
  pub store_name:           String,
  pub whatsapp_number:      String,
  pub payment_instructions: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "127.0.0.1".to_owned(),
      port:                 8080,
      api_prefix:           "/api".to_owned(),
      store_path:           PathBuf::from("duka.db"),
      media_dir:            PathBuf::from("media"),
      session_ttl_hours:    168,
      store_name:           "Duka".to_owned(),
      whatsapp_number:      "254112327141".to_owned(),
      payment_instructions: "M-Pesa Paybill: 247247".to_owned(),
    }
  }
}

impl ServerConfig {
  pub fn merchant(&self) -> MerchantContact {
    MerchantContact {
      store_name:           self.store_name.clone(),
      whatsapp_number:      self.whatsapp_number.clone(),
      payment_instructions: self.payment_instructions.clone(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub clock:    Arc<dyn Clock>,
  pub identity: Arc<KvIdentityProvider<S>>,
  pub gate:     AccessGate<KvIdentityProvider<S>>,
  pub tracker:  EventTracker<S>,
  pub repo:     Arc<Repository<S>>,
  pub reports:  Arc<AnalyticsReportBuilder<S>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      config:   self.config.clone(),
      clock:    self.clock.clone(),
      identity: self.identity.clone(),
      gate:     self.gate.clone(),
      tracker:  self.tracker.clone(),
      repo:     self.repo.clone(),
      reports:  self.reports.clone(),
    }
  }
}

impl<S: KeyValueStore> AppState<S> {
  /// Wire every service to one store and one clock.
  pub fn new(store: Arc<S>, config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
    let identity = Arc::new(KvIdentityProvider::new(
      store.clone(),
      clock.clone(),
      chrono::Duration::hours(config.session_ttl_hours),
    ));
    let tracker = EventTracker::new(store.clone(), clock.clone());
    Self {
      gate: AccessGate::new(identity.clone(), clock.clone()),
      repo: Arc::new(Repository::new(store.clone(), tracker.clone(), clock.clone())),
      reports: Arc::new(AnalyticsReportBuilder::new(store.clone(), clock.clone())),
      config: Arc::new(config),
      store,
      clock,
      identity,
      tracker,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API routes without a prefix.
fn api_routes<S>() -> Router<AppState<S>>
where
  S: KeyValueStore + 'static,
{
  Router::new()
    // Accounts
    .route("/signup", post(account::signup::<S>))
    .route("/login", post(account::login::<S>))
    .route("/me", get(account::me::<S>))
    // Catalogue
    .route("/products", get(products::list::<S>).post(products::upsert::<S>))
    .route("/products/{id}", get(products::get_one::<S>).delete(products::remove::<S>))
    .route("/categories/{store}", get(categories::list::<S>).post(categories::replace::<S>))
    // Orders
    .route("/orders", get(orders::list::<S>).post(orders::create::<S>))
    .route("/orders/{id}", patch(orders::update::<S>))
    // Blog
    .route("/blog", get(blog::list::<S>).post(blog::upsert::<S>))
    .route("/blog/{id}", get(blog::get_one::<S>).delete(blog::remove::<S>))
    // Uploads
    .route("/upload-profile-picture", post(uploads::profile_picture::<S>))
    .route("/upload-image", post(uploads::image::<S>))
    // Checkout
    .route("/delivery/regions", get(checkout::regions))
    .route("/checkout/quote", post(checkout::quote::<S>))
    // Analytics
    .route("/analytics/dashboard", get(analytics::dashboard::<S>))
    .route("/analytics/sales-report", get(analytics::sales_report::<S>))
    .route("/export/{kind}", get(analytics::export::<S>))
    .route("/health", get(health::handler::<S>))
}

/// Build the full application [`Router`]: the API under the configured
/// prefix plus the media directory at `/media`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: KeyValueStore + 'static,
{
  let prefix = format!("/{}", state.config.api_prefix.trim_matches('/'));
  let api = api_routes::<S>().with_state(state.clone());
  let app = if prefix == "/" {
    Router::new().merge(api)
  } else {
    Router::new().nest(&prefix, api)
  };

  app
    .nest_service(media::MEDIA_ROUTE, ServeDir::new(&state.config.media_dir))
    // Room for a maximal image plus multipart framing; the media layer
    // enforces the exact limit with a readable error.
    .layer(DefaultBodyLimit::max(media::MAX_UPLOAD_BYTES + 64 * 1024))
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests;

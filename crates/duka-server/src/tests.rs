//! Router tests driven end to end through `tower::ServiceExt::oneshot`
//! against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use duka_core::{
  clock::MockClock,
  identity::{IdentityProvider as _, NewUser, Role},
};
use duka_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt as _;

use crate::{AppState, ServerConfig, router};

struct Harness {
  state:  AppState<SqliteStore>,
  clock:  Arc<MockClock>,
  _media: TempDir,
}

async fn make_state() -> Harness {
  let media = tempfile::tempdir().unwrap();
  let store = SqliteStore::open_in_memory().await.unwrap();
  let clock = Arc::new(MockClock::with_time(Utc::now()));
  let config = ServerConfig {
    media_dir: media.path().to_path_buf(),
    ..ServerConfig::default()
  };
  let state = AppState::new(Arc::new(store), config, clock.clone());
  Harness { state, clock, _media: media }
}

/// Register `email` with `role` and return a bearer token for it.
async fn token_for(state: &AppState<SqliteStore>, email: &str, role: Role) -> String {
  state
    .identity
    .create_user(NewUser {
      email:    email.to_owned(),
      password: "correct horse".to_owned(),
      name:     "Tester".to_owned(),
    })
    .await
    .unwrap();
  if role == Role::Admin {
    state.identity.set_role(email, Role::Admin).await.unwrap();
  }
  state
    .identity
    .issue_session(email, "correct horse")
    .await
    .unwrap()
    .unwrap()
    .token
}

async fn oneshot_raw(
  state:   AppState<SqliteStore>,
  method:  &str,
  uri:     &str,
  headers: Vec<(header::HeaderName, String)>,
  body:    Body,
) -> axum::response::Response {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = builder.body(body).unwrap();
  router(state).oneshot(req).await.unwrap()
}

/// Send an optional JSON body with an optional bearer token; returns the
/// status and the decoded JSON response.
async fn call(
  state:  &AppState<SqliteStore>,
  method: &str,
  uri:    &str,
  token:  Option<&str>,
  body:   Option<Value>,
) -> (StatusCode, Value) {
  let mut headers = Vec::new();
  if let Some(t) = token {
    headers.push((header::AUTHORIZATION, format!("Bearer {t}")));
  }
  let body = match body {
    Some(v) => {
      headers.push((header::CONTENT_TYPE, "application/json".to_owned()));
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = oneshot_raw(state.clone(), method, uri, headers, body).await;
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

fn product() -> Value {
  json!({ "name": "Silk robe", "price": 4500, "category": "robes", "store": "main" })
}

// ── Health ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_healthy() {
  let h = make_state().await;
  let (status, body) = call(&h.state, "GET", "/api/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "healthy");
  assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn empty_prefix_mounts_at_root() {
  let media = tempfile::tempdir().unwrap();
  let store = SqliteStore::open_in_memory().await.unwrap();
  let config = ServerConfig {
    api_prefix: "/".to_owned(),
    media_dir: media.path().to_path_buf(),
    ..ServerConfig::default()
  };
  let state = AppState::new(Arc::new(store), config, Arc::new(MockClock::with_time(Utc::now())));
  let (status, _) = call(&state, "GET", "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
}

// ── Access gate ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_route_without_token_is_401() {
  let h = make_state().await;
  let (status, body) = call(&h.state, "GET", "/api/orders", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn admin_route_with_unknown_token_is_401() {
  let h = make_state().await;
  let (status, _) = call(&h.state, "GET", "/api/orders", Some("bogus"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_route_as_user_is_403() {
  let h = make_state().await;
  let token = token_for(&h.state, "shopper@example.com", Role::User).await;
  let (status, body) =
    call(&h.state, "POST", "/api/products", Some(&token), Some(product())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "Forbidden: Admin privileges required");
}

#[tokio::test]
async fn denial_precedes_body_parsing() {
  let h = make_state().await;
  let resp = oneshot_raw(
    h.state.clone(),
    "POST",
    "/api/products",
    vec![(header::CONTENT_TYPE, "application/json".to_owned())],
    Body::from("{not json"),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_session_is_401() {
  let h = make_state().await;
  let token = token_for(&h.state, "owner@example.com", Role::Admin).await;
  h.clock.advance(Duration::hours(169));
  let (status, _) = call(&h.state, "GET", "/api/orders", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Accounts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn signup_login_me() {
  let h = make_state().await;
  let creds = json!({ "email": "jane@example.com", "password": "pw123456", "name": "Jane" });

  let (status, body) = call(&h.state, "POST", "/api/signup", None, Some(creds.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user"]["role"], "user");

  let (status, body) = call(&h.state, "POST", "/api/signup", None, Some(creds)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "User already exists");

  let (status, body) = call(
    &h.state,
    "POST",
    "/api/login",
    None,
    Some(json!({ "email": "jane@example.com", "password": "pw123456" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let token = body["token"].as_str().unwrap().to_owned();
  assert!(body["expiresAt"].is_string());

  let (status, body) = call(&h.state, "GET", "/api/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user"]["email"], "jane@example.com");

  let (_, dash) = {
    let admin = token_for(&h.state, "owner@example.com", Role::Admin).await;
    call(&h.state, "GET", "/api/analytics/dashboard", Some(&admin), None).await
  };
  assert_eq!(dash["today"]["signups"], 1);
}

#[tokio::test]
async fn signup_lists_missing_fields() {
  let h = make_state().await;
  let (status, body) =
    call(&h.state, "POST", "/api/signup", None, Some(json!({ "name": "Jane" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Missing required fields: email, password");
}

#[tokio::test]
async fn login_with_wrong_password_is_401() {
  let h = make_state().await;
  token_for(&h.state, "jane@example.com", Role::User).await;
  let (status, _) = call(
    &h.state,
    "POST",
    "/api/login",
    None,
    Some(json!({ "email": "jane@example.com", "password": "wrong" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Catalogue ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn product_missing_price_is_400() {
  let h = make_state().await;
  let admin = token_for(&h.state, "owner@example.com", Role::Admin).await;
  let mut doc = product();
  doc.as_object_mut().unwrap().remove("price");

  let (status, body) = call(&h.state, "POST", "/api/products", Some(&admin), Some(doc)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Missing required field: price");
}

#[tokio::test]
async fn product_crud_round_trip() {
  let h = make_state().await;
  let admin = token_for(&h.state, "owner@example.com", Role::Admin).await;

  let (status, body) =
    call(&h.state, "POST", "/api/products", Some(&admin), Some(product())).await;
  assert_eq!(status, StatusCode::OK);
  let id = body["id"].as_str().unwrap().to_owned();
  assert!(id.starts_with("products:main:"));

  let (_, listed) = call(&h.state, "GET", "/api/products?store=main", None, None).await;
  assert_eq!(listed["products"].as_array().unwrap().len(), 1);
  let (_, other) = call(&h.state, "GET", "/api/products?store=lingerie", None, None).await;
  assert!(other["products"].as_array().unwrap().is_empty());

  let (status, got) = call(&h.state, "GET", &format!("/api/products/{id}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(got["product"]["name"], "Silk robe");

  let (status, _) =
    call(&h.state, "DELETE", &format!("/api/products/{id}"), Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, body) = call(&h.state, "GET", &format!("/api/products/{id}"), None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "Product not found");
}

#[tokio::test]
async fn categories_replace_and_read() {
  let h = make_state().await;
  let admin = token_for(&h.state, "owner@example.com", Role::Admin).await;

  let (_, empty) = call(&h.state, "GET", "/api/categories/main", None, None).await;
  assert_eq!(empty["categories"], json!([]));

  let cats = json!({ "categories": ["robes", "sets"] });
  let (status, _) =
    call(&h.state, "POST", "/api/categories/main", Some(&admin), Some(cats)).await;
  assert_eq!(status, StatusCode::OK);

  let (_, got) = call(&h.state, "GET", "/api/categories/main", None, None).await;
  assert_eq!(got["categories"], json!(["robes", "sets"]));
}

#[tokio::test]
async fn blog_title_is_escaped() {
  let h = make_state().await;
  let admin = token_for(&h.state, "owner@example.com", Role::Admin).await;
  let post = json!({ "title": "<script>alert(1)</script>", "content": "x", "category": "news" });

  let (_, body) = call(&h.state, "POST", "/api/blog", Some(&admin), Some(post)).await;
  let id = body["id"].as_str().unwrap().to_owned();
  let suffix = id.trim_start_matches("blog:");

  let (status, got) = call(&h.state, "GET", &format!("/api/blog/{suffix}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  let title = got["post"]["title"].as_str().unwrap();
  assert!(!title.contains('<') && !title.contains('>'));
}

// ── Orders and analytics ─────────────────────────────────────────────────────

#[tokio::test]
async fn order_flows_into_admin_list_and_dashboard() {
  let h = make_state().await;
  let admin = token_for(&h.state, "owner@example.com", Role::Admin).await;
  let order = json!({ "customerName": "Jane", "phone": "+254700000000", "total": 5000 });

  let (status, body) = call(&h.state, "POST", "/api/orders", None, Some(order)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["success"], true);
  let order_id = body["orderId"].as_str().unwrap().to_owned();

  let (_, listed) = call(&h.state, "GET", "/api/orders", Some(&admin), None).await;
  let orders = listed["orders"].as_array().unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0]["status"], "pending");

  let (_, dash) = call(&h.state, "GET", "/api/analytics/dashboard", Some(&admin), None).await;
  assert_eq!(dash["today"]["orders"], 1);
  assert_eq!(dash["today"]["revenue"], 5000.0);
  assert_eq!(dash["pendingOrders"], 1);

  let (status, patched) = call(
    &h.state,
    "PATCH",
    &format!("/api/orders/{order_id}"),
    Some(&admin),
    Some(json!({ "status": "delivered" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(patched["order"]["status"], "delivered");

  let (status, _) = call(
    &h.state,
    "PATCH",
    &format!("/api/orders/{order_id}"),
    Some(&admin),
    Some(json!({ "status": "lost" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sales_report_rejects_bad_period() {
  let h = make_state().await;
  let admin = token_for(&h.state, "owner@example.com", Role::Admin).await;

  let (status, body) =
    call(&h.state, "GET", "/api/analytics/sales-report", Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["period"], "Last 30 days");

  let (status, _) = call(
    &h.state,
    "GET",
    "/api/analytics/sales-report?period=abc",
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call(
    &h.state,
    "GET",
    "/api/analytics/sales-report?period=100000000",
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["totalOrders"], 0);
}

#[tokio::test]
async fn export_sections_follow_kind() {
  let h = make_state().await;
  let admin = token_for(&h.state, "owner@example.com", Role::Admin).await;

  let (status, body) = call(&h.state, "GET", "/api/export/products", Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(body.get("products").is_some());
  assert!(body.get("orders").is_none());
  assert_eq!(body["version"], "1.0");

  let (status, _) = call(&h.state, "GET", "/api/export/users", Some(&admin), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Checkout ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn quote_returns_whatsapp_link() {
  let h = make_state().await;
  let req = json!({
    "productName": "Silk robe",
    "price": 4500,
    "region": "Pickup Shelf",
    "customerName": "Jane",
    "phone": "+254700000000",
  });
  let (status, body) = call(&h.state, "POST", "/api/checkout/quote", None, Some(req)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["deliveryFee"], 0);
  assert!(body["whatsappUrl"].as_str().unwrap().starts_with("https://wa.me/254112327141"));

  let (_, regions) = call(&h.state, "GET", "/api/delivery/regions", None, None).await;
  assert!(!regions["areas"].as_array().unwrap().is_empty());
}

// ── Uploads ──────────────────────────────────────────────────────────────────

const BOUNDARY: &str = "duka-test-boundary";

fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Body {
  let mut out = Vec::new();
  for (name, value) in fields {
    out.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
      )
      .as_bytes(),
    );
  }
  if let Some((file_name, content_type, bytes)) = file {
    out.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
         filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
      )
      .as_bytes(),
    );
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\r\n");
  }
  out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
  Body::from(out)
}

async fn upload(
  state: &AppState<SqliteStore>,
  uri: &str,
  token: &str,
  body: Body,
) -> (StatusCode, Value) {
  let resp = oneshot_raw(
    state.clone(),
    "POST",
    uri,
    vec![
      (header::AUTHORIZATION, format!("Bearer {token}")),
      (header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}")),
    ],
    body,
  )
  .await;
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn admin_image_upload_is_served() {
  let h = make_state().await;
  let admin = token_for(&h.state, "owner@example.com", Role::Admin).await;

  let body = multipart(&[("type", "product")], Some(("robe.png", "image/png", &b"\x89PNG"[..])));
  let (status, json) = upload(&h.state, "/api/upload-image", &admin, body).await;
  assert_eq!(status, StatusCode::OK);
  let url = json["url"].as_str().unwrap().to_owned();
  assert!(url.starts_with("/media/product-") && url.ends_with(".png"));

  let resp = oneshot_raw(h.state.clone(), "GET", &url, vec![], Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  assert_eq!(&bytes[..], b"\x89PNG");
}

#[tokio::test]
async fn non_image_upload_is_400() {
  let h = make_state().await;
  let admin = token_for(&h.state, "owner@example.com", Role::Admin).await;
  let body = multipart(&[], Some(("notes.txt", "text/plain", &b"hello"[..])));
  let (status, json) = upload(&h.state, "/api/upload-image", &admin, body).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(json["error"], "Only image files allowed");
}

#[tokio::test]
async fn svg_profile_picture_is_refused() {
  let h = make_state().await;
  let token = token_for(&h.state, "jane@example.com", Role::User).await;
  let me = h.state.gate.require_user(Some(&token)).await.unwrap();
  let id = me.id.to_string();
  let svg = &b"<svg><script>alert(document.cookie)</script></svg>"[..];
  let body = multipart(&[("userId", id.as_str())], Some(("me.svg", "image/svg+xml", svg)));
  let (status, json) = upload(&h.state, "/api/upload-profile-picture", &token, body).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(json["error"], "SVG images are not allowed");

  let stored = std::fs::read_dir(&h.state.config.media_dir)
    .map(|entries| entries.count())
    .unwrap_or(0);
  assert_eq!(stored, 0);
}

#[tokio::test]
async fn profile_picture_for_someone_else_is_403() {
  let h = make_state().await;
  let token = token_for(&h.state, "jane@example.com", Role::User).await;
  let other = uuid::Uuid::new_v4().to_string();
  let body = multipart(&[("userId", other.as_str())], Some(("me.jpg", "image/jpeg", &b"jpg"[..])));
  let (status, json) = upload(&h.state, "/api/upload-profile-picture", &token, body).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(json["error"], "Can only upload your own profile picture");
}

#[tokio::test]
async fn own_profile_picture_is_stored() {
  let h = make_state().await;
  let token = token_for(&h.state, "jane@example.com", Role::User).await;
  let me = h.state.gate.require_user(Some(&token)).await.unwrap();
  let id = me.id.to_string();
  let body = multipart(&[("userId", id.as_str())], Some(("me.jpg", "image/jpeg", &b"jpg"[..])));
  let (status, json) = upload(&h.state, "/api/upload-profile-picture", &token, body).await;
  assert_eq!(status, StatusCode::OK);
  assert!(json["url"].as_str().unwrap().starts_with(&format!("/media/profile-{id}-")));
}

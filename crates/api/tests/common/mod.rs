#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use tower::ServiceExt;
use vitals_core::aggregate::PageCwvStatus;
use vitals_core::sample::Batch;
use vitals_core::types::Timestamp;
use vitals_db::{CwvStore, MemoryCwvStore, StoreError};

use vitals_api::auth::jwt::{Claims, JwtConfig};
use vitals_api::config::{ServerConfig, StorageBackend};
use vitals_api::router::build_app_router;
use vitals_api::state::AppState;

pub const TEST_JWT_SECRET: &str = "test-secret-for-integration-tests";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:8080".to_string()],
        request_timeout_secs: 30,
        max_batch_size: 100,
        storage: StorageBackend::Memory,
        retention_days: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
        },
    }
}

/// Build the full application router over the given store, using the same
/// middleware stack as production.
pub fn build_test_app(store: Arc<dyn CwvStore>) -> Router {
    build_test_app_with_config(store, test_config())
}

pub fn build_test_app_with_config(store: Arc<dyn CwvStore>, config: ServerConfig) -> Router {
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Router over a fresh in-memory store, returning the store for inspection.
pub fn memory_app() -> (Router, Arc<MemoryCwvStore>) {
    let store = Arc::new(MemoryCwvStore::new());
    (build_test_app(store.clone()), store)
}

/// Access token for a user with the given role, signed the way the host does.
pub fn token_for(role: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: "user-1".to_string(),
        role: role.to_string(),
        exp: now + 15 * 60,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("token encoding")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, "application/json", body.to_string()).await
}

/// POST with an explicit content type, as beacon senders use `text/plain`.
pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: &str,
    body: impl Into<String>,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body.into()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

// ---------------------------------------------------------------------------
// Payload builders
// ---------------------------------------------------------------------------

/// One collector-shaped metric object.
pub fn metric(name: &str, value: f64, page_id: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "value": value,
        "rating": "good",
        "delta": value,
        "id": format!("v4-{name}-{page_id}"),
        "pageId": page_id,
        "siteId": "site-1",
        "deviceType": "desktop",
        "connectionType": {
            "effectiveType": "4g",
            "downlink": 10.0,
            "rtt": 50.0,
            "saveData": false
        },
        "timestamp": 1_760_400_000_000_i64,
        "url": format!("https://example.com/{page_id}"),
        "navigationType": "navigate"
    })
}

pub fn batch(metrics: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({
        "metrics": metrics,
        "meta": {
            "userAgent": "Mozilla/5.0 (test)",
            "viewport": { "width": 1280, "height": 800 },
            "screen": { "width": 1920, "height": 1080 }
        }
    })
}

// ---------------------------------------------------------------------------
// Failing store
// ---------------------------------------------------------------------------

/// A store whose every operation fails, for error-path tests.
pub struct FailingStore;

#[async_trait]
impl CwvStore for FailingStore {
    async fn record_batch(&self, _batch: &Batch) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable(
            "connection refused: postgres://admin:hunter2@db:5432".into(),
        ))
    }

    async fn page_status(&self, _page_id: &str) -> Result<Option<PageCwvStatus>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn purge_samples_older_than(&self, _cutoff: Timestamp) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

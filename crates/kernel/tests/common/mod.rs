#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Every test builds its own [`TestApp`] over a fresh in-memory storage, so
//! tests are independent and need no database. [`TestApp::postgres`] runs
//! the same services against PostgreSQL when `DATABASE_URL` is set.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use quill_kernel::config::Config;
use quill_kernel::routes;
use quill_kernel::state::AppState;
use quill_kernel::storage::{MemoryStorage, PgStorage, Storage};
use tokio::sync::{Mutex, MutexGuard};

/// Serializes tests sharing the PostgreSQL database. Built-in plugin sync
/// inserts fixed names, so two apps starting at once would collide.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

/// Test application: real services and router over in-memory storage.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    _db_lock: Option<MutexGuard<'static, ()>>,
}

impl TestApp {
    /// Create a new test application with default configuration.
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Create a new test application with the given configuration.
    pub async fn with_config(config: Config) -> Self {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        Self::with_storage(storage, &config, None).await
    }

    /// Create a test application over PostgreSQL, or `None` when
    /// `DATABASE_URL` is not set.
    ///
    /// The database is shared and not reset: tests must use unique names.
    pub async fn postgres() -> Option<Self> {
        let url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.is_empty())?;
        let guard = DB_LOCK.lock().await;

        let config = Config {
            database_url: Some(url),
            database_max_connections: 2,
            ..Config::default()
        };
        let storage = PgStorage::connect(&config)
            .await
            .expect("Failed to connect to PostgreSQL");
        storage.migrate().await.expect("Failed to run migrations");

        Some(Self::with_storage(Arc::new(storage), &config, Some(guard)).await)
    }

    async fn with_storage(
        storage: Arc<dyn Storage>,
        config: &Config,
        db_lock: Option<MutexGuard<'static, ()>>,
    ) -> Self {
        let state = AppState::with_storage(storage, config)
            .await
            .expect("Failed to build application state");
        let router = routes::router(state.clone());
        Self {
            state,
            router,
            _db_lock: db_lock,
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Send a request and decode the JSON response body (`Null` if empty).
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.request(request).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        // Extractor rejections answer in plain text
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Create a resource and return its id, asserting 201 Created.
    pub async fn create(&self, uri: &str, body: Value) -> uuid::Uuid {
        let (status, json) = self.post(uri, body).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
        json["id"].as_str().unwrap().parse().unwrap()
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use fluxbox_core::config::{AuthMode, Config, StorageConfig};
use fluxbox_duckdb::DuckDbBackend;
use fluxbox_server::accounts::DuckDbAccountStore;
use fluxbox_server::app::build_app;
use fluxbox_server::payments::{PaymentGateway, SimulatedPaymentGateway};
use fluxbox_server::state::AppState;
use fluxbox_storage::{MemoryBackend, ObjectStore, StorageHandles};

pub const MB: u64 = 1024 * 1024;
pub const USER_HEADER: &str = "x-user-id";
pub const JWT_SECRET: &str = "test-secret";

pub fn test_config(auth_mode: AuthMode) -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/fluxbox-test".to_string(),
        duckdb_memory_limit: "256MB".to_string(),
        auth_mode,
        storage: StorageConfig::Memory {
            bucket: "fluxbox".to_string(),
        },
        upload_url_ttl_secs: 3600,
        strict_quota: true,
        cors_origins: vec![],
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: Arc<AppState>,
    pub backend: Arc<MemoryBackend>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(
            test_config(AuthMode::TrustedHeader(USER_HEADER.to_string())),
            Arc::new(SimulatedPaymentGateway),
        )
    }

    pub fn with(config: Config, payments: Arc<dyn PaymentGateway>) -> Self {
        let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
        let accounts = Arc::new(DuckDbAccountStore::new(Arc::new(db)));
        let backend = Arc::new(MemoryBackend::new("fluxbox"));
        let state = Arc::new(AppState::new(
            config,
            accounts,
            StorageHandles::from_backend(Arc::clone(&backend)),
            payments,
        ));
        Self {
            app: build_app(Arc::clone(&state)),
            state,
            backend,
        }
    }

    pub async fn seed(&self, key: &str, size: u64) {
        let len = usize::try_from(size).expect("size");
        self.backend
            .put(key, Bytes::from(vec![0u8; len]), None)
            .await
            .expect("seed object");
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.expect("request")
    }

    pub async fn get(&self, user: &str, uri: &str) -> Response<Body> {
        self.send(as_user(user, "GET", uri, Body::empty())).await
    }

    pub async fn delete(&self, user: &str, uri: &str) -> Response<Body> {
        self.send(as_user(user, "DELETE", uri, Body::empty())).await
    }

    pub async fn post_json(&self, user: &str, uri: &str, body: Value) -> Response<Body> {
        self.send(as_user(user, "POST", uri, Body::from(body.to_string())))
            .await
    }
}

pub fn as_user(user: &str, method: &str, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_HEADER, user)
        .header("content-type", "application/json")
        .body(body)
        .expect("build request")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

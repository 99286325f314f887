//! Server test utilities.

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use wisp_core::config::{AppConfig, MetadataConfig, StorageConfig};
use wisp_metadata::WishStore;
use wisp_server::{AppState, create_router};
use wisp_storage::MediaStore;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server with temp-dir storage and test defaults
    /// (rate limiting off, sweep scheduler off).
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("failed to create temp directory");

        let mut config = AppConfig::for_testing();
        config.storage = StorageConfig::Filesystem {
            path: temp_dir.path().join("media"),
        };
        config.metadata = MetadataConfig::Sqlite {
            path: temp_dir.path().join("wisp.db"),
        };
        modifier(&mut config);

        let storage = wisp_storage::from_config(&config.storage)
            .await
            .expect("failed to create media storage");
        let metadata = wisp_metadata::from_config(&config.metadata)
            .await
            .expect("failed to create wish store");

        let state = AppState::new(config, storage, metadata);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying wish store.
    pub fn metadata(&self) -> Arc<dyn WishStore> {
        self.state.metadata.clone()
    }

    /// Get access to the underlying media storage.
    pub fn storage(&self) -> Arc<dyn MediaStore> {
        self.state.storage.clone()
    }
}

/// Make a JSON request from the default test client IP.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    json_request_from_ip(router, method, uri, body, [127, 0, 0, 1]).await
}

/// Make a JSON request with an explicit client IP (for rate limit tests).
#[allow(dead_code)]
pub async fn json_request_from_ip(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    ip: [u8; 4],
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        // oneshot never goes through a real listener, so inject the
        // connection info the IP extraction expects.
        .extension(ConnectInfo(SocketAddr::from((ip, 40000))));

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

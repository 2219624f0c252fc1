//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling API tests without decoding real
//! images or sampling the real host.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use pixbatch_core::{
    testing::{MockMetricsSource, MockTransformer},
    ArtifactReleaser, Config, ImageTransformer, ItemStore, MetricsSource, ProcessingOrchestrator,
    ProcessorConfig, ResourceSampler, SamplerConfig, TempArtifactStore, Transformer,
};

/// Re-export fixtures for test convenience
pub use pixbatch_core::testing::fixtures;

const BOUNDARY: &str = "pixbatch-test-boundary";

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_upload() {
///     let fixture = TestFixture::new();
///     let response = fixture.upload(&[("a.png", b"...".to_vec())]).await;
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock transformer (absent when the real image transformer is used)
    pub transformer: Option<Arc<MockTransformer>>,
    /// Mock metrics source - script host load
    pub metrics: Arc<MockMetricsSource>,
    pub store: Arc<ItemStore>,
    pub orchestrator: Arc<ProcessingOrchestrator>,
    pub artifacts: Arc<TempArtifactStore>,
    /// Temporary directory for artifacts
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub raw: Vec<u8>,
    pub content_type: Option<String>,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Use the real image transformer instead of the mock
    pub real_transformer: bool,
    /// Worker cap
    pub max_workers: Option<usize>,
}

impl TestConfig {
    pub fn with_real_transformer() -> Self {
        Self {
            real_transformer: true,
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.server.port = 0; // Not used for in-process testing
        config.processor = ProcessorConfig {
            temp_dir: temp_dir.path().join("artifacts"),
            max_workers: test_config.max_workers,
            cleanup_on_shutdown: true,
            preview_url: Some(pixbatch_server::api::ARTIFACT_URL.to_string()),
        };
        config.sampler = SamplerConfig::default().with_fallback_core_count(8);

        let artifacts = Arc::new(
            TempArtifactStore::new(config.processor.temp_dir.clone())
                .expect("Failed to create artifact store"),
        );
        let releaser = Arc::clone(&artifacts) as Arc<dyn ArtifactReleaser>;
        let store = Arc::new(ItemStore::with_pipeline(
            Arc::clone(&releaser),
            config.pipeline.clone(),
        ));

        let metrics = Arc::new(MockMetricsSource::new());
        let sampler = Arc::new(ResourceSampler::new(
            config.sampler.clone(),
            Arc::clone(&metrics) as Arc<dyn MetricsSource>,
        ));

        let (transformer, mock): (Arc<dyn Transformer>, Option<Arc<MockTransformer>>) =
            if test_config.real_transformer {
                (Arc::new(ImageTransformer::new(Arc::clone(&artifacts))), None)
            } else {
                let mock = Arc::new(MockTransformer::new());
                (Arc::clone(&mock) as Arc<dyn Transformer>, Some(mock))
            };

        let orchestrator = Arc::new(ProcessingOrchestrator::new(
            config.processor.clone(),
            Arc::clone(&store),
            transformer,
            releaser,
            Arc::clone(&sampler),
        ));

        let state = Arc::new(pixbatch_server::state::AppState::new(
            config,
            Arc::clone(&store),
            Arc::clone(&orchestrator),
            sampler,
            Arc::clone(&artifacts),
        ));

        let router = pixbatch_server::api::create_router(state);

        Self {
            router,
            transformer: mock,
            metrics,
            store,
            orchestrator,
            artifacts,
            temp_dir,
        }
    }

    /// The mock transformer; panics for fixtures built on the real one.
    pub fn mock(&self) -> &MockTransformer {
        self.transformer
            .as_deref()
            .expect("fixture uses the real transformer")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PATCH request with JSON body.
    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Upload files as one multipart request to `/api/v1/items`.
    pub async fn upload(&self, files: &[(&str, Vec<u8>)]) -> TestResponse {
        let mut body = Vec::new();
        for (name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/items")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    /// Upload `n` placeholder images and return their ids.
    pub async fn upload_images(&self, n: usize) -> Vec<String> {
        let files: Vec<(String, Vec<u8>)> = (0..n)
            .map(|i| (format!("image-{i}.png"), fixtures::image_bytes(i)))
            .collect();
        let files: Vec<(&str, Vec<u8>)> = files
            .iter()
            .map(|(name, data)| (name.as_str(), data.clone()))
            .collect();

        let response = self.upload(&files).await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["ids"]
            .as_array()
            .expect("ids array")
            .iter()
            .map(|id| id.as_str().expect("id string").to_string())
            .collect()
    }

    /// Poll the run status until the orchestrator is idle.
    pub async fn wait_until_idle(&self) {
        for _ in 0..200 {
            let status = self.get("/api/v1/runs/status").await;
            if status.body["busy"] == Value::Bool(false) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("orchestrator did not become idle");
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            body,
            raw: body_bytes.to_vec(),
            content_type,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}

//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock collaborators injected, so sessions run end to end without
//! Spotify, yt-dlp or network access.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use mixtape_core::{
    testing::{MockCoverFetcher, MockMediaFetcher, MockPlaylistProvider, MockTagWriter},
    Config, OrchestratorConfig, ServerConfig, SessionOrchestrator, TrackProcessor, TrackResolver,
    ZipArchiver,
};
use mixtape_server::state::AppState;

/// Re-export fixtures for test convenience
pub use mixtape_core::testing::fixtures;

/// Test fixture with mock collaborators.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_session_creation() {
///     let fixture = TestFixture::new().await;
///     fixture.provider.set_tracks("pl", fixtures::tracks(2)).await;
///
///     let response = fixture.post("/api/v1/sessions", json!({
///         "playlist_url": fixtures::playlist_url("pl")
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// The orchestrator behind the router
    pub orchestrator: Arc<SessionOrchestrator>,
    /// Mock metadata provider - configure playlists
    pub provider: Arc<MockPlaylistProvider>,
    /// Mock audio fetcher - make queries fail
    pub fetcher: Arc<MockMediaFetcher>,
    /// Temporary downloads directory
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Raw response, for non-JSON bodies
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Bytes,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let provider = Arc::new(MockPlaylistProvider::new());
        provider.set_configured(test_config.provider_configured);
        let fetcher = Arc::new(MockMediaFetcher::new());

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            orchestrator: OrchestratorConfig {
                downloads_dir: temp_dir.path().to_path_buf(),
                retention_ms: test_config.retention_ms,
                ..Default::default()
            },
            ..Default::default()
        };

        let orchestrator = Arc::new(SessionOrchestrator::new(
            config.orchestrator.clone(),
            TrackResolver::new(Arc::clone(&provider) as Arc<dyn mixtape_core::PlaylistProvider>),
            TrackProcessor::new(
                Arc::clone(&fetcher) as Arc<dyn mixtape_core::MediaFetcher>,
                Arc::new(MockCoverFetcher::new()),
                Arc::new(MockTagWriter::new()),
            ),
            Arc::new(ZipArchiver::new()),
        ));

        let state = Arc::new(AppState::new(config, Arc::clone(&orchestrator)));
        let router = mixtape_server::api::create_router(state);

        Self {
            router,
            orchestrator,
            provider,
            fetcher,
            temp_dir,
        }
    }

    /// Serve the router on an ephemeral local port.
    pub async fn serve(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("local addr");
        let router = self.router.clone();

        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        addr
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body and custom content type.
    pub async fn post_with_content_type(
        &self,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    /// Send a POST request with no body and no content type.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a GET request and keep the raw body.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        RawResponse {
            status,
            headers,
            bytes,
        }
    }

    /// Start a session through the API and return its id.
    pub async fn start_session(&self, playlist_id: &str) -> String {
        let response = self
            .post(
                "/api/v1/sessions",
                serde_json::json!({ "playlist_url": fixtures::playlist_url(playlist_id) }),
            )
            .await;
        assert_eq!(response.status, StatusCode::ACCEPTED, "{:?}", response.body);
        response.body["session_id"]
            .as_str()
            .expect("session_id")
            .to_string()
    }

    /// Poll the status endpoint until the session is terminal.
    pub async fn wait_for_terminal(&self, session_id: &str) -> Value {
        let path = format!("/api/v1/sessions/{}", session_id);
        for _ in 0..250 {
            let response = self.get(&path).await;
            if response.status == StatusCode::OK {
                let status = response.body["status"].as_str().unwrap_or_default();
                if status == "complete" || status == "failed" {
                    return response.body;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("session {} did not finish", session_id);
    }

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

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Whether the mock provider reports credentials
    pub provider_configured: bool,
    /// Retention window for finished sessions
    pub retention_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            provider_configured: true,
            retention_ms: 60_000,
        }
    }
}

impl TestConfig {
    /// Create config whose provider has no credentials.
    pub fn unconfigured() -> Self {
        Self {
            provider_configured: false,
            ..Default::default()
        }
    }

    /// Create config with a short retention window.
    pub fn with_retention_ms(retention_ms: u64) -> Self {
        Self {
            retention_ms,
            ..Default::default()
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

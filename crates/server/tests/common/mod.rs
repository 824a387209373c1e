//! Common test utilities for API testing with mocks.
//!
//! The fixture builds the real router over a scheduler whose catalog,
//! store and translator are all mocks, so no network or arXiv access is
//! needed.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use harvester_core::{
    load_config_from_str,
    testing::{MockArticleStore, MockCatalog, MockTranslator},
    ApiKeyGuard, PipelineOrchestrator, Scheduler, TranslationService,
};
use harvester_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use harvester_core::testing::fixtures;

/// Secret used by fixtures created with [`TestFixture::with_api_key`].
pub const TEST_API_KEY: &str = "test-secret-key";

/// Test fixture for API tests with mock dependencies.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock catalog - configure fetch results per query
    pub catalog: Arc<MockCatalog>,
    /// Mock store - inspect committed rows
    pub store: Arc<MockArticleStore>,
    /// Mock translator
    pub translator: Arc<MockTranslator>,
    /// Scheduler behind the router (never started)
    pub scheduler: Arc<Scheduler>,
    /// Keeps the configured database path valid for the test's lifetime
    pub temp_dir: TempDir,
    api_key: Option<String>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a fixture with authentication disabled.
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Create a fixture that requires [`TEST_API_KEY`].
    pub async fn with_api_key() -> Self {
        Self::build(Some(TEST_API_KEY)).await
    }

    async fn build(api_key: Option<&str>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = match api_key {
            Some(key) => format!("method = \"api_key\"\napi_key = \"{}\"", key),
            None => "method = \"none\"".to_string(),
        };
        let toml = format!(
            r#"
[auth]
{auth}

[database]
path = "{db}"

[catalog]
categories = [
    {{ category = "cs.AI", table = "cs_ai" }},
    {{ category = "cs.CL", table = "cs_cl" }},
]

[translator]
api_key = "sk-should-never-leak"

[schedule]
run_on_start = false
"#,
            auth = auth,
            db = db_path.display()
        );
        let config = load_config_from_str(&toml).expect("Failed to parse test config");

        let catalog = Arc::new(MockCatalog::new());
        let store = Arc::new(MockArticleStore::new());
        let translator = Arc::new(MockTranslator::new());
        let translation = Arc::new(TranslationService::from_config(
            translator.clone(),
            &config.translator,
        ));
        let orchestrator = Arc::new(PipelineOrchestrator::from_config(
            &config.catalog,
            catalog.clone(),
            store.clone(),
            store.clone(),
            translation,
        ));
        let scheduler = Arc::new(Scheduler::new(orchestrator, &config.schedule));
        let guard = ApiKeyGuard::from_config(&config.auth).expect("Failed to create guard");

        let state = Arc::new(AppState::new(
            Arc::new(config),
            guard,
            Arc::clone(&scheduler),
        ));
        let router = create_router(state);

        Self {
            router,
            catalog,
            store,
            translator,
            scheduler,
            temp_dir,
            api_key: api_key.map(str::to_string),
        }
    }

    /// Send an authenticated GET request (when the fixture has a key).
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, self.api_key.as_deref()).await
    }

    /// Send an authenticated POST request (when the fixture has a key).
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path, self.api_key.as_deref()).await
    }

    /// Send a GET request with an explicit bearer token, or none.
    pub async fn get_with_key(&self, path: &str, key: Option<&str>) -> TestResponse {
        self.request("GET", path, key).await
    }

    /// Send a GET request with the key in the `X-API-Key` header.
    pub async fn get_with_header_key(&self, path: &str, key: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header("X-API-Key", key)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn request(&self, method: &str, path: &str, key: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(key) = key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        let request = builder.body(Body::empty()).unwrap();
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

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

//! Test application setup utilities
//!
//! Provides utilities for setting up test instances of the application,
//! each on its own temporary SQLite database.

use axum::{body::Body, http::Request, Router};
use tower::ServiceExt;
use uuid::Uuid;

use raktar::{
    api,
    config::{AppConfig, AuditConfig, DatabaseConfig, LoggingConfig, ServerConfig},
    db,
    middleware::ACTOR_HEADER,
    AppState,
};

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application with a fresh database
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a new test application with custom configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let state = AppState { config, db };

        let router = Router::new()
            .nest("/api/v1", api::routes())
            .with_state(state.clone());

        Self { router, state }
    }

    /// Make a GET request to the test application
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.request(json_request("POST", uri, &body)).await
    }

    /// Make a PUT request with JSON body
    pub async fn put_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.request(json_request("PUT", uri, &body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a POST request on behalf of a user
    pub async fn post_json_as(
        &self,
        user_id: impl ToString,
        uri: &str,
        body: serde_json::Value,
    ) -> TestResponse {
        self.request_as(user_id, json_request("POST", uri, &body))
            .await
    }

    /// Make a PUT request on behalf of a user
    pub async fn put_json_as(
        &self,
        user_id: impl ToString,
        uri: &str,
        body: serde_json::Value,
    ) -> TestResponse {
        self.request_as(user_id, json_request("PUT", uri, &body))
            .await
    }

    /// Make a request carrying the acting user header
    pub async fn request_as(&self, user_id: impl ToString, request: Request<Body>) -> TestResponse {
        let (mut parts, body) = request.into_parts();
        parts
            .headers
            .insert(ACTOR_HEADER, user_id.to_string().parse().unwrap());
        self.request(Request::from_parts(parts, body)).await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// Assert the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    /// Assert the response status is Created (201)
    pub fn assert_created(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CREATED)
    }

    /// Assert the response status is No Content (204)
    pub fn assert_no_content(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NO_CONTENT)
    }

    /// Assert the response status is Bad Request (400)
    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::BAD_REQUEST)
    }

    /// Assert the response status is Forbidden (403)
    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::FORBIDDEN)
    }

    /// Assert the response status is Not Found (404)
    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }

    /// Assert the response status is Conflict (409)
    pub fn assert_conflict(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CONFLICT)
    }
}

/// Create a test configuration with temporary SQLite database
pub fn test_config() -> AppConfig {
    // Use a unique temp file for each test to avoid conflicts
    let db_path = std::env::temp_dir().join(format!(
        "raktar_test_{}.db",
        Uuid::new_v4().to_string().replace('-', "")
    ));

    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            static_dir: None,
            serve_frontend: false,
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", db_path.display()),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig::default(),
        audit: AuditConfig::default(),
        bootstrap_admin: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_creation() {
        let app = TestApp::new().await;
        assert_eq!(app.state.config.audit.max_results, 500);
    }

    #[tokio::test]
    async fn test_response_json_parsing() {
        let app = TestApp::new().await;
        let response = app.get("/api/v1/health").await;
        let json: serde_json::Value = response.json();
        assert!(json.get("status").is_some());
    }
}

//! Test utilities for integration tests.
//!
//! Every test builds a router over a shared [`MemoryStore`], seeds fixtures
//! straight into the store and drives requests through `oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value as Json;
use tower::ServiceExt;

use rally_api::store::{Fields, Value};
use rally_api::{
    create_router, DocPath, HmacTokenVerifier, MemoryStore, RaceService, RouterConfig,
};

/// Secret shared by the router and the tokens minted in tests.
pub const TEST_SECRET: &str = "integration-test-secret";

// =============================================================================
// Test Application
// =============================================================================

/// A router plus direct access to the store behind it.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
    verifier: HmacTokenVerifier,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::new().with_tracing(false))
    }

    pub fn with_config(config: RouterConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let verifier = HmacTokenVerifier::new(TEST_SECRET).unwrap();
        let router = create_router(
            RaceService::new(Arc::clone(&store)),
            Arc::new(verifier.clone()),
            config,
        );
        Self {
            store,
            router,
            verifier,
        }
    }

    /// A valid token for `uid`.
    pub fn token(&self, uid: &str) -> String {
        self.verifier.issue(uid, Duration::from_secs(300))
    }

    /// Store a document given as a JSON object.
    pub async fn seed(&self, path: DocPath, fields: Json) {
        self.store.insert(path, json_fields(&fields)).await;
    }

    /// Send a request with a valid bearer token.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Json>) -> TestResponse {
        let token = self.token("staff-1");
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token));

        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.call(request.body(body).unwrap()).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    /// Send an arbitrary prepared request.
    pub async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        TestResponse::from_response(response).await
    }
}

/// Convert a JSON object into stored fields.
pub fn json_fields(json: &Json) -> Fields {
    match Value::from_json(json) {
        Value::Map(fields) => fields,
        other => panic!("fixture must be a JSON object, got {:?}", other),
    }
}

// =============================================================================
// Responses
// =============================================================================

/// A fully buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    async fn from_response(response: Response<Body>) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn json(&self) -> Json {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "body is not JSON ({}): {:?}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    /// Assert an error status with an empty body.
    pub fn assert_bare(&self, status: StatusCode) {
        assert_eq!(self.status, status, "body: {:?}", String::from_utf8_lossy(&self.body));
        assert!(
            self.body.is_empty(),
            "expected empty body, got {:?}",
            String::from_utf8_lossy(&self.body)
        );
    }
}

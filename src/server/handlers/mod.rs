//! HTTP request handlers for the rally API.
//!
//! Every `/api` handler runs the same pipeline, in order:
//!
//! 1. method check (route fallback, bare 400)
//! 2. authentication ([`Caller`](super::auth::Caller), bare 401)
//! 3. required parameters (bare 400)
//! 4. body validation (bare 400)
//! 5. entity lookups in the service (bare 404)
//! 6. the mutation, if any
//!
//! Error responses never carry a body. Successful responses are JSON.

mod catalogs;
mod checkpoints;
mod competitors;
mod events;
mod users;
mod vehicles;

pub use catalogs::{
    create_catalog_handler, delete_catalog_handler, list_catalog_handler, update_catalog_handler,
};
pub use checkpoints::{
    active_day_handler, all_competitor_tracking_handler, change_status_handler,
    checkpoint_handler, competitor_tracking_handler, days_of_race_handler, update_status_handler,
};
pub use competitors::{
    competitor_by_id_handler, competitor_route_handler, competitors_by_event_handler,
    create_competitor_handler, create_competitor_user_handler, delete_competitor_user_handler,
};
pub use events::{event_detail_handler, list_events_handler};
pub use users::{create_user_handler, user_profile_handler};
pub use vehicles::{
    create_vehicle_handler, delete_vehicle_handler, get_vehicle_handler, list_vehicles_handler,
    search_vehicle_handler, update_vehicle_handler,
};

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequestParts, Path},
    http::{request::Parts, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, error, warn};
use url::form_urlencoded;

use super::auth::{AuthError, Caller, TokenVerifier};
use crate::error::{ServiceError, StoreError};
use crate::service::RaceService;
use crate::store::DocumentStore;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to all handlers via Axum's State extractor.
pub struct AppState<S: DocumentStore> {
    /// Entity resolution over the document store
    pub service: Arc<RaceService<S>>,

    /// Bearer-token verifier for `/api` routes
    pub verifier: Arc<dyn TokenVerifier>,
}

impl<S: DocumentStore> AppState<S> {
    pub fn new(service: RaceService<S>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            service: Arc::new(service),
            verifier,
        }
    }
}

impl<S: DocumentStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            verifier: Arc::clone(&self.verifier),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Handler error. Renders as a status code with an empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn parts(&self) -> (&'static str, &str) {
        match self {
            ApiError::BadRequest(message) => ("bad_request", message.as_str()),
            ApiError::NotFound(message) => ("not_found", message.as_str()),
            ApiError::Conflict(message) => ("conflict", message.as_str()),
            ApiError::Internal(message) => ("internal_error", message.as_str()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::BadRequest(message) => ApiError::BadRequest(message),
            ServiceError::NotFound(message) => ApiError::NotFound(message),
            ServiceError::Conflict(message) => ApiError::Conflict(message),
            ServiceError::Store(StoreError::NotFound(path)) => ApiError::NotFound(path),
            ServiceError::Store(StoreError::AlreadyExists(path)) => ApiError::Conflict(path),
            ServiceError::Store(StoreError::InvalidPath(message)) => ApiError::BadRequest(message),
            ServiceError::Store(other) => ApiError::Internal(other.to_string()),
        }
    }
}

/// Logs by severity, then returns a bare status.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message) = self.parts();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            // 404s are part of normal lookups
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        status.into_response()
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Named request parameters, taken from the matched path or the query string.
///
/// A parameter present in both places resolves to the path value. Values are
/// trimmed and blank values count as absent.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    path: HashMap<String, String>,
    query: HashMap<String, String>,
}

impl RequestParams {
    pub fn new(path: HashMap<String, String>, query: HashMap<String, String>) -> Self {
        Self { path, query }
    }

    pub fn optional(&self, name: &str) -> Option<String> {
        let non_blank = |value: &String| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        self.path
            .get(name)
            .and_then(non_blank)
            .or_else(|| self.query.get(name).and_then(non_blank))
    }

    pub fn required(&self, name: &str) -> Result<String, ApiError> {
        self.optional(name)
            .ok_or_else(|| ApiError::BadRequest(format!("missing parameter {}", name)))
    }
}

impl<S> FromRequestParts<S> for RequestParams
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Routes without path captures have no path map; that is not an error.
        let path = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map(|Path(map)| map)
            .unwrap_or_default();
        let query = parts
            .uri
            .query()
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Ok(RequestParams { path, query })
    }
}

/// Parse a request body as JSON.
pub fn json_body(body: &Bytes) -> Result<JsonValue, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))
}

// =============================================================================
// Shared Responses
// =============================================================================

/// Body of successful status mutations.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Body of a 201 that created one document.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// Public; no bearer token required.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Endpoints whose ids travel as path segments. A request under one of
/// these prefixes that reaches the router fallback is missing ids.
const PATH_ID_ENDPOINTS: [&str; 11] = [
    "/api/vehicles/",
    "/api/competitor-route/",
    "/api/get-competitor-by-id/",
    "/api/get-competitors-by-event/",
    "/api/days-of-race/",
    "/api/checkpoint/",
    "/api/competitor-tracking/",
    "/api/all-competitor-tracking/",
    "/api/update-competitor-status/",
    "/api/event-detail/",
    "/api/catalogs/",
];

fn under_path_id_endpoint(path: &str) -> bool {
    PATH_ID_ENDPOINTS
        .iter()
        .any(|prefix| path.starts_with(prefix) || path == prefix.trim_end_matches('/'))
}

/// Router fallback.
///
/// A path under a known endpoint whose id segments did not match is an
/// absent parameter: 401 without a valid token, else a bare 400. Any other
/// path is a bare 404.
pub async fn unmatched_path_handler(uri: Uri, caller: Result<Caller, AuthError>) -> Response {
    if !under_path_id_endpoint(uri.path()) {
        debug!(path = %uri.path(), "No route");
        return StatusCode::NOT_FOUND.into_response();
    }
    match caller {
        Ok(_) => ApiError::BadRequest(format!("missing path parameters in {}", uri.path()))
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Fallback for methods a route does not serve.
pub async fn method_not_allowed_handler(method: Method, uri: Uri) -> StatusCode {
    debug!(method = %method, path = %uri.path(), "Method not allowed");
    StatusCode::BAD_REQUEST
}

//! HTTP server layer for the rally API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                 /api/...  (bearer token)   /health              │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (pipeline)  │  │ (verifier)  │  │ (CORS, method fallback) │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                        service::RaceService
//!                               │
//!                        store::DocumentStore
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{AuthError, Caller, HmacTokenVerifier, TokenVerifier, VerifiedToken};
pub use handlers::{health_handler, ApiError, AppState, HealthResponse, RequestParams};
pub use routes::{create_router, RouterConfig};

//! # Rally API
//!
//! HTTP backend for rally events, backed by a hierarchical document store
//! (Firestore in production).
//!
//! Mobile and web clients use it to manage a user's garage, register
//! competitors and look up the route they drive on a given day, follow
//! competitors through checkpoints, and read shared catalogs.
//!
//! ## Features
//!
//! - **Linear request pipeline**: validate, authenticate, resolve, build
//! - **Pluggable store**: [`store::DocumentStore`] with in-memory and Firestore REST backends
//! - **Atomic writes**: multi-document mutations commit as one batch
//! - **Bearer-token auth**: HMAC-SHA256 tokens behind the [`server::TokenVerifier`] seam
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`store`] - document store abstraction, paths, queries and backends
//! - [`model`] - request validation and response shapes
//! - [`service`] - entity resolution for every endpoint
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rally_api::{create_router, HmacTokenVerifier, MemoryStore, RaceService, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let verifier = HmacTokenVerifier::new("a-long-enough-secret").unwrap();
//!     let router = create_router(
//!         RaceService::new(MemoryStore::new()),
//!         Arc::new(verifier),
//!         RouterConfig::new(),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod server;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, ServeConfig, StoreBackend, StoreConfig, TokenConfig};
pub use error::{ServiceError, StoreError};
pub use server::{
    create_router, health_handler, ApiError, AppState, AuthError, Caller, HealthResponse,
    HmacTokenVerifier, RequestParams, RouterConfig, TokenVerifier, VerifiedToken,
};
pub use service::RaceService;
pub use store::{
    CollectionPath, DocPath, Document, DocumentStore, FirestoreConfig, FirestoreStore, MemoryStore,
    Query, Write,
};

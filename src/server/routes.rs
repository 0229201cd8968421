//! Router configuration for the rally API.
//!
//! This module defines the HTTP routes and applies CORS and tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                                              - Health check (public)
//! /api/vehicles[/{vehicleId}]                          - User garage
//! /api/search-vehicle                                  - Vehicle search
//! /api/competitor-route/{eventId}/{dayId}/{competitorId}
//! /api/get-competitor-by-id/{eventId}/{competitorId}
//! /api/get-competitors-by-event/{eventId}
//! /api/create-competitor                               - Event registration
//! /api/create-competitor-user                          - Competitor account
//! /api/delete-competitor-user
//! /api/days-of-race/{eventId}
//! /api/checkpoint/dayofrace/active/{eventId}
//! /api/checkpoint/{checkpointId}/event/{eventId}
//! /api/competitor-tracking/{eventId}/{dayOfRaceId}/{checkpointId}
//! /api/all-competitor-tracking/{eventId}/{dayOfRaceId}
//! /api/change-competitor-status
//! /api/update-competitor-status/{eventId}/{dayOfRaceId}/{competitorId}/{checkpointId}
//! /api/events                                          - Paginated event listing
//! /api/event-detail/{eventId}
//! /api/user-profile
//! /api/users
//! /api/catalogs/{catalog}
//! ```
//!
//! Routes taking ids also exist without the path captures; the ids are then
//! read from the query string.
//!
//! Each route carries its own CORS layer listing exactly the methods it
//! serves, and a method fallback answering any other method with a bare 400.
//! `HEAD` is routed to that fallback too, so a `GET` route does not answer it.
//!
//! Paths that fall under one of these endpoints without matching it (an id
//! segment missing, or a trailing slash) are answered with 400 once the
//! caller is authenticated. Every other unmatched path is a 404.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rally_api::server::auth::HmacTokenVerifier;
//! use rally_api::server::routes::{create_router, RouterConfig};
//! use rally_api::service::RaceService;
//! use rally_api::store::MemoryStore;
//!
//! let verifier = Arc::new(HmacTokenVerifier::new("my-secret-key")?);
//! let router = create_router(RaceService::new(MemoryStore::new()), verifier, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    handler::Handler,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::TokenVerifier;
use super::handlers::*;
use crate::service::RaceService;
use crate::store::DocumentStore;

/// Default CORS preflight max-age in seconds (1 hour).
pub const DEFAULT_CORS_MAX_AGE: u64 = 3600;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Preflight max-age in seconds
    pub cors_max_age: u64,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Preflight max-age is 1 hour (3600 seconds)
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cors_max_age: DEFAULT_CORS_MAX_AGE,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the preflight max-age in seconds.
    pub fn with_cors_max_age(mut self, seconds: u64) -> Self {
        self.cors_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `service` - Entity resolution over the document store
/// * `verifier` - Bearer-token verifier for `/api` routes
/// * `config` - Router configuration
pub fn create_router<S>(
    service: RaceService<S>,
    verifier: Arc<dyn TokenVerifier>,
    config: RouterConfig,
) -> Router
where
    S: DocumentStore + 'static,
{
    let app_state = AppState::new(service, verifier);
    let routes = Routes { config: &config };

    let router = Router::new()
        .route("/health", routes.endpoint(get(health_handler), &[Method::GET]))
        // Garage
        .route(
            "/api/vehicles",
            routes.endpoint(
                get(list_vehicles_handler::<S>)
                    .post(create_vehicle_handler::<S>)
                    .put(update_vehicle_handler::<S>)
                    .delete(delete_vehicle_handler::<S>),
                &[Method::GET, Method::POST, Method::PUT, Method::DELETE],
            ),
        )
        .route(
            "/api/vehicles/{vehicleId}",
            routes.endpoint(
                get(get_vehicle_handler::<S>)
                    .put(update_vehicle_handler::<S>)
                    .delete(delete_vehicle_handler::<S>),
                &[Method::GET, Method::PUT, Method::DELETE],
            ),
        )
        .route("/api/search-vehicle", routes.get(search_vehicle_handler::<S>))
        // Competitors
        .route("/api/competitor-route", routes.get(competitor_route_handler::<S>))
        .route(
            "/api/competitor-route/{eventId}/{dayId}/{competitorId}",
            routes.get(competitor_route_handler::<S>),
        )
        .route("/api/get-competitor-by-id", routes.get(competitor_by_id_handler::<S>))
        .route(
            "/api/get-competitor-by-id/{eventId}/{competitorId}",
            routes.get(competitor_by_id_handler::<S>),
        )
        .route(
            "/api/get-competitors-by-event",
            routes.get(competitors_by_event_handler::<S>),
        )
        .route(
            "/api/get-competitors-by-event/{eventId}",
            routes.get(competitors_by_event_handler::<S>),
        )
        .route(
            "/api/create-competitor",
            routes.endpoint(post(create_competitor_handler::<S>), &[Method::POST]),
        )
        .route(
            "/api/create-competitor-user",
            routes.endpoint(post(create_competitor_user_handler::<S>), &[Method::POST]),
        )
        .route(
            "/api/delete-competitor-user",
            routes.endpoint(delete(delete_competitor_user_handler::<S>), &[Method::DELETE]),
        )
        // Race days and checkpoints
        .route("/api/days-of-race", routes.get(days_of_race_handler::<S>))
        .route("/api/days-of-race/{eventId}", routes.get(days_of_race_handler::<S>))
        .route("/api/checkpoint/dayofrace/active", routes.get(active_day_handler::<S>))
        .route(
            "/api/checkpoint/dayofrace/active/{eventId}",
            routes.get(active_day_handler::<S>),
        )
        .route("/api/checkpoint", routes.get(checkpoint_handler::<S>))
        .route(
            "/api/checkpoint/{checkpointId}/event/{eventId}",
            routes.get(checkpoint_handler::<S>),
        )
        // Tracking
        .route("/api/competitor-tracking", routes.get(competitor_tracking_handler::<S>))
        .route(
            "/api/competitor-tracking/{eventId}/{dayOfRaceId}/{checkpointId}",
            routes.get(competitor_tracking_handler::<S>),
        )
        .route(
            "/api/all-competitor-tracking",
            routes.get(all_competitor_tracking_handler::<S>),
        )
        .route(
            "/api/all-competitor-tracking/{eventId}/{dayOfRaceId}",
            routes.get(all_competitor_tracking_handler::<S>),
        )
        .route("/api/change-competitor-status", routes.put(change_status_handler::<S>))
        .route("/api/update-competitor-status", routes.put(update_status_handler::<S>))
        .route(
            "/api/update-competitor-status/{eventId}/{dayOfRaceId}/{competitorId}/{checkpointId}",
            routes.put(update_status_handler::<S>),
        )
        // Events and users
        .route("/api/events", routes.get(list_events_handler::<S>))
        .route("/api/event-detail", routes.get(event_detail_handler::<S>))
        .route("/api/event-detail/{eventId}", routes.get(event_detail_handler::<S>))
        .route("/api/user-profile", routes.get(user_profile_handler::<S>))
        .route(
            "/api/users",
            routes.endpoint(post(create_user_handler::<S>), &[Method::POST]),
        )
        // Catalogs
        .route(
            "/api/catalogs/{catalog}",
            routes.endpoint(
                get(list_catalog_handler::<S>)
                    .post(create_catalog_handler::<S>)
                    .put(update_catalog_handler::<S>)
                    .delete(delete_catalog_handler::<S>),
                &[Method::GET, Method::POST, Method::PUT, Method::DELETE],
            ),
        )
        .fallback(unmatched_path_handler.layer(build_cors_layer(
            &config,
            &[Method::GET, Method::POST, Method::PUT, Method::DELETE],
        )))
        .with_state(app_state);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Per-route wrapping shared by every endpoint.
struct Routes<'a> {
    config: &'a RouterConfig,
}

impl Routes<'_> {
    /// Attach the 400 method fallback and a CORS layer allowing `methods`.
    fn endpoint<St>(&self, router: MethodRouter<St>, methods: &[Method]) -> MethodRouter<St>
    where
        St: Clone + Send + Sync + 'static,
    {
        // A GET route would otherwise serve HEAD with the GET handler.
        let router = if methods.contains(&Method::GET) {
            router.head(method_not_allowed_handler)
        } else {
            router
        };
        router
            .fallback(method_not_allowed_handler)
            .layer(build_cors_layer(self.config, methods))
    }

    fn get<H, T, St>(&self, handler: H) -> MethodRouter<St>
    where
        H: axum::handler::Handler<T, St>,
        T: 'static,
        St: Clone + Send + Sync + 'static,
    {
        self.endpoint(get(handler), &[Method::GET])
    }

    fn put<H, T, St>(&self, handler: H) -> MethodRouter<St>
    where
        H: axum::handler::Handler<T, St>,
        T: 'static,
        St: Clone + Send + Sync + 'static,
    {
        self.endpoint(put(handler), &[Method::PUT])
    }
}

/// Build a CORS layer allowing `methods` (plus OPTIONS).
fn build_cors_layer(config: &RouterConfig, methods: &[Method]) -> CorsLayer {
    let mut allowed = methods.to_vec();
    allowed.push(Method::OPTIONS);

    let cors = CorsLayer::new()
        .allow_methods(allowed)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(config.cors_max_age));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

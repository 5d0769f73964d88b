//! Authenticated HTTP API for the cafeteria order service.
//!
//! Provides REST endpoints for creating, reading, updating and deleting
//! orders and for driving them through their lifecycle, with structured
//! logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use domain::OrderService;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::TokenAuthenticator;
use routes::orders::{self, AppState};

/// Creates the Axum application router with all routes and shared state.
///
/// `/health` and `/metrics` are open; every `/orders` route requires a
/// bearer token known to `authenticator`.
pub fn create_app<S: OrderStore + 'static>(
    state: Arc<AppState<S>>,
    authenticator: Arc<TokenAuthenticator>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let order_router = Router::new()
        .route("/orders", get(orders::list::<S>).post(orders::create::<S>))
        .route("/orders/import", post(orders::import::<S>))
        .route(
            "/orders/{id}",
            get(orders::get::<S>)
                .patch(orders::update::<S>)
                .put(orders::update::<S>)
                .delete(orders::delete::<S>),
        )
        .route("/orders/{id}/accept", post(orders::accept::<S>))
        .route("/orders/{id}/reject", post(orders::reject::<S>))
        .route("/orders/{id}/ready", post(orders::ready::<S>))
        .route("/orders/{id}/complete", post(orders::complete::<S>))
        .route("/orders/{id}/pay", post(orders::pay::<S>))
        .route_layer(middleware::from_fn_with_state(authenticator, auth::require_auth))
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health::check))
        .merge(order_router)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around an order store.
pub fn create_state<S: OrderStore + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        order_service: OrderService::new(store),
    })
}

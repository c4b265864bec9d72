//! HTTP server for the article API.
//!
//! Serves the same user and article operations over two transports:
//! path-routed REST under `/restful` and SOAP RPC at `/soap`, with
//! structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod routes;
pub mod rpc;

use std::sync::Arc;

use axum::Router;
use axum::routing::{any, get, post};
use domain::{Argon2Hasher, ArticleService, UserService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{ArticleStore, UserStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;
use routes::rest::RestPolicy;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: UserStore + ArticleStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(routes::rest::REST_PREFIX, any(routes::rest::handle::<S>))
        .route("/restful/{*path}", any(routes::rest::handle::<S>))
        .route("/soap", post(routes::soap::handle::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over one store shared by both services.
pub fn create_default_state<S: UserStore + ArticleStore + Clone + 'static>(
    store: S,
    hasher: Argon2Hasher,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        users: UserService::with_hasher(store.clone(), hasher),
        articles: ArticleService::new(store),
        policy: RestPolicy::default(),
    })
}

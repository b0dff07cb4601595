//! Atelier Storefront library.
//!
//! Server-rendered artist marketplace. Catalog, profiles, roles, branding
//! and Stripe checkout live on a remote backend; this crate renders pages
//! from cached backend queries and forwards mutations with the caller's
//! delegated identity.
//!
//! The crate is a library so integration tests can drive [`app`] directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod forms;
pub mod gate;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod queries;
pub mod routes;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::{Router, middleware::from_fn, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");
const ASSETS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static/assets");

/// Build the storefront router around `state`.
///
/// Sentry layers are added by the binary so tests can run without a client.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());
    let body_limit = DefaultBodyLimit::max(state.config().max_upload_bytes);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .nest_service("/assets", ServeDir::new(ASSETS_DIR))
        .layer(body_limit)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(session_layer)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable until the backend has answered a probe.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.actors().is_connected() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, test_config};
    use crate::backend::ActorProvider;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_readiness_follows_backend_connection() {
        let transport = Arc::new(ScriptedTransport::new());
        let pending = AppState::with_provider(
            test_config(),
            ActorProvider::pending(transport.clone()),
        );
        let response = app(pending)
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let connected = AppState::with_provider(test_config(), ActorProvider::connected(transport));
        let response = app(connected)
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_pages_carry_security_headers() {
        let transport = Arc::new(ScriptedTransport::new());
        let state = AppState::with_provider(test_config(), ActorProvider::connected(transport));
        let response = app(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("content-security-policy"));
        assert!(response.headers().contains_key("x-request-id"));
    }
}

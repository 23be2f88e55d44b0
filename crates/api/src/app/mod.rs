//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage/notifier wiring behind the registry service
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs and extraction helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use federation_infra::config::Settings;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(settings: &Settings) -> anyhow::Result<Router> {
    let services = services::build_services(settings).await?;
    Ok(router_with_services(&settings.jwt_secret, services))
}

/// Router over already-built services.
pub fn router_with_services(jwt_secret: &str, services: services::AppServices) -> Router {
    let jwt = Arc::new(federation_auth::Hs256JwtValidator::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a verified bearer token.
    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}

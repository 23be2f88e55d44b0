use axum::{routing::get, Router};

pub mod bank_accounts;
pub mod legal_entities;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/federation/legal-entities", legal_entities::router())
        .nest("/federation/bank-accounts", bank_accounts::router())
}

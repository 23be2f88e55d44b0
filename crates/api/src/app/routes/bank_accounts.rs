use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::put,
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

/// Routes addressed by bank account id. Listing and creation live under the
/// owning legal entity (`/federation/legal-entities/:id/bank-accounts`).
pub fn router() -> Router {
    Router::new().route("/:id", put(update_bank_account).delete(delete_bank_account))
}

pub async fn list_bank_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Path(legal_entity_id): Path<String>,
) -> axum::response::Response {
    let legal_entity_id = match dto::parse_legal_entity_id(&legal_entity_id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.registry.get_all_bank_accounts(legal_entity_id).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn create_bank_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(legal_entity_id): Path<String>,
    body: Result<Json<dto::BankAccountRequest>, JsonRejection>,
) -> axum::response::Response {
    let legal_entity_id = match dto::parse_legal_entity_id(&legal_entity_id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(res) => return res,
    };

    match services
        .registry
        .create_bank_account(legal_entity_id, body.into())
        .await
    {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(e) => {
            tracing::warn!(principal = %principal.principal_id(), %legal_entity_id, error = %e, "create bank account failed");
            errors::repository_error_to_response(e)
        }
    }
}

pub async fn update_bank_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::BankAccountRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match dto::parse_bank_account_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(res) => return res,
    };

    match services.registry.update_bank_account(id, body.into()).await {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(e) => {
            tracing::warn!(principal = %principal.principal_id(), %id, error = %e, "update bank account failed");
            errors::repository_error_to_response(e)
        }
    }
}

pub async fn delete_bank_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_bank_account_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.registry.delete_bank_account(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::warn!(principal = %principal.principal_id(), %id, error = %e, "delete bank account failed");
            errors::repository_error_to_response(e)
        }
    }
}

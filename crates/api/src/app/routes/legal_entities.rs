use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_legal_entities).post(create_legal_entity))
        .route("/:id", put(update_legal_entity).delete(delete_legal_entity))
        .route(
            "/:id/bank-accounts",
            get(super::bank_accounts::list_bank_accounts).post(super::bank_accounts::create_bank_account),
        )
}

pub async fn list_legal_entities(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.registry.get_all_legal_entities().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn create_legal_entity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::LegalEntityRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(res) => return res,
    };

    match services.registry.create_legal_entity(&body.name).await {
        Ok(entity) => (StatusCode::CREATED, Json(entity)).into_response(),
        Err(e) => {
            tracing::warn!(principal = %principal.principal_id(), error = %e, "create legal entity failed");
            errors::repository_error_to_response(e)
        }
    }
}

pub async fn update_legal_entity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::LegalEntityRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match dto::parse_legal_entity_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(res) => return res,
    };

    match services.registry.update_legal_entity(id, &body.name).await {
        Ok(entity) => (StatusCode::OK, Json(entity)).into_response(),
        Err(e) => {
            tracing::warn!(principal = %principal.principal_id(), %id, error = %e, "update legal entity failed");
            errors::repository_error_to_response(e)
        }
    }
}

pub async fn delete_legal_entity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_legal_entity_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.registry.delete_legal_entity(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::warn!(principal = %principal.principal_id(), %id, error = %e, "delete legal entity failed");
            errors::repository_error_to_response(e)
        }
    }
}

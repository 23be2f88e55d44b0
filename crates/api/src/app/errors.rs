use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use federation_infra::repository::RepositoryError;

pub fn repository_error_to_response(err: RepositoryError) -> axum::response::Response {
    match err {
        RepositoryError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        RepositoryError::DuplicateName(_) => {
            json_error(StatusCode::CONFLICT, "duplicate_name", err.to_string())
        }
        RepositoryError::NotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        RepositoryError::Storage(msg) => {
            // Backend detail stays in the log.
            tracing::error!(error = %msg, "registry storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "storage backend failure",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

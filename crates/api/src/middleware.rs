use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use federation_auth::{AuthError, JwtValidator};

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let claims = match extract_bearer(req.headers())
        .and_then(|token| state.jwt.validate(token, Utc::now()))
    {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, path = %req.uri().path(), "request rejected");
            return json_error(StatusCode::UNAUTHORIZED, "invalid_auth", e.to_string());
        }
    };

    req.extensions_mut()
        .insert(PrincipalContext::new(claims.sub, claims.roles));

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;

    let header = header.to_str().map_err(|_| AuthError::MalformedHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token)
}

//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Why a request could not be authenticated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("malformed authorization header")]
    MalformedHeader,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Turns a raw bearer token into verified claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, AuthError>;
}

/// HS256 shared-secret validator.
///
/// The claim window (`issued_at`/`expires_at`) is checked by `validate_claims`
/// rather than by the registered `exp` claim.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, AuthError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "bearer token rejected");
                AuthError::InvalidToken(e.to_string())
            })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

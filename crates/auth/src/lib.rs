//! `federation-auth`: authentication boundary (verified identity claims).
//!
//! This crate is decoupled from HTTP and storage: it turns a bearer token into
//! validated `JwtClaims` or an `AuthError`.

pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{AuthError, Hs256JwtValidator, JwtValidator};
pub use principal::PrincipalId;
pub use roles::Role;

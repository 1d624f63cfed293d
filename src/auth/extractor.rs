//! AuthClaims extractor for Axum handlers.
//!
//! Reads the validated claims from request extensions (populated by the
//! `require_auth` middleware).

use crate::auth::error::AuthError;
use crate::auth::jwt::ValidatedClaims;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::ops::Deref;

/// Claims of the request's validated bearer token.
///
/// Use this as a handler parameter on routes behind `require_auth`:
///
/// ```rust,ignore
/// async fn my_handler(claims: AuthClaims) -> Result<Json<Value>, AuthError> {
///     require_scopes(&claims, &["read:courses"])?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthClaims(pub ValidatedClaims);

impl Deref for AuthClaims {
    type Target = ValidatedClaims;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let claims = parts.extensions.get::<ValidatedClaims>().cloned();
        async move { claims.map(AuthClaims).ok_or(AuthError::MissingToken) }
    }
}

// ============================================================================
// Tests
// ============================================================================

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::claims::Claims;
use super::jwt::JwtVerifier;
use crate::error::AppError;

/// Verified claims of the caller. Handlers taking this never run for
/// requests without a valid token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

/// Pulls the token out of `Bearer <token>`; anything else is `None`.
pub(crate) fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<JwtVerifier>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AppError::MissingToken)?;

        let verifier = Arc::<JwtVerifier>::from_ref(state);
        let claims = verifier.verify(token).inspect_err(|_| {
            warn!("invalid or expired token");
        })?;

        Ok(AuthUser(claims))
    }
}

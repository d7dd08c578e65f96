//! Caller identity.
//!
//! Authentication happens at the gateway in front of this service, which
//! forwards the authenticated user as `x-user-id` and their role as
//! `x-user-role`.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::EcommerceError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const ADMIN_ROLE: &str = "admin";

/// The shopper making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id(parts).map(Self)
    }
}

fn user_id(parts: &Parts) -> Result<Uuid, EcommerceError> {
    parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or(EcommerceError::Unauthorized)
}

/// Middleware guarding the back-office routes.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, EcommerceError> {
    let (parts, body) = request.into_parts();
    let admin_id = user_id(&parts)?;
    let is_admin = parts
        .headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.eq_ignore_ascii_case(ADMIN_ROLE));
    if !is_admin {
        tracing::warn!(%admin_id, path = %parts.uri.path(), "Non-admin attempted back-office access");
        return Err(EcommerceError::Forbidden);
    }
    Ok(next.run(Request::from_parts(parts, body)).await)
}

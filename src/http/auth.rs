//! Caller identity.
//!
//! Authentication happens at the gateway, which forwards the caller in
//! `x-user-id` and `x-user-role`. Handlers take [`Principal`] or [`AdminPrincipal`]
//! as an argument to require one.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;
use crate::EcommerceError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal { pub user_id: Uuid, pub is_admin: bool }

impl Principal {
    /// Admins see everything; everyone else only what they own.
    pub fn can_see(&self, owner: Uuid) -> bool { self.is_admin || self.user_id == owner }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts.headers.get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(EcommerceError::Unauthorized)?;
        let is_admin = parts.headers.get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"));
        Ok(Self { user_id, is_admin })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct AdminPrincipal(pub Principal);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminPrincipal {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if !principal.is_admin {
            tracing::warn!(user_id = %principal.user_id, uri = %parts.uri, "admin route refused");
            return Err(EcommerceError::Forbidden);
        }
        Ok(Self(principal))
    }
}

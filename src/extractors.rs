//! Session Extractors
//!
//! Axum extractors for the caller's session and the admin gate.

use crate::error::AuthError;
use crate::handlers::AppState;
use crate::models::Account;
use crate::token::SessionClaims;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

/// JSON request body whose rejections render as validation errors
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AuthError))]
pub struct JsonBody<T>(pub T);

/// Pull the bearer token out of the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::Unauthorized)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Unauthorized)
}

/// Claims validated by middleware, or the bearer token validated on the spot
fn session_claims(parts: &Parts, state: &AppState) -> Result<SessionClaims, AuthError> {
    if let Some(claims) = parts.extensions.get::<SessionClaims>() {
        return Ok(claims.clone());
    }

    let token = bearer_token(&parts.headers)?;
    state.tokens.decode_claims(token)
}

/// Authenticated caller identity taken from the session token
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub account_id: Uuid,
    pub claims: SessionClaims,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = session_claims(parts, state)?;

        Ok(SessionUser {
            account_id: claims.sub,
            claims,
        })
    }
}

/// Caller whose account holds the admin role
#[derive(Debug, Clone)]
pub struct AdminAccount(pub Account);

#[async_trait]
impl FromRequestParts<AppState> for AdminAccount {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = SessionUser::from_request_parts(parts, state).await?;

        // A token for an account that no longer exists is as good as no token
        let account = state.accounts.find(session.account_id).await.map_err(|e| match e {
            AuthError::NotFound => AuthError::Unauthorized,
            other => other,
        })?;

        if !account.role.is_admin() {
            tracing::warn!(account_id = %account.id, "Non-admin attempted an admin operation");
            return Err(AuthError::Forbidden);
        }

        Ok(AdminAccount(account))
    }
}

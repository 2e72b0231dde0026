//! Session Middleware
//!
//! Bearer token validation for protected routes.

use crate::error::AuthError;
use crate::extractors::bearer_token;
use crate::handlers::AppState;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Require a valid session token
///
/// Validates the bearer token with the shared [`TokenIssuer`](crate::token::TokenIssuer)
/// and stores the claims in request extensions for extractors.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers())?;
    let claims = state.tokens.decode_claims(token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

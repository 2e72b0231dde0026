//! Account Error Types
//!
//! Centralized error handling for the credential and verification lifecycle.
//! Expected domain conditions get their own variant so the transport layer can
//! map each one to a distinct status and machine-readable code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Account and authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A user with that email already exists")]
    DuplicateAccount,

    #[error("User not found")]
    NotFound,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("User is already verified")]
    AlreadyVerified,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please verify your email before logging in")]
    NotVerified,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("Could not hash password")]
    HashingFailure,

    #[error("Invalid or expired token: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    Persistence(String),

    #[error("Failed to send email: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl AuthError {
    /// Status code and machine-readable error code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AuthError::DuplicateAccount => (StatusCode::CONFLICT, "user_exists"),
            AuthError::NotFound => (StatusCode::NOT_FOUND, "user_not_found"),
            AuthError::InvalidCode => (StatusCode::BAD_REQUEST, "invalid_token"),
            AuthError::AlreadyVerified => (StatusCode::BAD_REQUEST, "already_verified"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "auth_error"),
            AuthError::NotVerified => (StatusCode::FORBIDDEN, "account_not_verified"),
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthError::Token(_) => (StatusCode::UNAUTHORIZED, "invalid_session"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AuthError::HashingFailure => (StatusCode::INTERNAL_SERVER_ERROR, "hash_error"),
            AuthError::Delivery(_) => (StatusCode::INTERNAL_SERVER_ERROR, "email_send_failed"),
            AuthError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            AuthError::Persistence(_) | AuthError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        // Infrastructure details stay in the logs
        let message = match &self {
            AuthError::Validation(msg) => msg.clone(),
            AuthError::Token(_) => "Invalid or expired token".to_string(),
            AuthError::Persistence(_) | AuthError::Internal | AuthError::Config(_) => {
                "An internal error occurred".to_string()
            }
            AuthError::Delivery(_) => "Failed to send verification email".to_string(),
            _ => self.to_string(),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// Errors surfaced by an [`AccountStore`](crate::store::AccountStore)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key")]
    DuplicateKey,

    #[error("record not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::DuplicateKey,
            sqlx::Error::RowNotFound => StoreError::NotFound,
            _ => {
                tracing::error!("Database error: {:?}", err);
                StoreError::Backend(err.to_string())
            }
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey => AuthError::DuplicateAccount,
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Backend(msg) => AuthError::Persistence(msg),
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AuthError::Validation(rejection.body_text())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AuthError::HashingFailure
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("JWT error: {:?}", err);
        AuthError::Token(err.to_string())
    }
}

impl From<lettre::error::Error> for AuthError {
    fn from(err: lettre::error::Error) -> Self {
        tracing::error!("Email build error: {:?}", err);
        AuthError::Delivery(err.to_string())
    }
}

impl From<lettre::address::AddressError> for AuthError {
    fn from(err: lettre::address::AddressError) -> Self {
        tracing::warn!("Invalid email address: {:?}", err);
        AuthError::Delivery(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for AuthError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        tracing::error!("SMTP error: {:?}", err);
        AuthError::Delivery(err.to_string())
    }
}

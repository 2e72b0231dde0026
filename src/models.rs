//! Account Models
//!
//! Data structures for account requests, responses, and database entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ============================================
// Database Entities
// ============================================

/// Account role enum matching database type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Admin,
    #[default]
    Standard,
}

impl AccountRole {
    /// Parse an exact role name (`"admin"` or `"standard"`)
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(AccountRole::Admin),
            "standard" => Some(AccountRole::Standard),
            _ => None,
        }
    }

    /// Parse a caller-requested role, falling back to the default for anything unrecognized
    pub fn requested_or_default(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AccountRole::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Admin => "admin",
            AccountRole::Standard => "standard",
        }
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account entity from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_code: Option<String>,
    pub is_active: bool,
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether `code` matches the outstanding verification code exactly
    pub fn code_matches(&self, code: &str) -> bool {
        self.verification_code.as_deref() == Some(code)
    }

    /// Mark the account verified and drop the outstanding code
    pub fn mark_verified(&mut self) {
        self.is_verified = true;
        self.verification_code = None;
    }
}

/// Fields for a not-yet-persisted account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub verification_code: String,
    pub role: AccountRole,
}

/// Partial administrative update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountUpdate {
    #[serde(default, rename = "user_type", alias = "role")]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

// ============================================
// Request DTOs
// ============================================

/// Self-registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Requested role; unrecognized values fall back to `standard`
    #[serde(default, rename = "type")]
    pub role: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Email verification request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(alias = "code")]
    #[validate(length(min = 1, message = "Verification code is required"))]
    pub token: String,
}

/// Resend verification request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResendRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Administrative account creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdminCreateRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// ============================================
// Response DTOs
// ============================================

/// Account data without sensitive fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub email: String,
    pub is_verified: bool,
    pub is_active: bool,
    #[serde(rename = "user_type")]
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            is_verified: account.is_verified,
            is_active: account.is_active,
            role: account.role,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Successful login response
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

/// Simple message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

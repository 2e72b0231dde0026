//! Account Configuration
//!
//! All configuration values are loaded from environment variables once at
//! startup. No hardcoded secrets or sensitive data.

use crate::error::AuthError;
use std::env;

/// Default session token lifetime (24 hours)
pub const DEFAULT_TOKEN_TTL: i64 = 86400;

/// Account configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing session tokens (from JWT_SECRET env var)
    pub jwt_secret: String,

    /// Session token lifetime in seconds (from JWT_EXPIRATION env var)
    pub token_ttl: i64,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// JWT audience (from JWT_AUDIENCE env var)
    pub jwt_audience: String,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Outbound mail settings
    pub mail: MailConfig,
}

/// Outbound mail configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SMTP relay settings; `None` means messages are only logged
    pub smtp: Option<SmtpConfig>,

    /// Sender address (from EMAIL_FROM env var)
    pub from: String,

    /// Base URL of the verification page linked from admin invitations (from VERIFY_URL env var)
    pub verify_url: String,
}

/// SMTP relay credentials
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp: None,
            from: "no-reply@example.com".to_string(),
            verify_url: "http://localhost:3001/verify".to_string(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AuthError> {
    match env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| AuthError::Config(format!("{key} has an invalid value"))),
        Err(_) => Ok(default),
    }
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AuthError::Config("JWT_SECRET environment variable must be set".into()))?;

        Ok(Self {
            jwt_secret,
            token_ttl: parse_var("JWT_EXPIRATION", DEFAULT_TOKEN_TTL)?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "rustpress".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "rustpress-api".to_string()),
            argon2_memory_cost: parse_var("ARGON2_MEMORY_COST", 65536)?, // 64 MiB
            argon2_time_cost: parse_var("ARGON2_TIME_COST", 3)?,
            argon2_parallelism: parse_var("ARGON2_PARALLELISM", 4)?,
            mail: MailConfig::from_env()?,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.token_ttl <= 0 {
            return Err(AuthError::Config(
                "JWT_EXPIRATION must be positive".to_string(),
            ));
        }

        if self.argon2_time_cost == 0 || self.argon2_parallelism == 0 {
            return Err(AuthError::Config(
                "ARGON2_TIME_COST and ARGON2_PARALLELISM must be positive".to_string(),
            ));
        }

        if let Some(smtp) = &self.mail.smtp {
            if smtp.username.is_empty() {
                return Err(AuthError::Config(
                    "SMTP_USER must be set when SMTP_HOST is set".to_string(),
                ));
            }
        }

        if let Err(e) = url::Url::parse(&self.mail.verify_url) {
            return Err(AuthError::Config(format!("VERIFY_URL is not a valid URL: {e}")));
        }

        Ok(())
    }
}

impl MailConfig {
    /// Load mail settings from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        let defaults = Self::default();

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host: host.trim().to_string(),
                port: parse_var("SMTP_PORT", 587)?,
                username: env::var("SMTP_USER").unwrap_or_default(),
                password: env::var("SMTP_PASS").unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self {
            smtp,
            from: env::var("EMAIL_FROM").unwrap_or(defaults.from),
            verify_url: env::var("VERIFY_URL").unwrap_or(defaults.verify_url),
        })
    }
}

/// HTTP server settings used by the standalone binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PostgreSQL connection string (from DATABASE_URL env var)
    pub database_url: String,

    /// Listen port (from PORT env var)
    pub port: u16,

    /// Allowed CORS origin (from CORS_ORIGIN env var)
    pub cors_origin: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AuthError::Config("DATABASE_URL environment variable must be set".into()))?,
            port: parse_var("PORT", 8080)?,
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "a".repeat(32),
        token_ttl: DEFAULT_TOKEN_TTL,
        jwt_issuer: "test".to_string(),
        jwt_audience: "test".to_string(),
        // Cheap parameters keep the test suite fast
        argon2_memory_cost: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        mail: MailConfig::default(),
    }
}

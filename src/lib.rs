//! RustPress Accounts Plugin
//!
//! Account lifecycle for RustPress providing:
//! - Registration with emailed five-digit verification codes
//! - Verification and code resend
//! - Argon2id password hashing
//! - Login issuing 24 hour JWT session tokens
//! - Administrative account creation, update and listing
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `JWT_SECRET` - Secret key for signing JWTs (required, min 32 chars)
//! - `JWT_EXPIRATION` - Session token lifetime in seconds (default: 86400)
//! - `JWT_ISSUER` - JWT issuer claim (default: "rustpress")
//! - `JWT_AUDIENCE` - JWT audience claim (default: "rustpress-api")
//! - `ARGON2_MEMORY_COST` / `ARGON2_TIME_COST` / `ARGON2_PARALLELISM` - hashing cost
//! - `SMTP_HOST` / `SMTP_PORT` / `SMTP_USER` / `SMTP_PASS` - mail relay (logged only if unset)
//! - `EMAIL_FROM` - sender address (default: "no-reply@example.com")
//! - `VERIFY_URL` - verification page linked from admin invitations
//! - `DATABASE_URL` - PostgreSQL connection string (standalone server)
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustpress_accounts::{AccountsPlugin, Plugin};
//!
//! let plugin = AccountsPlugin::new();
//! plugin.activate(db_pool).await?;
//!
//! let app = plugin.router().await.expect("plugin is active");
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;
pub mod verification;

// Re-export commonly used types
pub use config::AuthConfig;
pub use error::{AuthError, StoreError};
pub use extractors::{AdminAccount, SessionUser};
pub use handlers::AppState;
pub use mailer::Mailer;
pub use models::*;
pub use service::{AccountService, Authenticator};
pub use store::{AccountStore, MemoryAccountStore, PgAccountStore};
pub use token::{SessionClaims, TokenIssuer};

use async_trait::async_trait;
use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================
// Plugin Types
// ============================================

/// Plugin state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Inactive,
    Active,
    Error,
}

/// Plugin metadata
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Plugin lifecycle trait
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Get plugin information
    fn info(&self) -> &PluginInfo;

    /// Get current plugin state
    async fn state(&self) -> PluginState;

    /// Activate the plugin
    async fn activate(&self, db: PgPool) -> Result<(), AuthError>;

    /// Deactivate the plugin
    async fn deactivate(&self) -> Result<(), AuthError>;

    /// Get plugin routes, if active
    async fn router(&self) -> Option<Router>;
}

// ============================================
// Accounts Plugin Implementation
// ============================================

/// RustPress Accounts Plugin
pub struct AccountsPlugin {
    info: PluginInfo,
    state: RwLock<PluginState>,
    app_state: RwLock<Option<AppState>>,
}

impl AccountsPlugin {
    /// Create a new accounts plugin instance
    pub fn new() -> Self {
        Self {
            info: PluginInfo {
                id: "rustpress-accounts".into(),
                name: "RustPress Accounts".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                description: "Account registration, verification and login for RustPress".into(),
            },
            state: RwLock::new(PluginState::Inactive),
            app_state: RwLock::new(None),
        }
    }

    /// Get the wired services
    pub async fn app_state(&self) -> Option<AppState> {
        self.app_state.read().await.clone()
    }

    /// Activate against explicit collaborators instead of PostgreSQL and SMTP
    pub async fn activate_with(
        &self,
        config: &AuthConfig,
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<(), AuthError> {
        let result = config
            .validate()
            .and_then(|_| AppState::new(config, store, mailer));

        match result {
            Ok(app_state) => {
                *self.app_state.write().await = Some(app_state);
                *self.state.write().await = PluginState::Active;
                tracing::info!("RustPress Accounts plugin activated successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!("RustPress Accounts plugin failed to activate: {e}");
                *self.state.write().await = PluginState::Error;
                Err(e)
            }
        }
    }
}

impl Default for AccountsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for AccountsPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn state(&self) -> PluginState {
        *self.state.read().await
    }

    async fn activate(&self, db: PgPool) -> Result<(), AuthError> {
        tracing::info!("Activating RustPress Accounts plugin");

        let store = PgAccountStore::new(db);
        store.migrate().await?;

        // Load configuration from environment
        let config = AuthConfig::from_env()?;
        let mailer = mailer::from_config(&config.mail)?;

        self.activate_with(&config, Arc::new(store), mailer).await
    }

    async fn deactivate(&self) -> Result<(), AuthError> {
        tracing::info!("Deactivating RustPress Accounts plugin");

        *self.app_state.write().await = None;
        *self.state.write().await = PluginState::Inactive;

        tracing::info!("RustPress Accounts plugin deactivated");
        Ok(())
    }

    async fn router(&self) -> Option<Router> {
        self.app_state().await.map(handlers::create_routes)
    }
}

// ============================================
// Module Tests
// ============================================

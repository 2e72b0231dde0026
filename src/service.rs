//! Account Services
//!
//! The account lifecycle (registration, verification, resend, administrative
//! changes) and credential authentication. Both services receive their store
//! handle at construction.

use crate::error::AuthError;
use crate::models::*;
use crate::password::CredentialHasher;
use crate::store::AccountStore;
use crate::verification::generate_code;

use std::sync::Arc;
use uuid::Uuid;

/// Account lifecycle manager
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    hasher: CredentialHasher,
}

impl AccountService {
    /// Create a new account service
    pub fn new(store: Arc<dyn AccountStore>, hasher: CredentialHasher) -> Self {
        Self { store, hasher }
    }

    // ============================================
    // Registration
    // ============================================

    /// Register a new, unverified account
    ///
    /// `requested_role` is honored only if it is exactly `"admin"` or
    /// `"standard"`. Email syntax is the caller's concern.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        requested_role: Option<&str>,
    ) -> Result<Account, AuthError> {
        let role = AccountRole::requested_or_default(requested_role);
        self.create(email, password, role).await
    }

    /// Create an account on behalf of an administrator
    pub async fn admin_create(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        self.create(email, password, AccountRole::Standard).await
    }

    async fn create(
        &self,
        email: &str,
        password: &str,
        role: AccountRole,
    ) -> Result<Account, AuthError> {
        let password_hash = self.hasher.spawn_hash(password).await?;
        let verification_code = generate_code()?;

        let account = self
            .store
            .insert(NewAccount {
                email: email.to_string(),
                password_hash,
                verification_code,
                role,
            })
            .await?;

        tracing::info!(account_id = %account.id, role = %account.role, "Account registered");

        Ok(account)
    }

    // ============================================
    // Email Verification
    // ============================================

    /// Verify an account with the code that was mailed to it
    pub async fn verify(&self, email: &str, code: &str) -> Result<Account, AuthError> {
        let mut account = self.find_by_email(email).await?;

        if !account.code_matches(code) {
            tracing::debug!(account_id = %account.id, "Verification code mismatch");
            return Err(AuthError::InvalidCode);
        }

        account.mark_verified();
        let account = self.store.save(&account).await?;

        tracing::info!(account_id = %account.id, "Account verified");

        Ok(account)
    }

    /// Replace the verification code of an unverified account, returning the new code
    pub async fn resend(&self, email: &str) -> Result<String, AuthError> {
        let mut account = self.find_by_email(email).await?;

        if account.is_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let code = generate_code()?;
        account.verification_code = Some(code.clone());
        self.store.save(&account).await?;

        tracing::info!(account_id = %account.id, "Verification code regenerated");

        Ok(code)
    }

    // ============================================
    // Administration
    // ============================================

    /// Apply the supplied fields of a partial update
    ///
    /// An empty role string counts as not supplied. A non-empty role that is
    /// not `"admin"` or `"standard"` is rejected.
    pub async fn admin_update(&self, id: Uuid, update: AccountUpdate) -> Result<Account, AuthError> {
        let mut account = self.find(id).await?;

        if let Some(role) = update.role.as_deref().filter(|r| !r.is_empty()) {
            account.role = AccountRole::parse(role)
                .ok_or_else(|| AuthError::Validation(format!("Unknown user type: {role}")))?;
        }

        if let Some(active) = update.is_active {
            account.is_active = active;
        }

        let account = self.store.save(&account).await?;

        tracing::info!(
            account_id = %account.id,
            role = %account.role,
            is_active = account.is_active,
            "Account updated"
        );

        Ok(account)
    }

    /// All accounts without their secrets
    pub async fn list_all(&self) -> Result<Vec<AccountSummary>, AuthError> {
        let accounts = self.store.find_all().await?;
        Ok(accounts.into_iter().map(AccountSummary::from).collect())
    }

    /// Get account by ID
    pub async fn find(&self, id: Uuid) -> Result<Account, AuthError> {
        self.store.find_by_id(id).await?.ok_or(AuthError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, AuthError> {
        self.store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)
    }
}

/// Credential checks for login
pub struct Authenticator {
    store: Arc<dyn AccountStore>,
    hasher: CredentialHasher,
    // Verified against when the email is unknown, at the configured cost
    placeholder_hash: String,
}

impl Authenticator {
    pub fn new(store: Arc<dyn AccountStore>, hasher: CredentialHasher) -> Result<Self, AuthError> {
        let placeholder_hash = hasher.hash("placeholder-credential")?;

        Ok(Self {
            store,
            hasher,
            placeholder_hash,
        })
    }

    /// Check credentials and verification state
    ///
    /// Unknown email and wrong password are indistinguishable. The
    /// verification gate applies only after the password matched. The active
    /// flag is not consulted.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let Some(account) = self.store.find_by_email(email).await? else {
            // Spend the same hashing work as a real mismatch
            self.hasher.spawn_verify(password, &self.placeholder_hash).await;
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.spawn_verify(password, &account.password_hash).await {
            tracing::debug!(account_id = %account.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        if !account.is_verified {
            return Err(AuthError::NotVerified);
        }

        tracing::info!(account_id = %account.id, "Account authenticated");

        Ok(account)
    }
}

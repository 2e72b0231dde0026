//! Account Persistence
//!
//! The [`AccountStore`] trait is the only way the account services reach
//! storage. Implementations must enforce email uniqueness and report a clash
//! as [`StoreError::DuplicateKey`].

use crate::error::StoreError;
use crate::models::{Account, NewAccount};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Account persistence collaborator
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Persist a new account
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Write back the mutable fields of an existing account
    async fn save(&self, account: &Account) -> Result<Account, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// All accounts in storage order
    async fn find_all(&self) -> Result<Vec<Account>, StoreError>;
}

// ============================================
// PostgreSQL
// ============================================

/// PostgreSQL-backed account store
#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the account schema if it does not exist yet
    pub async fn migrate(&self) -> Result<(), StoreError> {
        tracing::info!("Running account database migrations");

        sqlx::query(
            r#"
            DO $$ BEGIN
                CREATE TYPE account_role AS ENUM ('admin', 'standard');
            EXCEPTION
                WHEN duplicate_object THEN null;
            END $$;
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_verified BOOLEAN NOT NULL DEFAULT FALSE,
                verification_code VARCHAR(255),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                role account_role NOT NULL DEFAULT 'standard',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                seq BIGSERIAL
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        tracing::info!("Account migrations completed successfully");
        Ok(())
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, is_verified, verification_code, \
                               is_active, role, created_at, updated_at";

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            "INSERT INTO accounts (id, email, password_hash, verification_code, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ACCOUNT_COLUMNS}"
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(Uuid::new_v4())
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.verification_code)
            .bind(account.role)
            .fetch_one(&self.db)
            .await?;

        Ok(account)
    }

    async fn save(&self, account: &Account) -> Result<Account, StoreError> {
        let query = format!(
            "UPDATE accounts SET is_verified = $2, verification_code = $3, is_active = $4, \
             role = $5, updated_at = NOW() WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(account.id)
            .bind(account.is_verified)
            .bind(&account.verification_code)
            .bind(account.is_active)
            .bind(account.role)
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");

        let account = sqlx::query_as(&query)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");

        let account = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY seq");

        let accounts = sqlx::query_as(&query).fetch_all(&self.db).await?;
        Ok(accounts)
    }
}

// ============================================
// In-Memory
// ============================================

/// Process-local account store, kept in insertion order
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<Vec<Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        // Check and insert under one lock so concurrent duplicates cannot both succeed
        let mut accounts = self.accounts.write().await;

        if accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::DuplicateKey);
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: account.email,
            password_hash: account.password_hash,
            is_verified: false,
            verification_code: Some(account.verification_code),
            is_active: true,
            role: account.role,
            created_at: now,
            updated_at: now,
        };

        accounts.push(account.clone());
        Ok(account)
    }

    async fn save(&self, account: &Account) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;

        let stored = accounts
            .iter_mut()
            .find(|a| a.id == account.id)
            .ok_or(StoreError::NotFound)?;

        stored.is_verified = account.is_verified;
        stored.verification_code = account.verification_code.clone();
        stored.is_active = account.is_active;
        stored.role = account.role;
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.accounts.read().await.clone())
    }
}

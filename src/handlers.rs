//! Account HTTP Handlers
//!
//! REST API endpoints for registration, verification, login and account
//! administration.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::extractors::{AdminAccount, JsonBody};
use crate::mailer::{self, Mailer};
use crate::middleware;
use crate::models::*;
use crate::password::CredentialHasher;
use crate::service::{AccountService, Authenticator};
use crate::store::AccountStore;
use crate::token::TokenIssuer;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub authenticator: Arc<Authenticator>,
    pub tokens: Arc<TokenIssuer>,
    pub mailer: Arc<dyn Mailer>,
    pub verify_url: Arc<str>,
}

impl AppState {
    /// Wire the services around an injected store and mailer
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AuthError> {
        let hasher = CredentialHasher::new(config)?;

        Ok(Self {
            accounts: Arc::new(AccountService::new(store.clone(), hasher.clone())),
            authenticator: Arc::new(Authenticator::new(store, hasher)?),
            tokens: Arc::new(TokenIssuer::new(config)),
            mailer,
            verify_url: Arc::from(config.mail.verify_url.as_str()),
        })
    }
}

// ============================================
// Route Builder
// ============================================

/// Create account routes
pub fn create_routes(state: AppState) -> Router {
    // Public routes (no authentication required)
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", post(verify))
        .route("/auth/resend", post(resend_verification));

    // Admin routes (require a session belonging to an admin)
    let admin = Router::new()
        .route("/admin/users", post(admin_create_user))
        .route("/admin/users/:id", put(update_user))
        .route("/users", get(list_users))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new().merge(public).merge(admin).with_state(state)
}

fn validate<T: Validate>(req: &T) -> Result<(), AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))
}

// ============================================
// Registration & Verification
// ============================================

/// POST /auth/register
///
/// Register a new account and mail its verification code
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate(&req)?;

    let account = state
        .accounts
        .register(&req.email, &req.password, req.role.as_deref())
        .await?;

    // The account stays registered even if delivery fails
    let code = account.verification_code.as_deref().unwrap_or_default();
    let email = mailer::verification_code_email(code);
    if let Err(e) = state.mailer.send(&account.email, &email.subject, &email.html).await {
        tracing::warn!(account_id = %account.id, "Verification email failed after registration");
        return Err(e);
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "User registered. Check your email to verify your account.",
        )),
    ))
}

/// POST /auth/verify
///
/// Verify an account with its emailed code
pub async fn verify(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<VerifyRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate(&req)?;

    state.accounts.verify(&req.email, &req.token).await?;

    Ok(Json(MessageResponse::new("Email verified successfully")))
}

/// POST /auth/resend
///
/// Issue and mail a fresh verification code
pub async fn resend_verification(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResendRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate(&req)?;

    let code = state.accounts.resend(&req.email).await?;

    let email = mailer::verification_code_email(&code);
    state.mailer.send(&req.email, &email.subject, &email.html).await?;

    Ok(Json(MessageResponse::new(
        "Verification code resent successfully",
    )))
}

// ============================================
// Login
// ============================================

/// POST /auth/login
///
/// Authenticate and return a session token
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate(&req)?;

    let account = state
        .authenticator
        .authenticate(&req.email, &req.password)
        .await?;

    let issued = state.tokens.issue(account.id)?;

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
    }))
}

// ============================================
// Administration
// ============================================

/// POST /admin/users
///
/// Create an account and mail it a verification link
pub async fn admin_create_user(
    State(state): State<AppState>,
    AdminAccount(admin): AdminAccount,
    JsonBody(req): JsonBody<AdminCreateRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate(&req)?;

    let account = state.accounts.admin_create(&req.email, &req.password).await?;

    tracing::info!(admin_id = %admin.id, account_id = %account.id, "Account created by admin");

    let code = account.verification_code.as_deref().unwrap_or_default();
    let email = mailer::verification_link_email(&state.verify_url, code, &account.email)?;
    state
        .mailer
        .send(&account.email, &email.subject, &email.html)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "User created and verification email sent.",
        )),
    ))
}

/// PUT /admin/users/:id
///
/// Change an account's role and/or active flag
pub async fn update_user(
    State(state): State<AppState>,
    AdminAccount(_admin): AdminAccount,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AccountUpdate>,
) -> Result<impl IntoResponse, AuthError> {
    let id: Uuid = id
        .parse()
        .map_err(|_| AuthError::Validation("Invalid user ID".to_string()))?;

    state.accounts.admin_update(id, req).await?;

    Ok(Json(MessageResponse::new("User updated successfully")))
}

/// GET /users
///
/// List all accounts without their secrets
pub async fn list_users(
    State(state): State<AppState>,
    AdminAccount(_admin): AdminAccount,
) -> Result<impl IntoResponse, AuthError> {
    let accounts = state.accounts.list_all().await?;
    Ok(Json(accounts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::mailer::testing::RecordingMailer;
    use crate::store::MemoryAccountStore;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        store: Arc<MemoryAccountStore>,
        mailer: Arc<RecordingMailer>,
    }

    fn harness_with(mailer: RecordingMailer) -> Harness {
        let store = Arc::new(MemoryAccountStore::new());
        let mailer = Arc::new(mailer);
        let state = AppState::new(&test_config(), store.clone(), mailer.clone()).unwrap();

        Harness {
            app: create_routes(state),
            store,
            mailer,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingMailer::default())
    }

    impl Harness {
        async fn call(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }

            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response: Response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, value)
        }

        async fn call_raw(&self, uri: &str, content_type: &str, body: &str) -> (StatusCode, Value) {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body.to_string()))
                .unwrap();

            let response: Response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }

        async fn code_for(&self, email: &str) -> String {
            self.store
                .find_by_email(email)
                .await
                .unwrap()
                .unwrap()
                .verification_code
                .unwrap()
        }

        /// Register, verify and log in, returning the session token
        async fn signed_in(&self, email: &str, role: &str) -> String {
            let (status, _) = self
                .call(
                    "POST",
                    "/auth/register",
                    None,
                    Some(json!({ "email": email, "password": "pw123", "type": role })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);

            let code = self.code_for(email).await;
            let (status, _) = self
                .call(
                    "POST",
                    "/auth/verify",
                    None,
                    Some(json!({ "email": email, "token": code })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);

            let (status, body) = self
                .call(
                    "POST",
                    "/auth/login",
                    None,
                    Some(json!({ "email": email, "password": "pw123" })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            body["token"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn test_register_verify_login() {
        let h = harness();

        let (status, _) = h
            .call(
                "POST",
                "/auth/register",
                None,
                Some(json!({ "email": "alice@x.com", "password": "pw123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let code = h.code_for("alice@x.com").await;
        let sent = h.mailer.last().await.unwrap();
        assert_eq!(sent.to, "alice@x.com");
        assert!(sent.html.contains(&code));

        let (status, body) = h
            .call(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "email": "alice@x.com", "password": "pw123" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "account_not_verified");

        let (status, _) = h
            .call(
                "POST",
                "/auth/verify",
                None,
                Some(json!({ "email": "alice@x.com", "token": code })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = h
            .call(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "email": "alice@x.com", "password": "pw123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
        assert!(body["token"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_register_duplicate_and_invalid() {
        let h = harness();
        let body = json!({ "email": "alice@x.com", "password": "pw123" });

        let (status, _) = h.call("POST", "/auth/register", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, resp) = h.call("POST", "/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(resp["error"], "user_exists");
        assert_eq!(h.store.len().await, 1);

        let (status, resp) = h
            .call(
                "POST",
                "/auth/register",
                None,
                Some(json!({ "email": "not-an-email", "password": "pw123" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_mail_failure_keeps_account() {
        let h = harness_with(RecordingMailer::failing());

        let (status, body) = h
            .call(
                "POST",
                "/auth/register",
                None,
                Some(json!({ "email": "alice@x.com", "password": "pw123" })),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "email_send_failed");
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_verify_and_resend_errors() {
        let h = harness();

        let (status, body) = h
            .call(
                "POST",
                "/auth/verify",
                None,
                Some(json!({ "email": "nobody@x.com", "token": "12345" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "user_not_found");

        h.signed_in("alice@x.com", "standard").await;

        let (status, body) = h
            .call(
                "POST",
                "/auth/verify",
                None,
                Some(json!({ "email": "alice@x.com", "token": "12345" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_token");

        let (status, body) = h
            .call(
                "POST",
                "/auth/resend",
                None,
                Some(json!({ "email": "alice@x.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "already_verified");
    }

    #[tokio::test]
    async fn test_resend_mails_new_code() {
        let h = harness();
        h.call(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": "alice@x.com", "password": "pw123" })),
        )
        .await;

        let (status, _) = h
            .call(
                "POST",
                "/auth/resend",
                None,
                Some(json!({ "email": "alice@x.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let code = h.code_for("alice@x.com").await;
        assert!(h.mailer.last().await.unwrap().html.contains(&code));
        assert_eq!(h.mailer.sent.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let h = harness();
        h.signed_in("alice@x.com", "standard").await;

        let (status, body) = h
            .call(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "email": "alice@x.com", "password": "nope" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "auth_error");
    }

    #[tokio::test]
    async fn test_admin_routes_require_session() {
        let h = harness();

        let (status, body) = h.call("GET", "/users", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, _) = h.call("GET", "/users", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = h.signed_in("bob@x.com", "standard").await;
        let (status, body) = h.call("GET", "/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }

    #[tokio::test]
    async fn test_admin_list_create_update() {
        let h = harness();
        let token = h.signed_in("root@x.com", "admin").await;

        let (status, _) = h
            .call(
                "POST",
                "/admin/users",
                Some(&token),
                Some(json!({ "email": "new@x.com", "password": "pw123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let code = h.code_for("new@x.com").await;
        let sent = h.mailer.last().await.unwrap();
        assert_eq!(sent.subject, "Verify your email");
        assert!(sent.html.contains(&format!("token={code}")));

        let (status, body) = h.call("GET", "/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1]["email"], "new@x.com");
        assert_eq!(users[1]["user_type"], "standard");
        assert!(users[1].get("password_hash").is_none());
        assert!(users[1].get("verification_code").is_none());

        let id = users[1]["id"].as_str().unwrap().to_string();
        let (status, _) = h
            .call(
                "PUT",
                &format!("/admin/users/{id}"),
                Some(&token),
                Some(json!({ "is_active": false })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let stored = h.store.find_by_email("new@x.com").await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.role, AccountRole::Standard);

        let (status, body) = h
            .call(
                "PUT",
                "/admin/users/not-a-uuid",
                Some(&token),
                Some(json!({ "is_active": true })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid user ID");

        let (status, _) = h
            .call(
                "PUT",
                &format!("/admin/users/{}", Uuid::new_v4()),
                Some(&token),
                Some(json!({ "is_active": true })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_field_is_validation_error() {
        let h = harness();

        let (status, body) = h
            .call("POST", "/auth/register", None, Some(json!({ "password": "pw" })))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert!(body["message"].as_str().unwrap().contains("email"));
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let h = harness();

        for uri in ["/auth/register", "/auth/login", "/auth/verify", "/auth/resend"] {
            let (status, body) = h.call_raw(uri, "application/json", "not json").await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "validation_error", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_validation_error() {
        let h = harness();

        let (status, body) = h
            .call_raw(
                "/auth/login",
                "text/plain",
                r#"{"email": "alice@x.com", "password": "pw123"}"#,
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_admin_update_with_bad_body_is_validation_error() {
        let h = harness();
        let admin = h.signed_in("root@x.com", "admin").await;
        let target = h.store.find_by_email("root@x.com").await.unwrap().unwrap();

        let request = Request::builder()
            .method("PUT")
            .uri(format!("/admin/users/{}", target.id))
            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"is_active": "nope"}"#))
            .unwrap();

        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "validation_error");
    }
}

// Access guard and role restriction for protected routes

use crate::accounts::{
    error::AccountError,
    models::{Account, Role},
    store::CredentialStore,
};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

/// Name of the HTTP-only cookie carrying the session token
pub const SESSION_COOKIE: &str = "token";

/// Pull the session token out of a request: `Authorization: Bearer` header
/// first, session cookie second.
fn extract_token(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    CookieJar::from_headers(request.headers())
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Access guard applied to protected routes.
///
/// Validates the session token's signature and expiry, then re-resolves the
/// account by id on every request so role changes and deleted accounts take
/// effect immediately. The resolved account is attached to the request
/// extensions for downstream handlers. Verification state is NOT re-checked
/// here; only login checks it.
pub async fn access_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AccountError> {
    let endpoint = request.uri().path().to_string();

    let token = match extract_token(&request) {
        Some(token) => token,
        None => {
            warn!("Missing session token for protected endpoint: {}", endpoint);
            return Err(AccountError::MissingToken);
        }
    };

    let claims = state.tokens.validate_session_token(&token)?;

    let account = state
        .store
        .find_by_id(claims.sub)
        .await?
        .ok_or(AccountError::AccountGone)?;

    debug!(
        "Authenticated account {} for endpoint {}",
        account.id, endpoint
    );

    request.extensions_mut().insert(account);
    Ok(next.run(request).await)
}

/// Role restriction parameterized by an allow-set of roles.
///
/// Runs after the access guard and checks the resolved account's role
/// against the allow-set.
#[derive(Debug, Clone)]
pub struct RequireRole {
    allowed: Vec<Role>,
}

impl RequireRole {
    /// Create a restriction allowing the given set of roles
    pub fn new(allowed: impl Into<Vec<Role>>) -> Self {
        Self {
            allowed: allowed.into(),
        }
    }

    /// Restriction allowing only admins
    pub fn admin() -> Self {
        Self::new([Role::Admin])
    }

    /// Restriction allowing any authenticated account
    pub fn any_user() -> Self {
        Self::new([Role::User, Role::Admin])
    }

    /// Middleware function enforcing the allow-set
    pub async fn middleware(self, request: Request, next: Next) -> Result<Response, AccountError> {
        let endpoint = request.uri().path().to_string();

        let account = request.extensions().get::<Account>().ok_or_else(|| {
            AccountError::Internal(
                "role restriction applied without access guard".to_string(),
            )
        })?;

        if !self.allowed.contains(&account.role) {
            warn!(
                "Authorization failed: account={}, role={}, endpoint={}",
                account.id, account.role, endpoint
            );
            return Err(AccountError::Forbidden);
        }

        debug!(
            "Authorization successful: account={}, role={}, endpoint={}",
            account.id, account.role, endpoint
        );
        Ok(next.run(request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::notify::mock::MockDispatcher;
    use crate::accounts::service::AccountService;
    use crate::accounts::store::{memory::MemoryStore, CredentialStore};
    use crate::accounts::token::{Claims, TokenService};
    use crate::config::AppConfig;
    use axum::{middleware, routing::get, Extension, Json, Router};
    use axum::http::{HeaderValue, StatusCode};
    use axum_test::TestServer;
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use uuid::Uuid;

    const TEST_SECRET: &str = "test_secret_key_for_testing_purposes";

    fn test_config() -> AppConfig {
        AppConfig {
            database_url: "postgres://unused".to_string(),
            host: "127.0.0.1".to_string(),
            port: "0".to_string(),
            base_url: "http://localhost:8080".to_string(),
            jwt_secret: TEST_SECRET.to_string(),
            session_ttl_seconds: 86_400,
            cookie_secure: false,
        }
    }

    fn test_state(store: Arc<MemoryStore>) -> AppState {
        let tokens = TokenService::new(TEST_SECRET.to_string());
        let dispatcher = Arc::new(MockDispatcher::new());
        let service = AccountService::new(store.clone(), dispatcher, tokens.clone());
        AppState {
            store,
            service,
            tokens,
            config: Arc::new(test_config()),
        }
    }

    async fn whoami(Extension(account): Extension<Account>) -> Json<Value> {
        Json(json!({ "email": account.email, "role": account.role }))
    }

    fn test_app(state: AppState) -> TestServer {
        let admin_routes = Router::new()
            .route("/admin", get(whoami))
            .route_layer(middleware::from_fn(|request, next| {
                RequireRole::admin().middleware(request, next)
            }));

        let app = Router::new()
            .route("/protected", get(whoami))
            .merge(admin_routes)
            .route_layer(middleware::from_fn_with_state(state.clone(), access_guard))
            .with_state(state);

        TestServer::new(app).unwrap()
    }

    /// Seed an account directly through the store and return it with a
    /// valid session token.
    async fn seed_account(
        store: &Arc<MemoryStore>,
        email: &str,
        role: Role,
    ) -> (Account, String) {
        let created = store
            .create(crate::accounts::models::NewAccount {
                name: "Test".to_string(),
                email: email.to_string(),
                password_hash: "hash".to_string(),
                verification_token: TokenService::generate_opaque_token(),
            })
            .await
            .unwrap();

        let mut account = created;
        account.role = role;
        account.is_verified = true;
        let account = store.save(&account).await.unwrap();

        let token = TokenService::new(TEST_SECRET.to_string())
            .generate_session_token(&account)
            .unwrap();
        (account, token)
    }

    fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_bearer_token_is_accepted() {
        let store = Arc::new(MemoryStore::new());
        let (_account, token) = seed_account(&store, "ann@x.com", Role::User).await;
        let server = test_app(test_state(store));

        let response = server
            .get("/protected")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["email"], "ann@x.com");
        assert_eq!(body["role"], "user");
    }

    #[tokio::test]
    async fn test_cookie_token_is_accepted() {
        let store = Arc::new(MemoryStore::new());
        let (_account, token) = seed_account(&store, "ann@x.com", Role::User).await;
        let server = test_app(test_state(store));

        let response = server
            .get("/protected")
            .add_header(
                header::COOKIE,
                HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, token)).unwrap(),
            )
            .await;

        response.assert_status_ok();
    }

    #[tokio::test]
    async fn test_header_takes_precedence_over_cookie() {
        let store = Arc::new(MemoryStore::new());
        let (_ann, ann_token) = seed_account(&store, "ann@x.com", Role::User).await;
        let (_bob, bob_token) = seed_account(&store, "bob@x.com", Role::User).await;
        let server = test_app(test_state(store));

        let response = server
            .get("/protected")
            .add_header(header::AUTHORIZATION, bearer(&ann_token))
            .add_header(
                header::COOKIE,
                HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, bob_token)).unwrap(),
            )
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["email"], "ann@x.com");
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let server = test_app(test_state(store));

        let response = server.get("/protected").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error_code"], "NOT_LOGGED_IN");
    }

    #[tokio::test]
    async fn test_token_signed_with_different_key_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (account, _token) = seed_account(&store, "ann@x.com", Role::User).await;
        let server = test_app(test_state(store));

        let foreign = TokenService::new("some_other_secret".to_string())
            .generate_session_token(&account)
            .unwrap();

        let response = server
            .get("/protected")
            .add_header(header::AUTHORIZATION, bearer(&foreign))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error_code"], "INVALID_SESSION");
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (account, _token) = seed_account(&store, "ann@x.com", Role::User).await;
        let server = test_app(test_state(store));

        let claims = Claims {
            sub: account.id,
            email: account.email.clone(),
            role: account.role,
            iat: Utc::now().timestamp() - 1000,
            exp: Utc::now().timestamp() - 500, // Expired 500 seconds ago
        };
        let expired = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let response = server
            .get("/protected")
            .add_header(header::AUTHORIZATION, bearer(&expired))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error_code"], "SESSION_EXPIRED");
    }

    #[tokio::test]
    async fn test_token_for_deleted_account_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let server = test_app(test_state(store));

        // Valid signature, but the subject never existed in the store
        let ghost = Account {
            id: Uuid::new_v4(),
            name: "Ghost".to_string(),
            email: "ghost@x.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
            is_verified: true,
            verification_token: None,
            reset_password_token: None,
            reset_password_expires: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let token = TokenService::new(TEST_SECRET.to_string())
            .generate_session_token(&ghost)
            .unwrap();

        let response = server
            .get("/protected")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error_code"], "ACCOUNT_GONE");
    }

    #[tokio::test]
    async fn test_admin_route_denies_user_role() {
        let store = Arc::new(MemoryStore::new());
        let (_account, token) = seed_account(&store, "ann@x.com", Role::User).await;
        let server = test_app(test_state(store));

        let response = server
            .get("/admin")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["error_code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_admin_route_allows_admin_role() {
        let store = Arc::new(MemoryStore::new());
        let (_account, token) = seed_account(&store, "root@x.com", Role::Admin).await;
        let server = test_app(test_state(store));

        let response = server
            .get("/admin")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["role"], "admin");
    }

    #[tokio::test]
    async fn test_role_change_takes_effect_on_next_request() {
        // The guard re-resolves the account on every request, so a token
        // minted before a role change carries the new role's permissions.
        let store = Arc::new(MemoryStore::new());
        let (account, token) = seed_account(&store, "ann@x.com", Role::User).await;
        let state = test_state(store.clone());
        let server = test_app(state);

        let response = server
            .get("/admin")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let mut promoted = store.get(account.id).unwrap();
        promoted.role = Role::Admin;
        store.save(&promoted).await.unwrap();

        let response = server
            .get("/admin")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status_ok();
    }
}

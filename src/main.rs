mod accounts;
mod config;
mod db;
mod validation;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use accounts::{
    access_guard, handlers, AccountService, CredentialStore, LogDispatcher,
    NotificationDispatcher, PgCredentialStore, TokenService,
};
use config::AppConfig;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        accounts::handlers::register,
        accounts::handlers::login,
        accounts::handlers::logout,
        accounts::handlers::verify_email,
        accounts::handlers::forgot_password,
        accounts::handlers::reset_password,
        accounts::handlers::me,
        accounts::handlers::update_profile,
    ),
    components(
        schemas(
            accounts::models::RegisterRequest,
            accounts::models::LoginRequest,
            accounts::models::ForgotPasswordRequest,
            accounts::models::ResetPasswordRequest,
            accounts::models::UpdateProfileRequest,
            accounts::models::AccountResponse,
            accounts::models::RegisterResponse,
            accounts::models::SessionResponse,
            accounts::models::MessageResponse,
            accounts::models::Role,
        )
    ),
    tags(
        (name = "users", description = "Account registration, session, and profile endpoints")
    ),
    info(
        title = "Account API",
        version = "1.0.0",
        description = "User-account and session service: registration with email verification, credential login, password reset, and role-based profile access",
        contact(
            name = "API Support",
            email = "support@accountapi.com"
        )
    )
)]
struct ApiDoc;

/// Application state shared across handlers
///
/// Everything here is read-only after startup; per-request mutation happens
/// only in the credential store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub service: AccountService,
    pub tokens: TokenService,
    pub config: Arc<AppConfig>,
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
fn create_router(state: AppState) -> Router {
    use axum::http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    };
    use tower_http::cors::CorsLayer;

    // Cookies require a concrete allowed origin; fall back to a permissive
    // layer when the configured base URL is not a valid header value
    let cors = match state.config.base_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
        Err(_) => CorsLayer::new(),
    };

    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route("/update-profile", patch(handlers::update_profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), access_guard));

    let public = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/verify/:token", get(handlers::verify_email))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password/:token", post(handlers::reset_password));

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // API routes
        .nest("/api/v1/users", public.merge(protected))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Account API - Starting...");

    // Configuration is read once here and never from ambient env afterwards
    let config = Arc::new(AppConfig::from_env());

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let store: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(db_pool));
    let dispatcher: Arc<dyn NotificationDispatcher> =
        Arc::new(LogDispatcher::new(config.base_url.clone()));
    let tokens =
        TokenService::with_session_ttl(config.jwt_secret.clone(), config.session_ttl_seconds);
    let service = AccountService::new(store.clone(), dispatcher, tokens.clone());

    let state = AppState {
        store,
        service,
        tokens,
        config: config.clone(),
    };
    let app = create_router(state);

    // Start the Axum server
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Account API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}

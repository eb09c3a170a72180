// Process-wide configuration, read once at startup

/// Application configuration loaded from the environment.
///
/// Loaded exactly once in `main` and shared through `AppState`; request
/// handling never reads ambient environment variables. Rotating
/// `jwt_secret` invalidates all outstanding session tokens.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: String,
    /// Public base URL embedded in verification/reset links.
    pub base_url: String,
    pub jwt_secret: String,
    /// Session token lifetime in seconds. Defaults to one day.
    pub session_ttl_seconds: i64,
    /// Whether session cookies carry the `Secure` attribute.
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Read configuration from environment variables.
    ///
    /// Panics when a required variable (`DATABASE_URL`, `JWT_SECRET`) is
    /// missing; this runs before the server accepts traffic.
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in environment");
        let jwt_secret = std::env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set in environment");
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));
        let session_ttl_seconds = std::env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(86_400);
        let cookie_secure = std::env::var("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Self {
            database_url,
            host,
            port,
            base_url,
            jwt_secret,
            session_ttl_seconds,
            cookie_secure,
        }
    }
}

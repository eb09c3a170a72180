// HTTP handlers for account endpoints

use crate::accounts::{
    error::AccountError,
    middleware::SESSION_COOKIE,
    models::{
        Account, AccountResponse, ForgotPasswordRequest, LoginRequest, MessageResponse,
        RegisterRequest, RegisterResponse, ResetPasswordRequest, SessionResponse,
        UpdateProfileRequest,
    },
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use validator::Validate;

/// Build the HTTP-only session cookie carrying a freshly issued token
fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(state.tokens.session_ttl()))
        .into()
}

/// Build a cookie that clears the session cookie on the client
fn removal_cookie(state: &AppState) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .into()
}

/// Response wrapper pairing a session body with its Set-Cookie header
pub struct IssuedSession {
    body: SessionResponse,
    cookie: Cookie<'static>,
}

impl IntoResponse for IssuedSession {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, Json(self.body)).into_response();
        if let Ok(value) = self.cookie.to_string().parse() {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        response
    }
}

/// Register a new account
/// POST /api/v1/users/register
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created; verification link dispatched", body = RegisterResponse),
        (status = 400, description = "Validation failure or email already registered")
    ),
    tag = "users"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AccountError> {
    payload.validate()?;

    let (account, verification_sent) = state
        .service
        .register(&payload.name, &payload.email, &payload.password)
        .await?;

    let message = if verification_sent {
        "Account registered. A verification link has been sent to your email".to_string()
    } else {
        "Account registered, but the verification email could not be delivered. \
         Please request a new link or contact support"
            .to_string()
    };

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message,
            verification_sent,
            account: account.into(),
        }),
    ))
}

/// Log in with email and password
/// POST /api/v1/users/login
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse,
         headers(("Set-Cookie" = String, description = "HTTP-only session cookie"))),
        (status = 400, description = "Validation failure"),
        (status = 401, description = "Invalid credentials or unverified account")
    ),
    tag = "users"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<IssuedSession, AccountError> {
    payload.validate()?;

    let (account, token) = state
        .service
        .login(&payload.email, &payload.password)
        .await?;

    let cookie = session_cookie(&state, token.clone());
    Ok(IssuedSession {
        body: SessionResponse {
            token,
            account: account.into(),
        },
        cookie,
    })
}

/// Log out by clearing the session cookie
/// GET /api/v1/users/logout
#[utoipa::path(
    get,
    path = "/api/v1/users/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    ),
    tag = "users"
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = removal_cookie(&state);
    let mut response = Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
    .into_response();
    if let Ok(value) = cookie.to_string().parse() {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// Consume a verification token
/// GET /api/v1/users/verify/:token
#[utoipa::path(
    get,
    path = "/api/v1/users/verify/{token}",
    params(("token" = String, Path, description = "Verification token from the emailed link")),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or already-used token")
    ),
    tag = "users"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, AccountError> {
    state.service.verify_email(&token).await?;
    Ok(Json(MessageResponse {
        message: "Email verified successfully".to_string(),
    }))
}

/// Request a password-reset link
/// POST /api/v1/users/forgot-password
#[utoipa::path(
    post,
    path = "/api/v1/users/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Generic success; never reveals whether the email exists", body = MessageResponse),
        (status = 400, description = "Missing or malformed email")
    ),
    tag = "users"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AccountError> {
    payload.validate()?;

    state.service.forgot_password(&payload.email).await?;

    Ok(Json(MessageResponse {
        message: "If that email address is registered, a password reset link has been sent"
            .to_string(),
    }))
}

/// Consume a reset token and set a new password
/// POST /api/v1/users/reset-password/:token
#[utoipa::path(
    post,
    path = "/api/v1/users/reset-password/{token}",
    params(("token" = String, Path, description = "Reset token from the emailed link")),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced; fresh session issued", body = SessionResponse,
         headers(("Set-Cookie" = String, description = "HTTP-only session cookie"))),
        (status = 400, description = "Invalid or expired token, or weak password")
    ),
    tag = "users"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<IssuedSession, AccountError> {
    payload.validate()?;

    let (account, session) = state
        .service
        .reset_password(&token, &payload.password)
        .await?;

    let cookie = session_cookie(&state, session.clone());
    Ok(IssuedSession {
        body: SessionResponse {
            token: session,
            account: account.into(),
        },
        cookie,
    })
}

/// Return the authenticated account
/// GET /api/v1/users/me
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "The authenticated account", body = AccountResponse),
        (status = 401, description = "Missing, invalid, or expired session token")
    ),
    tag = "users"
)]
pub async fn me(Extension(account): Extension<Account>) -> Json<AccountResponse> {
    Json(AccountResponse::from(&account))
}

/// Update the authenticated account's profile
/// PATCH /api/v1/users/update-profile
#[utoipa::path(
    patch,
    path = "/api/v1/users/update-profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated account", body = AccountResponse),
        (status = 400, description = "Validation failure"),
        (status = 401, description = "Missing, invalid, or expired session token")
    ),
    tag = "users"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(account): Extension<Account>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<AccountResponse>, AccountError> {
    payload.validate()?;

    let updated = state.service.update_profile(account, payload.name).await?;
    Ok(Json(updated.into()))
}

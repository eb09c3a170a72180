// Account and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

/// Error type covering the account state machine, token validation,
/// the access guard, and collaborator failures.
#[derive(Debug)]
pub enum AccountError {
    /// Missing or malformed input
    Validation(String),
    /// Duplicate email on registration
    EmailTaken,
    /// Unknown email or wrong password; the two cases are indistinguishable
    InvalidCredentials,
    /// Correct credentials but the account has not verified its email
    NotVerified,
    /// No session token on a protected request
    MissingToken,
    /// Session token failed signature or structural validation
    InvalidSessionToken,
    /// Session token past its expiry claim
    ExpiredSessionToken,
    /// Session token was valid but the account no longer exists
    AccountGone,
    /// Resolved account's role is not in the allow-set
    Forbidden,
    /// Unmatched or expired verification/reset token
    InvalidToken,
    /// Credential store failure
    Store(String),
    /// Notification dispatch failure
    Dispatch(String),
    /// Password hashing failure
    PasswordHash,
    /// Session token could not be signed
    TokenGeneration(String),
    /// Invariant violation inside the middleware pipeline
    Internal(String),
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AccountError::EmailTaken => write!(f, "User already exists"),
            AccountError::InvalidCredentials => write!(f, "Invalid email or password"),
            AccountError::NotVerified => write!(f, "Email is not verified"),
            AccountError::MissingToken => write!(f, "Missing authentication token"),
            AccountError::InvalidSessionToken => write!(f, "Invalid session token"),
            AccountError::ExpiredSessionToken => write!(f, "Session token has expired"),
            AccountError::AccountGone => write!(f, "Account for this token no longer exists"),
            AccountError::Forbidden => write!(f, "Insufficient permissions"),
            AccountError::InvalidToken => write!(f, "Invalid or expired token"),
            AccountError::Store(msg) => write!(f, "Store error: {}", msg),
            AccountError::Dispatch(msg) => write!(f, "Dispatch error: {}", msg),
            AccountError::PasswordHash => write!(f, "Password hashing error"),
            AccountError::TokenGeneration(msg) => write!(f, "Token generation error: {}", msg),
            AccountError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AccountError {}

impl AccountError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::EmailTaken => StatusCode::BAD_REQUEST,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::NotVerified => StatusCode::UNAUTHORIZED,
            AccountError::MissingToken => StatusCode::UNAUTHORIZED,
            AccountError::InvalidSessionToken => StatusCode::UNAUTHORIZED,
            AccountError::ExpiredSessionToken => StatusCode::UNAUTHORIZED,
            AccountError::AccountGone => StatusCode::UNAUTHORIZED,
            AccountError::Forbidden => StatusCode::FORBIDDEN,
            AccountError::InvalidToken => StatusCode::BAD_REQUEST,
            AccountError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AccountError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AccountError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            AccountError::TokenGeneration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AccountError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code included in every error response
    pub fn error_code(&self) -> &'static str {
        match self {
            AccountError::Validation(_) => "VALIDATION_ERROR",
            AccountError::EmailTaken => "CONFLICT",
            AccountError::InvalidCredentials => "INVALID_CREDENTIALS",
            AccountError::NotVerified => "NOT_VERIFIED",
            AccountError::MissingToken => "NOT_LOGGED_IN",
            AccountError::InvalidSessionToken => "INVALID_SESSION",
            AccountError::ExpiredSessionToken => "SESSION_EXPIRED",
            AccountError::AccountGone => "ACCOUNT_GONE",
            AccountError::Forbidden => "FORBIDDEN",
            AccountError::InvalidToken => "INVALID_TOKEN",
            AccountError::Store(_) => "STORE_ERROR",
            AccountError::Dispatch(_) => "DISPATCH_ERROR",
            AccountError::PasswordHash => "INTERNAL_ERROR",
            AccountError::TokenGeneration(_) => "INTERNAL_ERROR",
            AccountError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message; never contains internals
    pub fn client_message(&self) -> String {
        match self {
            AccountError::Validation(msg) => msg.clone(),
            AccountError::EmailTaken => "User already exists".to_string(),
            AccountError::InvalidCredentials => "Invalid email or password".to_string(),
            AccountError::NotVerified => {
                "Email is not verified. Please verify your email before logging in".to_string()
            }
            AccountError::MissingToken => {
                "You are not logged in. Please log in to access this resource".to_string()
            }
            AccountError::InvalidSessionToken => {
                "Invalid token. Please log in again".to_string()
            }
            AccountError::ExpiredSessionToken => {
                "Your token has expired. Please log in again".to_string()
            }
            AccountError::AccountGone => {
                "The account for this token no longer exists".to_string()
            }
            AccountError::Forbidden => {
                "You do not have permission to perform this action".to_string()
            }
            AccountError::InvalidToken => "Invalid or expired token".to_string(),
            AccountError::Store(_) => "Internal server error".to_string(),
            AccountError::Dispatch(_) => {
                "Could not send email. Please try again later".to_string()
            }
            AccountError::PasswordHash => "Internal server error".to_string(),
            AccountError::TokenGeneration(_) => "Internal server error".to_string(),
            AccountError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        match &self {
            AccountError::MissingToken => {
                warn!("Missing token on protected request");
            }
            AccountError::InvalidSessionToken => {
                warn!("Invalid session token attempt");
            }
            AccountError::ExpiredSessionToken => {
                warn!("Expired session token attempt");
            }
            AccountError::Forbidden => {
                warn!("Forbidden access attempt");
            }
            AccountError::Store(msg) => {
                error!("Credential store error: {}", msg);
            }
            AccountError::Dispatch(msg) => {
                error!("Notification dispatch error: {}", msg);
            }
            AccountError::PasswordHash => {
                error!("Password hashing error");
            }
            AccountError::TokenGeneration(msg) => {
                error!("Token generation error: {}", msg);
            }
            AccountError::Internal(msg) => {
                error!("Internal error: {}", msg);
            }
            _ => {}
        }

        let body = Json(json!({
            "error_code": self.error_code(),
            "message": self.client_message(),
        }));

        (self.status_code(), body).into_response()
    }
}

impl From<validator::ValidationErrors> for AccountError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AccountError::Validation(errors.to_string().replace('\n', "; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_are_indistinguishable() {
        // Unknown email and wrong password must map to the same code,
        // message, and status so callers cannot enumerate accounts.
        let a = AccountError::InvalidCredentials;
        let b = AccountError::InvalidCredentials;
        assert_eq!(a.status_code(), b.status_code());
        assert_eq!(a.error_code(), b.error_code());
        assert_eq!(a.client_message(), b.client_message());
    }

    #[test]
    fn test_collaborator_errors_hide_internals() {
        let err = AccountError::Store("connection refused on 10.0.0.3:5432".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.client_message().contains("10.0.0.3"));
    }

    #[test]
    fn test_session_errors_have_distinct_codes() {
        assert_ne!(
            AccountError::InvalidSessionToken.error_code(),
            AccountError::ExpiredSessionToken.error_code()
        );
    }

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(AccountError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AccountError::EmailTaken.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AccountError::InvalidToken.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AccountError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AccountError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AccountError::Dispatch("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

// Notification dispatcher contract
//
// Email transport is an external collaborator; the core only depends on the
// two-method contract below. Delivery failures are surfaced to the state
// machine, which applies a different rollback policy per operation.

use async_trait::async_trait;

/// Error returned when a notification could not be delivered
#[derive(Debug, thiserror::Error)]
#[error("notification dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Contract for delivering verification and password-reset links
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver a verification link embedding the given token
    async fn send_verification_email(&self, email: &str, token: &str)
        -> Result<(), DispatchError>;

    /// Deliver a password-reset link embedding the given token
    async fn send_password_reset_email(
        &self,
        email: &str,
        token: &str,
    ) -> Result<(), DispatchError>;
}

/// Dispatcher that writes delivery links to the log instead of sending mail.
///
/// Stands in for the real transport in development; the links are the same
/// ones a mail-backed dispatcher would embed.
pub struct LogDispatcher {
    base_url: String,
}

impl LogDispatcher {
    /// Create a new LogDispatcher rooted at the public base URL
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send_verification_email(
        &self,
        email: &str,
        token: &str,
    ) -> Result<(), DispatchError> {
        let link = format!("{}/api/v1/users/verify/{}", self.base_url, token);
        tracing::info!("Verification link for {}: {}", email, link);
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        email: &str,
        token: &str,
    ) -> Result<(), DispatchError> {
        let link = format!("{}/reset-password/{}", self.base_url, token);
        tracing::info!("Password reset link for {}: {}", email, link);
        Ok(())
    }
}

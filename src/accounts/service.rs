// Account state machine - business logic layer
//
// Accounts move Unverified -> Verified exactly once; there is no reverse
// transition. Verification and reset tokens are single-use: consumption is
// delegated to the store's atomic operations so concurrent attempts on the
// same token admit exactly one winner.

use crate::accounts::{
    error::AccountError,
    models::{Account, NewAccount},
    notify::NotificationDispatcher,
    password::PasswordService,
    store::CredentialStore,
    token::TokenService,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reset tokens are usable for one hour after issuance
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Account service coordinating registration, verification, login,
/// password reset, and profile updates
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    tokens: TokenService,
}

impl AccountService {
    /// Create a new AccountService
    pub fn new(
        store: Arc<dyn CredentialStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        tokens: TokenService,
    ) -> Self {
        Self {
            store,
            dispatcher,
            tokens,
        }
    }

    /// Register a new account in the unverified state.
    ///
    /// Creates the record with a hashed password and a pending verification
    /// token, then asks the dispatcher to deliver the verification link.
    /// Delivery failure does NOT roll back the registration; the returned
    /// flag tells the caller whether the link went out.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(Account, bool), AccountError> {
        let name = name.trim();
        let email = email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AccountError::Validation(
                "All fields are required".to_string(),
            ));
        }

        let password_hash = PasswordService::hash_password(password)?;
        let verification_token = TokenService::generate_opaque_token();

        // Email uniqueness is decided by the store, not checked here
        let account = self
            .store
            .create(NewAccount {
                name: name.to_string(),
                email,
                password_hash,
                verification_token: verification_token.clone(),
            })
            .await?;

        info!("Account registered: {} ({})", account.email, account.id);

        let verification_sent = match self
            .dispatcher
            .send_verification_email(&account.email, &verification_token)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Verification email for {} could not be delivered: {}",
                    account.email, e
                );
                false
            }
        };

        Ok((account, verification_sent))
    }

    /// Consume a verification token and mark the account verified.
    ///
    /// A second attempt with the same token fails: consumption cleared the
    /// stored value, so the lookup no longer matches.
    pub async fn verify_email(&self, token: &str) -> Result<Account, AccountError> {
        if token.trim().is_empty() {
            return Err(AccountError::Validation(
                "Verification token is required".to_string(),
            ));
        }

        match self.store.consume_verification_token(token).await? {
            Some(account) => {
                info!("Account verified: {} ({})", account.email, account.id);
                Ok(account)
            }
            None => Err(AccountError::InvalidToken),
        }
    }

    /// Validate credentials and issue a session token.
    ///
    /// Unknown email and wrong password both map to `InvalidCredentials`;
    /// callers cannot tell the two apart. A correct password on an
    /// unverified account fails with `NotVerified`.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Account, String), AccountError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let account = match self.store.find_by_email(&email).await? {
            Some(account) => account,
            None => {
                warn!("Login attempt for unknown email");
                return Err(AccountError::InvalidCredentials);
            }
        };

        if !PasswordService::verify_password(password, &account.password_hash)? {
            warn!("Login attempt with wrong password: {}", account.id);
            return Err(AccountError::InvalidCredentials);
        }

        if !account.is_verified {
            warn!("Login attempt on unverified account: {}", account.id);
            return Err(AccountError::NotVerified);
        }

        let token = self.tokens.generate_session_token(&account)?;
        info!("Account logged in: {} ({})", account.email, account.id);
        Ok((account, token))
    }

    /// Issue a password-reset token and deliver the reset link.
    ///
    /// An unknown email succeeds without creating a token or invoking the
    /// dispatcher, so responses never reveal whether an address is
    /// registered. When delivery fails the just-stored token is cleared:
    /// an undelivered reset token is a latent account-takeover risk, so
    /// unlike registration this path rolls back.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AccountError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AccountError::Validation("Email is required".to_string()));
        }

        let account = match self.store.find_by_email(&email).await? {
            Some(account) => account,
            None => {
                debug!("Password reset requested for unknown email");
                return Ok(());
            }
        };

        let token = TokenService::generate_opaque_token();
        let expires = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.store.set_reset_token(account.id, &token, expires).await?;

        if let Err(e) = self
            .dispatcher
            .send_password_reset_email(&account.email, &token)
            .await
        {
            if let Err(clear_err) = self.store.clear_reset_token(account.id).await {
                tracing::error!(
                    "Failed to clear reset token after dispatch failure for {}: {}",
                    account.id,
                    clear_err
                );
            }
            return Err(AccountError::Dispatch(e.to_string()));
        }

        info!("Password reset link issued for account {}", account.id);
        Ok(())
    }

    /// Consume an unexpired reset token and replace the password.
    ///
    /// Unknown and expired tokens are indistinguishable to the caller. On
    /// success both reset fields are cleared and a fresh session token is
    /// issued, so the caller is logged in after the reset.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(Account, String), AccountError> {
        if token.trim().is_empty() || new_password.is_empty() {
            return Err(AccountError::Validation(
                "Reset token and new password are required".to_string(),
            ));
        }
        if new_password.len() < 6 {
            return Err(AccountError::Validation(
                "Password must be at least 6 characters long".to_string(),
            ));
        }

        let password_hash = PasswordService::hash_password(new_password)?;

        match self.store.consume_reset_token(token, &password_hash).await? {
            Some(account) => {
                let session = self.tokens.generate_session_token(&account)?;
                info!("Password reset completed for account {}", account.id);
                Ok((account, session))
            }
            None => Err(AccountError::InvalidToken),
        }
    }

    /// Update the mutable profile fields of an account.
    ///
    /// Only `name` is updatable; identity fields (email) and security
    /// fields are out of reach of this operation.
    pub async fn update_profile(
        &self,
        mut account: Account,
        name: Option<String>,
    ) -> Result<Account, AccountError> {
        let Some(name) = name else {
            return Err(AccountError::Validation(
                "No updatable fields provided".to_string(),
            ));
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(AccountError::Validation(
                "Name must not be empty".to_string(),
            ));
        }

        account.name = name.to_string();
        let saved = self.store.save(&account).await?;
        debug!("Profile updated for account {}", saved.id);
        Ok(saved)
    }
}

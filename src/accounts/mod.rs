// Accounts module
// Registration with email verification, credential login issuing signed
// session tokens, password reset, and role-gated profile access

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use error::AccountError;
pub use middleware::{access_guard, RequireRole};
pub use models::{Account, AccountResponse, Role};
pub use notify::{LogDispatcher, NotificationDispatcher};
pub use service::AccountService;
pub use store::{CredentialStore, PgCredentialStore};
pub use token::TokenService;

// Token issuance and validation service
//
// Two token families with different guarantees:
// - session tokens: signed JWTs, self-contained, validated without a store
//   lookup (the access guard still re-resolves the account by id)
// - opaque tokens (verification, password reset): pure random bytes,
//   validated only by store lookup

use crate::accounts::{error::AccountError, models::{Account, Role}};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of random bytes in an opaque token (256 bits of entropy)
const OPAQUE_TOKEN_BYTES: usize = 32;

/// Default session token lifetime: one day
const DEFAULT_SESSION_TTL_SECONDS: i64 = 86_400;

/// Session token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Token service for session token signing and opaque token generation
///
/// The signing secret is process-wide configuration read once at startup;
/// rotating it invalidates all outstanding session tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    session_ttl: i64,
}

impl TokenService {
    /// Create a new TokenService with the default one-day session lifetime
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            session_ttl: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    /// Create a TokenService with a custom session lifetime in seconds
    pub fn with_session_ttl(secret: String, ttl_seconds: i64) -> Self {
        Self {
            secret,
            session_ttl: ttl_seconds,
        }
    }

    /// Session token lifetime in seconds
    pub fn session_ttl(&self) -> i64 {
        self.session_ttl
    }

    /// Generate a signed session token for an account
    pub fn generate_session_token(&self, account: &Account) -> Result<String, AccountError> {
        let now = Utc::now().timestamp();

        let claims = Claims {
            sub: account.id,
            email: account.email.clone(),
            role: account.role,
            iat: now,
            exp: now + self.session_ttl,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AccountError::TokenGeneration(e.to_string()))
    }

    /// Validate a session token's signature and expiry
    pub fn validate_session_token(&self, token: &str) -> Result<Claims, AccountError> {
        let validation = Validation::default();

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            if e.to_string().contains("ExpiredSignature") {
                AccountError::ExpiredSessionToken
            } else {
                AccountError::InvalidSessionToken
            }
        })
    }

    /// Generate an opaque random token for email verification or password
    /// reset: 32 bytes from the OS RNG, hex encoded. Not self-describing;
    /// validated only by store lookup.
    pub fn generate_opaque_token() -> String {
        let mut bytes = [0u8; OPAQUE_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

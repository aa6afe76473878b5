/// Signed-token claims
///
/// Payload of every signed token the platform issues (RFC 7519 registered
/// claims plus a `purpose` discriminator). Access tokens carry a numeric
/// user id in `sub`; password-reset tokens carry the target email.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AuthError};

/// What a signed token is allowed to be used for.
///
/// Bound into the signature like every other claim, so an access token can
/// never be replayed as a reset token or vice versa.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Access,
    PasswordReset,
}

/// Claims for signed tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: user id (access) or email (password reset)
    pub sub: String,
    /// Token purpose discriminator
    pub purpose: TokenPurpose,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create access-token claims for a user
    pub fn new_access(user_id: i64, expiry_seconds: i64, issuer: String) -> Self {
        Self::new(user_id.to_string(), TokenPurpose::Access, expiry_seconds, issuer)
    }

    /// Create password-reset claims bound to an email
    pub fn new_reset(email: String, expiry_seconds: i64, issuer: String) -> Self {
        Self::new(email, TokenPurpose::PasswordReset, expiry_seconds, issuer)
    }

    fn new(sub: String, purpose: TokenPurpose, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub,
            purpose,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    /// Extract the numeric user id from access-token claims
    ///
    /// # Errors
    /// Returns error if the subject is not a numeric id
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::Auth(AuthError::InvalidToken))
    }

    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}

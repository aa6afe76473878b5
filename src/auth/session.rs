/// Session Lifecycle
///
/// Issuance, rotation, and revocation of the access/refresh token pair.
/// Credential verification happens before these functions are called; they
/// assume an already-authenticated user id.

use serde::Serialize;

use crate::auth::jwt::generate_access_token;
use crate::auth::refresh_token::{generate_refresh_token, hash_token, RefreshTokenStore};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Plaintext token pair returned to the authenticated caller and nobody else
#[derive(Debug, Serialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mint an access/refresh token pair for a user and persist the session
///
/// The refresh token is an opaque random value validated later by store
/// lookup, not by decoding. Only its SHA-256 digest reaches the store, and
/// neither token is ever logged.
///
/// # Errors
/// Returns error if token generation or persistence fails
pub async fn issue_session<S>(
    store: &S,
    user_id: i64,
    config: &JwtSettings,
) -> Result<SessionTokens, AppError>
where
    S: RefreshTokenStore + ?Sized,
{
    let access_token = generate_access_token(user_id, config)?;
    let refresh_token = generate_refresh_token();

    store.create(user_id, &hash_token(&refresh_token)).await?;

    tracing::info!(user_id = user_id, "Session issued");

    Ok(SessionTokens {
        access_token,
        refresh_token,
    })
}

/// Rotate a session: exchange a valid refresh token for a new token pair
///
/// The presented token must match the stored digest for the user. The swap
/// is a single compare-and-swap write, so a replayed or raced token loses
/// to whichever rotation landed first and is rejected.
///
/// # Errors
/// - `AuthError::InvalidSession` if the user has no stored session, the
///   presented token does not match, or a concurrent rotation won the swap
pub async fn refresh_session<S>(
    store: &S,
    user_id: i64,
    presented: &str,
    config: &JwtSettings,
) -> Result<SessionTokens, AppError>
where
    S: RefreshTokenStore + ?Sized,
{
    let record = store
        .find_by_user(user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidSession))?;

    let presented_digest = hash_token(presented);
    if record.refresh_token != presented_digest {
        tracing::warn!(user_id = user_id, "Stale or unknown refresh token presented");
        return Err(AppError::Auth(AuthError::InvalidSession));
    }

    let new_refresh_token = generate_refresh_token();
    let rotated = store
        .rotate(user_id, &presented_digest, &hash_token(&new_refresh_token))
        .await?;
    if rotated == 0 {
        // Lost the race against a concurrent rotation
        tracing::warn!(user_id = user_id, "Refresh rotation lost to concurrent use");
        return Err(AppError::Auth(AuthError::InvalidSession));
    }

    let access_token = generate_access_token(user_id, config)?;

    tracing::info!(user_id = user_id, "Session rotated");

    Ok(SessionTokens {
        access_token,
        refresh_token: new_refresh_token,
    })
}

/// Revoke a user's session (explicit logout)
///
/// Removing a record that no longer exists is not an error.
pub async fn revoke_session<S>(store: &S, user_id: i64) -> Result<(), AppError>
where
    S: RefreshTokenStore + ?Sized,
{
    if let Some(record) = store.find_by_user(user_id).await? {
        store.delete(record.id).await?;
        tracing::info!(user_id = user_id, "Session revoked");
    }

    Ok(())
}

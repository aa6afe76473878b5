/// Password Reset Flow
///
/// Stateless reset tokens: a short-TTL signed token bound to an email,
/// delivered out-of-band and redeemed once for a password change. Nothing
/// is persisted for the flow itself; validity is signature plus expiry,
/// so replay within the TTL window is bounded by the configured expiry.

use crate::auth::claims::TokenPurpose;
use crate::auth::jwt::{decode_token, generate_reset_token};
use crate::configuration::JwtSettings;
use crate::error::AppError;

/// Mint a short-lived reset token bound to an email
///
/// # Errors
/// Returns error if token generation fails
pub fn request_reset(email: &str, config: &JwtSettings) -> Result<String, AppError> {
    let token = generate_reset_token(email, config)?;
    tracing::info!(email = email, "Password reset token issued");
    Ok(token)
}

/// Verify a reset token and return the email it authorizes a change for
///
/// # Errors
/// - `AuthError::ExpiredToken` once the TTL has elapsed, even with a
///   correct signature
/// - `AuthError::InvalidToken` for tampered or wrong-purpose tokens
pub fn redeem_reset(token: &str, config: &JwtSettings) -> Result<String, AppError> {
    let claims = decode_token(token, TokenPurpose::PasswordReset, config)?;
    Ok(claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Claims;
    use crate::auth::jwt::encode_claims;
    use crate::error::AuthError;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            reset_token_expiry: 1800,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn test_request_then_redeem() {
        let config = get_test_config();

        let token = request_reset("user@example.com", &config).unwrap();
        let email = redeem_reset(&token, &config).unwrap();

        assert_eq!(email, "user@example.com");
    }

    #[test]
    fn test_expired_reset_token_fails_with_expiry() {
        let config = get_test_config();

        // Correctly signed but already past its TTL
        let claims =
            Claims::new_reset("user@example.com".to_string(), -60, config.issuer.clone());
        let token = encode_claims(&claims, &config).unwrap();

        let result = redeem_reset(&token, &config);
        match result {
            Err(AppError::Auth(AuthError::ExpiredToken)) => (),
            other => panic!("Expected ExpiredToken, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_access_token_cannot_reset_password() {
        let config = get_test_config();
        let access = crate::auth::jwt::generate_access_token(42, &config).unwrap();

        let result = redeem_reset(&access, &config);
        match result {
            Err(AppError::Auth(AuthError::InvalidToken)) => (),
            other => panic!("Expected InvalidToken, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_tampered_reset_token_fails() {
        let config = get_test_config();
        let token = request_reset("user@example.com", &config).unwrap();

        let tampered = format!("{}X", token);
        assert!(redeem_reset(&tampered, &config).is_err());
    }
}

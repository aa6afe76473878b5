/// Token Codec
///
/// Creates and verifies signed, time-bounded tokens (access tokens and
/// password-reset tokens). Pure functions over an explicit `JwtSettings`
/// parameter: no shared mutable state, safe to call from any number of
/// concurrent callers.

use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, TokenPurpose};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Sign a set of claims into a compact token string
///
/// # Errors
/// Returns error if token serialization fails
pub fn encode_claims(claims: &Claims, config: &JwtSettings) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Generate a short-lived access token for a user
///
/// # Errors
/// Returns error if token generation fails
pub fn generate_access_token(user_id: i64, config: &JwtSettings) -> Result<String, AppError> {
    let claims = Claims::new_access(user_id, config.access_token_expiry, config.issuer.clone());
    encode_claims(&claims, config)
}

/// Generate a short-lived password-reset token bound to an email
///
/// # Errors
/// Returns error if token generation fails
pub fn generate_reset_token(email: &str, config: &JwtSettings) -> Result<String, AppError> {
    let claims = Claims::new_reset(
        email.to_string(),
        config.reset_token_expiry,
        config.issuer.clone(),
    );
    encode_claims(&claims, config)
}

/// Verify a signed token and extract its claims
///
/// Checks, in order: signature integrity, issuer, expiry (zero leeway),
/// and the `purpose` claim against `expected_purpose`. No claim is trusted
/// unless the signature verifies.
///
/// # Errors
/// - `AuthError::ExpiredToken` if the token is well-formed and correctly
///   signed but past its expiry
/// - `AuthError::InvalidToken` for every other failure (bad signature,
///   malformed payload, wrong issuer, wrong purpose)
pub fn decode_token(
    token: &str,
    expected_purpose: TokenPurpose,
    config: &JwtSettings,
) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    // Expiry is the only temporal control in the system; no grace window.
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("Token validation error: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::Auth(AuthError::ExpiredToken),
            _ => AppError::Auth(AuthError::InvalidToken),
        }
    })?;

    if claims.purpose != expected_purpose {
        tracing::warn!(purpose = ?claims.purpose, "Token presented for wrong purpose");
        return Err(AppError::Auth(AuthError::InvalidToken));
    }

    Ok(claims)
}

/// Access Guard: resolve an access token to a caller identity
///
/// Stateless by design; never touches persistent storage, so the hot path
/// of every protected request stays a pure computation.
///
/// # Errors
/// Returns `AuthError::InvalidToken` / `AuthError::ExpiredToken` through
/// `decode_token`; both surface as the same 401 at the boundary
pub fn authenticate(token: &str, config: &JwtSettings) -> Result<i64, AppError> {
    let claims = decode_token(token, TokenPurpose::Access, config)?;
    claims.user_id()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            reset_token_expiry: 1800,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn test_generate_and_decode_access_token() {
        let config = get_test_config();

        let token = generate_access_token(42, &config).expect("Failed to generate token");
        let claims = decode_token(&token, TokenPurpose::Access, &config)
            .expect("Failed to validate token");

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iss, "test");
        assert_eq!(claims.purpose, TokenPurpose::Access);
    }

    #[test]
    fn test_authenticate_returns_subject_id() {
        let config = get_test_config();

        let token = generate_access_token(42, &config).expect("Failed to generate token");
        assert_eq!(authenticate(&token, &config).unwrap(), 42);
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let config = get_test_config();
        let result = decode_token("invalid.token.here", TokenPurpose::Access, &config);

        match result {
            Err(AppError::Auth(AuthError::InvalidToken)) => (),
            other => panic!("Expected InvalidToken, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let config = get_test_config();
        let token = generate_access_token(42, &config).expect("Failed to generate token");

        // Flip bytes across the whole token; every mutation must be rejected
        for i in (0..token.len()).step_by(7) {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            if tampered == token {
                continue;
            }

            let result = decode_token(&tampered, TokenPurpose::Access, &config);
            match result {
                Err(AppError::Auth(AuthError::InvalidToken)) => (),
                other => panic!("Byte {} flip accepted: {:?}", i, other.err()),
            }
        }
    }

    #[test]
    fn test_expired_token_reports_expiry() {
        let config = get_test_config();

        // Hand-roll claims that expired well in the past; signature is valid
        let claims = Claims::new_access(42, -120, config.issuer.clone());
        let token = encode_claims(&claims, &config).expect("Failed to encode claims");

        let result = decode_token(&token, TokenPurpose::Access, &config);
        match result {
            Err(AppError::Auth(AuthError::ExpiredToken)) => (),
            other => panic!("Expected ExpiredToken, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let config = get_test_config();
        let token = generate_access_token(42, &config).expect("Failed to generate token");

        let mut other = get_test_config();
        other.secret = "another-secret-key-at-least-32-chars!".to_string();

        let result = decode_token(&token, TokenPurpose::Access, &other);
        match result {
            Err(AppError::Auth(AuthError::InvalidToken)) => (),
            other => panic!("Expected InvalidToken, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_wrong_issuer_is_invalid() {
        let mut config = get_test_config();
        let token = generate_access_token(42, &config).expect("Failed to generate token");

        config.issuer = "wrong-issuer".to_string();
        assert!(decode_token(&token, TokenPurpose::Access, &config).is_err());
    }

    #[test]
    fn test_reset_token_rejected_as_access_token() {
        let config = get_test_config();
        let token = generate_reset_token("user@example.com", &config)
            .expect("Failed to generate token");

        let result = decode_token(&token, TokenPurpose::Access, &config);
        match result {
            Err(AppError::Auth(AuthError::InvalidToken)) => (),
            other => panic!("Expected InvalidToken, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_reset_token_round_trip() {
        let config = get_test_config();
        let token = generate_reset_token("user@example.com", &config)
            .expect("Failed to generate token");

        let claims = decode_token(&token, TokenPurpose::PasswordReset, &config)
            .expect("Failed to validate token");
        assert_eq!(claims.sub, "user@example.com");
    }
}

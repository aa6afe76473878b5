/// Password Reset Routes
///
/// Two-step stateless flow: a short-TTL signed token goes out via the mail
/// relay, and redeeming it authorizes exactly one password change.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::{hash_password, redeem_reset, request_reset};
use crate::configuration::JwtSettings;
use crate::email_client::EmailClient;
use crate::error::{AppError, AuthError};
use crate::validators::is_valid_email;

/// Reset request for a forgotten password
#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Redemption of a previously issued reset token
#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// POST /auth/password/forgot
///
/// Issue a reset token for the account behind the email and deliver it
/// out-of-band. Responds 204 whether or not the account exists, and even
/// if delivery fails, so the endpoint cannot be used to enumerate users.
///
/// # Errors
/// - 400: Validation error (invalid email format)
/// - 500: Internal server error
pub async fn forgot_password(
    form: web::Json<ForgotPasswordRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;

    let user = sqlx::query_as::<_, (i64,)>("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool.get_ref())
        .await?;

    match user {
        Some((user_id,)) => {
            let token = request_reset(&email, jwt_config.get_ref())?;
            let html = format!(
                "<p>Use this token to reset your password: <code>{}</code></p>",
                token
            );

            if let Err(e) = email_client
                .send_email(&email, "Password reset", &html)
                .await
            {
                // Still 204: a relay failure must not reveal that the
                // account exists
                tracing::error!(user_id = user_id, error = %e, "Reset token delivery failed");
            }
        }
        None => {
            tracing::info!("Password reset requested for unknown email");
        }
    }

    Ok(HttpResponse::NoContent().finish())
}

/// POST /auth/password/reset
///
/// Redeem a reset token and set a new password for the email it is bound
/// to. The token is stateless; its TTL bounds the redemption window.
///
/// # Errors
/// - 400: Validation error (password length out of bounds)
/// - 401: Tampered, expired, or wrong-purpose token
/// - 500: Internal server error
pub async fn reset_password(
    form: web::Json<ResetPasswordRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let email = redeem_reset(&form.token, jwt_config.get_ref())?;
    let password_hash = hash_password(&form.new_password)?;

    let result = sqlx::query("UPDATE users SET password = $1 WHERE email = $2")
        .bind(&password_hash)
        .bind(&email)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        // Token outlived the account it was bound to
        tracing::warn!("Reset token redeemed for a missing account");
        return Err(AppError::Auth(AuthError::InvalidToken));
    }

    tracing::info!("Password updated via reset token");

    Ok(HttpResponse::NoContent().finish())
}

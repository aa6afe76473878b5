/// Authentication Routes
///
/// Handles login, token refresh, logout, and current user information.
/// Thin glue: handlers validate shape, delegate to the session core, and
/// translate results to HTTP status codes.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{
    issue_session, refresh_session, revoke_session, verify_password, PgRefreshTokenStore,
};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::middleware::AuthenticatedUser;
use crate::validators::is_valid_email;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub user_id: i64,
    pub refresh_token: String,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User information response
#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub experience: i64,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

/// POST /auth/login
///
/// Authenticate with email and password; returns an access/refresh pair.
///
/// # Errors
/// - 400: Validation error (invalid email format)
/// - 401: Invalid credentials (email not found or wrong password)
/// - 500: Internal server error
///
/// # Security Notes
/// - Uses the same 401 for "not found" and "wrong password"
/// - Prevents user enumeration attacks
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    store: web::Data<PgRefreshTokenStore>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;

    let user = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, password FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    let (user_id, password_hash) = user;

    let password_valid = verify_password(&form.password, &password_hash)?;
    if !password_valid {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let tokens = issue_session(store.get_ref(), user_id, jwt_config.get_ref()).await?;

    tracing::info!(user_id = user_id, "User logged in successfully");

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
    }))
}

/// POST /auth/refresh
///
/// Exchange a refresh token for a new token pair (token rotation: the old
/// refresh token becomes unusable the moment the new one is stored).
///
/// # Errors
/// - 401: Absent, mismatched, or already-rotated refresh token
/// - 500: Internal server error
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    store: web::Data<PgRefreshTokenStore>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let tokens = refresh_session(
        store.get_ref(),
        form.user_id,
        &form.refresh_token,
        jwt_config.get_ref(),
    )
    .await?;

    tracing::info!(user_id = form.user_id, "Token refreshed successfully");

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
    }))
}

/// POST /auth/logout
///
/// Revoke the caller's stored session. **Requires a valid access token.**
///
/// # Errors
/// - 401: Missing or invalid token (handled by middleware)
/// - 500: Internal server error
pub async fn logout(
    user: web::ReqData<AuthenticatedUser>,
    store: web::Data<PgRefreshTokenStore>,
) -> Result<HttpResponse, AppError> {
    revoke_session(store.get_ref(), user.id()).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /auth/me
///
/// Get the current authenticated user's profile.
/// **Requires a valid access token** in the Authorization header; the
/// caller identity is injected by the guard middleware.
///
/// # Errors
/// - 401: Missing or invalid token (handled by middleware)
/// - 404: User not found (account deleted after the token was issued)
/// - 500: Internal server error
pub async fn get_current_user(
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let row = sqlx::query_as::<_, (i64, String, String, String, i64, Option<String>, Option<String>)>(
        r#"
        SELECT id, name, surname, email, experience, image_url, description
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user.id())
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: row.0,
        name: row.1,
        surname: row.2,
        email: row.3,
        experience: row.4,
        image_url: row.5,
        description: row.6,
    }))
}

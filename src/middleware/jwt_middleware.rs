/// Access Guard Middleware
///
/// Validates the access token on every protected request and injects the
/// resolved caller identity into request extensions. The gate is stateless:
/// token validation is pure computation, never a store lookup, so missing,
/// malformed, and expired tokens all surface as the same 401 without
/// touching the database.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::authenticate;
use crate::configuration::JwtSettings;

/// Caller identity resolved by the guard, available to protected handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub i64);

impl AuthenticatedUser {
    pub fn id(&self) -> i64 {
        self.0
    }
}

/// Guard middleware for protecting routes
///
/// Must be applied to routes that require authentication.
/// Extracts and validates the token from the Authorization header.
pub struct JwtMiddleware {
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
}

/// The one body every rejected request receives, regardless of which
/// internal check failed
fn unauthorized_response() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({
        "error": "Authentication failed",
        "code": "UNAUTHORIZED"
    }))
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Extract Authorization header
        let auth_header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| {
                if h.starts_with("Bearer ") {
                    Some(h[7..].to_string())
                } else {
                    None
                }
            });

        match auth_header {
            None => {
                tracing::warn!("Missing or invalid Authorization header");
                let response = unauthorized_response();
                Box::pin(async move {
                    Err(actix_web::error::InternalError::from_response(
                        "Unauthorized",
                        response,
                    )
                    .into())
                })
            }
            Some(token) => match authenticate(&token, &self.jwt_config) {
                Ok(user_id) => {
                    req.extensions_mut().insert(AuthenticatedUser(user_id));

                    tracing::debug!(user_id = user_id, "Access token validated");

                    let service = self.service.clone();
                    Box::pin(async move { service.call(req).await })
                }
                Err(e) => {
                    tracing::warn!("Access token rejected: {}", e);
                    let response = unauthorized_response();
                    Box::pin(async move {
                        Err(actix_web::error::InternalError::from_response(
                            "Unauthorized",
                            response,
                        )
                        .into())
                    })
                }
            },
        }
    }
}

//! Authentication extractors
//!
//! Tokens are read from the `Authorization: Bearer` header first and fall
//! back to the `access_token` cookie set by `/login`.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::{verify_token, AuthService, JwtError};
use crate::error::ErrorResponse;
use crate::models::UserRole;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Authenticated user extracted from JWT token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub role: UserRole,
    pub jti: String,
}

/// Rejection for authentication and role failures
#[derive(Debug)]
struct AuthRejection {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
}

impl AuthRejection {
    fn unauthorized(code: &'static str, message: &'static str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code,
            message,
        }
    }

    fn forbidden(message: &'static str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "FORBIDDEN",
            message,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        tracing::debug!(code = self.code, status = %self.status, "Request rejected by auth");
        let body = ErrorResponse {
            error: self.message.to_string(),
            code: self.code.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

async fn bearer_or_cookie<S: Send + Sync>(parts: &mut Parts, state: &S) -> Option<String> {
    if let Ok(TypedHeader(Authorization(bearer))) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
    {
        return Some(bearer.token().to_string());
    }

    CookieJar::from_headers(&parts.headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_or_cookie(parts, state).await.ok_or_else(|| {
            AuthRejection::unauthorized(
                "MISSING_TOKEN",
                "Bearer token or access_token cookie required",
            )
            .into_response()
        })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let claims = verify_token(&token, auth_service.jwt_secret()).map_err(|e| {
            match e {
                JwtError::TokenExpired => {
                    AuthRejection::unauthorized("TOKEN_EXPIRED", "Token has expired")
                }
                _ => AuthRejection::unauthorized("INVALID_TOKEN", "Invalid token"),
            }
            .into_response()
        })?;

        let user_id = claims.user_id().map_err(|_| {
            AuthRejection::unauthorized("INVALID_TOKEN", "Invalid user ID in token").into_response()
        })?;
        let role = claims.user_role().map_err(|_| {
            AuthRejection::unauthorized("INVALID_TOKEN", "Invalid role in token").into_response()
        })?;

        Ok(AuthenticatedUser {
            user_id,
            role,
            jti: claims.jti,
        })
    }
}

/// Admin or manager
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.role.is_staff() {
            return Err(AuthRejection::forbidden("Staff access required").into_response());
        }

        Ok(StaffUser(user))
    }
}

#[derive(Debug, Clone)]
pub struct ClientUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for ClientUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if user.role != UserRole::Client {
            return Err(AuthRejection::forbidden("Client access required").into_response());
        }

        Ok(ClientUser(user))
    }
}

/// Extractor requiring the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !matches!(user.role, UserRole::Admin) {
            return Err(AuthRejection::forbidden("Admin access required").into_response());
        }

        Ok(AdminUser(user))
    }
}

//! Login and staff registration handlers

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use validator::Validate;

use super::StaffUser;
use crate::auth::{
    AuthService, EmployeeCreated, LoginRequest, LoginResponse, RegisterEmployeeRequest,
};
use crate::error::ApiError;
use crate::middleware::{client_ip, ACCESS_TOKEN_COOKIE};

/// POST /login - Exchange credentials for an access token.
///
/// The token is returned in the body and also set as an HTTP-only cookie.
pub async fn login(
    State(service): State<Arc<AuthService>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    request.validate()?;

    let ip = client_ip(&headers);
    let response = service.login(&request, ip.as_deref()).await?;

    let cookie = Cookie::build((ACCESS_TOKEN_COOKIE, response.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((jar.add(cookie), Json(response)))
}

/// POST /register - Create a manager account
pub async fn register(
    StaffUser(user): StaffUser,
    State(service): State<Arc<AuthService>>,
    Json(request): Json<RegisterEmployeeRequest>,
) -> Result<(StatusCode, Json<EmployeeCreated>), ApiError> {
    request.validate()?;

    let created = service.register_employee(user.user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

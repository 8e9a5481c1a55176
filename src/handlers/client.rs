use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use validator::Validate;

use super::StaffUser;
use crate::client::{Client, ClientCreated, ClientService, CreateClientRequest};
use crate::error::ApiError;

pub async fn list_clients(
    _staff: StaffUser,
    State(service): State<Arc<ClientService>>,
) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(service.list().await?))
}

/// POST /clients - Register a client; credentials go out by email
pub async fn create_client(
    StaffUser(user): StaffUser,
    State(service): State<Arc<ClientService>>,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientCreated>), ApiError> {
    request.validate()?;

    let created = service.create(user.user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

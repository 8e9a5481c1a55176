use axum::{extract::State, Json};
use std::sync::Arc;

use super::StaffUser;
use crate::catalog::{CatalogService, CreditProduct};
use crate::error::ApiError;

/// GET /products - Active credit products
pub async fn list_products(
    _staff: StaffUser,
    State(service): State<Arc<CatalogService>>,
) -> Result<Json<Vec<CreditProduct>>, ApiError> {
    Ok(Json(service.list_active().await?))
}

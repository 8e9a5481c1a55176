use axum::{extract::State, Json};
use std::sync::Arc;

use super::StaffUser;
use crate::employee_service::EmployeeService;
use crate::error::ApiError;
use crate::models::EmployeeSummary;

pub async fn list_employees(
    _staff: StaffUser,
    State(service): State<Arc<EmployeeService>>,
) -> Result<Json<Vec<EmployeeSummary>>, ApiError> {
    Ok(Json(service.list().await?))
}

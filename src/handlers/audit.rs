//! Audit log viewer

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use super::StaffUser;
use crate::audit::{AuditLogFilter, AuditLogView, AuditService};
use crate::error::ApiError;

/// GET /logs?action=&entity=&from=&to=&limit=
pub async fn list_logs(
    _staff: StaffUser,
    State(service): State<Arc<AuditService>>,
    Query(filter): Query<AuditLogFilter>,
) -> Result<Json<Vec<AuditLogView>>, ApiError> {
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(ApiError::BadRequest(
                "'from' must not be after 'to'".to_string(),
            ));
        }
    }

    Ok(Json(service.list(&filter).await?))
}

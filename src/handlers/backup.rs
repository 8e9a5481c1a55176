use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use super::AdminUser;
use crate::backup::BackupService;
use crate::error::ApiError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupResponse {
    pub message: String,
    pub file: String,
    pub size_bytes: u64,
}

/// POST /backup - Dump the database now
pub async fn create_backup(
    AdminUser(user): AdminUser,
    State(service): State<Arc<BackupService>>,
) -> Result<Json<BackupResponse>, ApiError> {
    let backup = service.run(Some(user.user_id)).await?;

    Ok(Json(BackupResponse {
        message: "Backup created".to_string(),
        file: backup.file,
        size_bytes: backup.size_bytes,
    }))
}

//! Banner and health check

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::db::Database;

pub async fn root() -> &'static str {
    "Rosebank Back Office API"
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    database: &'static str,
    version: &'static str,
}

/// GET /health - 503 when the database does not answer
pub async fn health_check(State(db): State<Database>) -> (StatusCode, Json<HealthResponse>) {
    let (status, database, code) = if db.is_healthy().await {
        ("healthy", "connected", StatusCode::OK)
    } else {
        ("unhealthy", "unreachable", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

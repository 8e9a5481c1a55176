//! Staff directory, audit log and backup routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{audit, backup, employee};
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/employees", get(employee::list_employees))
        .route("/logs", get(audit::list_logs))
        .route("/backup", post(backup::create_backup))
}

use axum::{routing::get, Router};

use crate::handlers::system;
use crate::state::AppState;

pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health_check))
}

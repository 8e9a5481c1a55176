//! Client and product routes

use axum::{routing::get, Router};

use crate::handlers::{client, product};
use crate::state::AppState;

pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/clients",
            get(client::list_clients).post(client::create_client),
        )
        .route("/products", get(product::list_products))
}

//! Rosebank back-office server
//!
//! Staff manage clients and issue loans; clients repay them through the same
//! API. This library exports the modules used by the server binary and the
//! integration tests.

pub mod amortization;
pub mod audit;
pub mod auth;
pub mod backup;
pub mod catalog;
pub mod client;
pub mod config;
pub mod db;
pub mod employee_service;
pub mod error;
pub mod handlers;
pub mod loan;
pub mod middleware;
pub mod models;
pub mod notification;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;

use auth::AuthService;
use backup::BackupService;
use client::ClientService;
use config::Config;
use db::Database;
use notification::Notifier;
use state::AppState;

/// Wire every service onto one shared pool
pub fn build_state(db: Database, config: &Config, notifier: Notifier) -> AppState {
    let auth_service = Arc::new(AuthService::new(
        db.clone(),
        config.jwt_secret.clone(),
        config.jwt_ttl_hours,
        notifier.clone(),
    ));
    let client_service = Arc::new(ClientService::new(db.clone(), notifier));
    let backup_service = Arc::new(BackupService::new(
        db.clone(),
        config.database_url.clone(),
        config.backup.clone(),
    ));

    AppState::new(db, auth_service, client_service, backup_service)
}

/// All API routes with request tracing. CORS is layered on by the caller.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::system_routes())
        .merge(routes::auth_routes())
        .merge(routes::client_routes())
        .merge(routes::loan_routes())
        .merge(routes::admin_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}

//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::audit::AuditService;
use crate::auth::AuthService;
use crate::backup::BackupService;
use crate::catalog::CatalogService;
use crate::client::ClientService;
use crate::db::Database;
use crate::employee_service::EmployeeService;
use crate::loan::LoanService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth_service: Arc<AuthService>,
    pub client_service: Arc<ClientService>,
    pub catalog_service: Arc<CatalogService>,
    pub loan_service: Arc<LoanService>,
    pub employee_service: Arc<EmployeeService>,
    pub audit_service: Arc<AuditService>,
    pub backup_service: Arc<BackupService>,
}

impl AppState {
    pub fn new(
        db: Database,
        auth_service: Arc<AuthService>,
        client_service: Arc<ClientService>,
        backup_service: Arc<BackupService>,
    ) -> Self {
        Self {
            catalog_service: Arc::new(CatalogService::new(db.clone())),
            loan_service: Arc::new(LoanService::new(db.clone())),
            employee_service: Arc::new(EmployeeService::new(db.clone())),
            audit_service: Arc::new(AuditService::new(db.clone())),
            db,
            auth_service,
            client_service,
            backup_service,
        }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db.clone()
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<ClientService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.client_service.clone()
    }
}

impl FromRef<AppState> for Arc<CatalogService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.catalog_service.clone()
    }
}

impl FromRef<AppState> for Arc<LoanService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}

impl FromRef<AppState> for Arc<EmployeeService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.employee_service.clone()
    }
}

impl FromRef<AppState> for Arc<AuditService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.audit_service.clone()
    }
}

impl FromRef<AppState> for Arc<BackupService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.backup_service.clone()
    }
}

//! Audit log models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of audited action, stored as its SCREAMING_SNAKE name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateClient,
    RegisterEmployee,
    IssueLoan,
    Payment,
    EarlyRepayment,
    BackupDb,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateClient => "CREATE_CLIENT",
            AuditAction::RegisterEmployee => "REGISTER_EMPLOYEE",
            AuditAction::IssueLoan => "ISSUE_LOAN",
            AuditAction::Payment => "PAYMENT",
            AuditAction::EarlyRepayment => "EARLY_REPAYMENT",
            AuditAction::BackupDb => "BACKUP_DB",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry to append
#[derive(Debug, Clone)]
pub struct AuditEntry {
    /// Acting user, `None` for system jobs
    pub actor_id: Option<i64>,
    pub action: AuditAction,
    pub entity: &'static str,
    pub entity_id: i64,
    pub details: BTreeMap<String, String>,
}

impl AuditEntry {
    pub fn new(
        actor_id: Option<i64>,
        action: AuditAction,
        entity: &'static str,
        entity_id: i64,
    ) -> Self {
        Self {
            actor_id,
            action,
            entity,
            entity_id,
            details: BTreeMap::new(),
        }
    }

    pub fn detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

/// Query parameters for the audit log listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogFilter {
    pub action: Option<String>,
    pub entity: Option<String>,
    /// Inclusive start date
    pub from: Option<NaiveDate>,
    /// Inclusive end date
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

pub const DEFAULT_LOG_LIMIT: i64 = 50;
pub const MAX_LOG_LIMIT: i64 = 500;

impl AuditLogFilter {
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LOG_LIMIT)
            .clamp(1, MAX_LOG_LIMIT)
    }
}

/// Raw audit row joined with the actor's account
#[derive(Debug, sqlx::FromRow)]
pub struct AuditLogRow {
    pub id: i64,
    pub action_type: String,
    pub entity_name: String,
    pub entity_id: i64,
    pub created_at: DateTime<Utc>,
    pub new_values: sqlx::types::Json<serde_json::Value>,
    pub login: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Audit entry as returned to staff
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogView {
    pub id: i64,
    pub action: String,
    pub entity: String,
    pub entity_id: i64,
    pub date: DateTime<Utc>,
    pub details: serde_json::Value,
    pub user: String,
}

impl From<AuditLogRow> for AuditLogView {
    fn from(row: AuditLogRow) -> Self {
        let user = match (row.login, row.first_name, row.last_name) {
            (Some(login), Some(first), Some(last)) => format!("{} {} ({})", last, first, login),
            (Some(login), _, _) => login,
            _ => "system".to_string(),
        };

        Self {
            id: row.id,
            action: row.action_type,
            entity: row.entity_name,
            entity_id: row.entity_id,
            date: row.created_at,
            details: row.new_values.0,
            user,
        }
    }
}

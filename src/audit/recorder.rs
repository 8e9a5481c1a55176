//! Audit trail writer and reader

use chrono::{Duration, NaiveTime};
use sqlx::postgres::PgConnection;
use sqlx::Connection;

use crate::db::{Database, DbError};

use super::model::*;

/// Append `entry` on `conn`, which must belong to an open transaction.
///
/// The insert runs under a savepoint. On failure only the savepoint is
/// rolled back and the error is logged; the caller's transaction stays
/// usable and its outcome is unaffected.
pub async fn record(conn: &mut PgConnection, entry: &AuditEntry) {
    if let Err(e) = try_record(conn, entry).await {
        tracing::error!(
            action = %entry.action,
            entity = entry.entity,
            entity_id = entry.entity_id,
            error = %e,
            "Failed to write audit entry"
        );
    }
}

async fn try_record(conn: &mut PgConnection, entry: &AuditEntry) -> Result<(), sqlx::Error> {
    let mut savepoint = conn.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO audit_logs (user_id, action_type, entity_name, entity_id, new_values, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        "#,
    )
    .bind(entry.actor_id)
    .bind(entry.action.as_str())
    .bind(entry.entity)
    .bind(entry.entity_id)
    .bind(sqlx::types::Json(&entry.details))
    .execute(&mut *savepoint)
    .await;

    match inserted {
        Ok(_) => {
            savepoint.commit().await?;
            tracing::debug!(
                action = %entry.action,
                entity = entry.entity,
                entity_id = entry.entity_id,
                "Audit entry recorded"
            );
            Ok(())
        }
        Err(e) => {
            savepoint.rollback().await?;
            Err(e)
        }
    }
}

/// Read access to the audit trail
#[derive(Clone)]
pub struct AuditService {
    db: Database,
}

impl AuditService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Newest entries first, narrowed by `filter`
    pub async fn list(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLogView>, DbError> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new(
            r#"
            SELECT a.id, a.action_type, a.entity_name, a.entity_id, a.created_at, a.new_values,
                   u.login, e.first_name, e.last_name
            FROM audit_logs a
            LEFT JOIN users u ON a.user_id = u.id
            LEFT JOIN employees e ON u.id = e.user_id
            WHERE 1=1
            "#,
        );

        if let Some(action) = filter.action.as_deref().filter(|a| !a.is_empty()) {
            query_builder.push(" AND a.action_type = ");
            query_builder.push_bind(action.to_uppercase());
        }
        if let Some(entity) = filter.entity.as_deref().filter(|e| !e.is_empty()) {
            query_builder.push(" AND a.entity_name = ");
            query_builder.push_bind(entity.to_string());
        }
        if let Some(from) = filter.from {
            query_builder.push(" AND a.created_at >= ");
            query_builder.push_bind(from.and_time(NaiveTime::MIN).and_utc());
        }
        if let Some(to) = filter.to {
            let next_day = to + Duration::days(1);
            query_builder.push(" AND a.created_at < ");
            query_builder.push_bind(next_day.and_time(NaiveTime::MIN).and_utc());
        }

        query_builder.push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ");
        query_builder.push_bind(filter.effective_limit());

        let rows = query_builder
            .build_query_as::<AuditLogRow>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.into_iter().map(AuditLogView::from).collect())
    }
}

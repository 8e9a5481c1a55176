//! Database connection, pool management and units of work
//!
//! Every mutating business operation runs inside a [`UnitOfWork`]: one
//! PostgreSQL transaction that is committed explicitly and rolled back when
//! the unit is dropped on any early return. [`Database::with_deadline`]
//! bounds a whole operation in time.

use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::future::Future;
use std::time::Duration;

use crate::config::Config;

/// Database error
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Failed to run migrations: {0}")]
    MigrationError(String),

    #[error("Database health check failed: {0}")]
    HealthCheckError(String),

    #[error("Operation '{0}' exceeded its time limit")]
    Timeout(&'static str),

    #[error("Unit of work '{0}' was already committed")]
    Finished(&'static str),

    #[error(transparent)]
    Query(#[from] sqlx::Error),
}

/// Create a database connection pool
pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!("Connecting to database at {}", config.database_url_masked());

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database_url)
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;

    tracing::info!("Database connection pool created successfully");

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::MigrationError(e.to_string()))?;

    tracing::info!("Database migrations completed successfully");

    Ok(())
}

/// Check database connectivity (for health checks)
pub async fn check_health(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| DbError::HealthCheckError(e.to_string()))?;

    Ok(())
}

/// True when the error is a PostgreSQL unique constraint violation (23505)
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// Database pool wrapper for use in application state
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    tx_timeout: Duration,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_tx_timeout(mut self, tx_timeout: Duration) -> Self {
        self.tx_timeout = tx_timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn is_healthy(&self) -> bool {
        check_health(&self.pool).await.is_ok()
    }

    /// Open a unit of work. `label` names the operation in logs.
    pub async fn begin(&self, label: &'static str) -> Result<UnitOfWork, DbError> {
        let tx = self.pool.begin().await?;
        tracing::debug!(operation = label, "Transaction started");
        Ok(UnitOfWork {
            label,
            tx: Some(tx),
        })
    }

    /// Run `fut` under the configured transaction deadline.
    ///
    /// On expiry the future is dropped, which drops its [`UnitOfWork`] and
    /// rolls the transaction back.
    pub async fn with_deadline<T, E, F>(&self, label: &'static str, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<DbError>,
    {
        match tokio::time::timeout(self.tx_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    operation = label,
                    timeout_secs = self.tx_timeout.as_secs(),
                    "Operation timed out, transaction rolled back"
                );
                Err(DbError::Timeout(label).into())
            }
        }
    }
}

/// One atomic business operation
pub struct UnitOfWork {
    label: &'static str,
    tx: Option<Transaction<'static, Postgres>>,
}

impl UnitOfWork {
    /// Connection bound to this unit's transaction
    pub fn conn(&mut self) -> Result<&mut PgConnection, DbError> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(DbError::Finished(self.label)),
        }
    }

    pub async fn commit(mut self) -> Result<(), DbError> {
        let tx = self.tx.take().ok_or(DbError::Finished(self.label))?;
        tx.commit().await?;
        tracing::debug!(operation = self.label, "Transaction committed");
        Ok(())
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        // The transaction's own Drop issues the ROLLBACK
        if self.tx.is_some() {
            tracing::warn!(operation = self.label, "Transaction rolled back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detection_ignores_other_errors() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }

    #[test]
    fn test_timeout_error_names_operation() {
        let err = DbError::Timeout("pay");
        assert!(err.to_string().contains("pay"));
    }

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let db = Database::new(pool).with_tx_timeout(Duration::from_millis(20));

        let result: Result<(), DbError> = db
            .with_deadline("slow", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(DbError::Timeout("slow"))));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let db = Database::new(pool);

        let result: Result<u32, DbError> = db.with_deadline("fast", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}

//! SQL backups
//!
//! Dumps the database with `pg_dump` into the backup directory, on demand
//! from an administrator and on a daily cron schedule.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::audit::{self, AuditAction, AuditEntry};
use crate::config::BackupConfig;
use crate::db::{Database, DbError};

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Backup I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("pg_dump failed: {0}")]
    DumpFailed(String),

    #[error("Backup file is empty")]
    EmptyDump,

    #[error("Backup scheduler error: {0}")]
    Scheduler(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// Result of a successful dump
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupFile {
    pub file: String,
    pub size_bytes: u64,
}

/// `backup_<YYYY-MM-DD_HH-MM-SS>.sql`
pub fn backup_file_name(at: DateTime<Local>) -> String {
    format!("backup_{}.sql", at.format("%Y-%m-%d_%H-%M-%S"))
}

pub struct BackupService {
    db: Database,
    database_url: String,
    config: BackupConfig,
}

impl BackupService {
    pub fn new(db: Database, database_url: String, config: BackupConfig) -> Self {
        Self {
            db,
            database_url,
            config,
        }
    }

    pub fn directory(&self) -> &Path {
        Path::new(&self.config.directory)
    }

    /// Dump the database and record a `BACKUP_DB` audit entry. `actor` is
    /// `None` for scheduled runs.
    pub async fn run(&self, actor: Option<i64>) -> Result<BackupFile, BackupError> {
        tokio::fs::create_dir_all(self.directory()).await?;

        let file_name = backup_file_name(Local::now());
        let path = self.directory().join(&file_name);

        tracing::info!(file = %path.display(), "Starting database backup");

        let size_bytes = match self.dump_to(&path).await {
            Ok(size) => size,
            Err(e) => {
                // Leave no partial or empty dump behind
                let _ = tokio::fs::remove_file(&path).await;
                tracing::error!(file = %path.display(), error = %e, "Database backup failed");
                return Err(e);
            }
        };

        let mut uow = self.db.begin("backup_db").await?;
        let entry = AuditEntry::new(actor, AuditAction::BackupDb, "system", 0)
            .detail("file", &file_name)
            .detail("size_bytes", size_bytes);
        audit::record(uow.conn()?, &entry).await;
        uow.commit().await?;

        tracing::info!(file = %file_name, size_bytes, "Database backup completed");

        Ok(BackupFile {
            file: file_name,
            size_bytes,
        })
    }

    async fn dump_to(&self, path: &Path) -> Result<u64, BackupError> {
        let output = Command::new(&self.config.pg_dump_path)
            .arg("--dbname")
            .arg(&self.database_url)
            .arg("--file")
            .arg(path)
            .arg("--no-owner")
            .output()
            .await
            .map_err(|e| {
                BackupError::DumpFailed(format!(
                    "cannot start {}: {}",
                    self.config.pg_dump_path, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackupError::DumpFailed(format!(
                "{} ({})",
                stderr.trim(),
                output.status
            )));
        }

        let size = tokio::fs::metadata(path).await?.len();
        if size == 0 {
            return Err(BackupError::EmptyDump);
        }

        Ok(size)
    }

    /// Register the daily backup job and start the scheduler
    pub async fn start_scheduler(self: Arc<Self>) -> Result<JobScheduler, BackupError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| BackupError::Scheduler(e.to_string()))?;

        let service = self.clone();
        let job = Job::new_async(self.config.schedule.as_str(), move |_id, _scheduler| {
            let service = service.clone();
            Box::pin(async move {
                tracing::info!("Starting scheduled database backup");
                if let Err(e) = service.run(None).await {
                    tracing::error!(error = %e, "Scheduled backup failed");
                }
            })
        })
        .map_err(|e| BackupError::Scheduler(e.to_string()))?;

        scheduler
            .add(job)
            .await
            .map_err(|e| BackupError::Scheduler(e.to_string()))?;
        scheduler
            .start()
            .await
            .map_err(|e| BackupError::Scheduler(e.to_string()))?;

        tracing::info!(schedule = %self.config.schedule, "Backup scheduler started");

        Ok(scheduler)
    }
}

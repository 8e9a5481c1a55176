//! Client registration and lookup

use thiserror::Error;

use crate::audit::{self, AuditAction, AuditEntry};
use crate::auth::{generate_password, hash_password, insert_user, AuthError};
use crate::db::{is_unique_violation, Database, DbError};
use crate::models::UserRole;
use crate::notification::{templates, Notifier};

use super::model::*;

pub const GENERATED_PASSWORD_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("A client with this passport already exists")]
    PassportTaken,

    #[error(transparent)]
    Account(AuthError),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<AuthError> for ClientError {
    fn from(e: AuthError) -> Self {
        match e {
            // The login is the passport, so a taken login means a known passport
            AuthError::LoginTaken(_) => ClientError::PassportTaken,
            other => ClientError::Account(other),
        }
    }
}

impl From<sqlx::Error> for ClientError {
    fn from(e: sqlx::Error) -> Self {
        if is_unique_violation(&e) {
            ClientError::PassportTaken
        } else {
            ClientError::Database(DbError::Query(e))
        }
    }
}

#[derive(Clone)]
pub struct ClientService {
    db: Database,
    notifier: Notifier,
}

impl ClientService {
    pub fn new(db: Database, notifier: Notifier) -> Self {
        Self { db, notifier }
    }

    /// Register a client with generated credentials and email them
    pub async fn create(
        &self,
        actor_user_id: i64,
        request: &CreateClientRequest,
    ) -> Result<ClientCreated, ClientError> {
        let login = request.generated_login();
        let password = generate_password(GENERATED_PASSWORD_LEN);
        let password_hash = hash_password(&password).await?;

        let created = self
            .db
            .with_deadline("create_client", async {
                let mut uow = self.db.begin("create_client").await?;

                let user_id = insert_user(
                    uow.conn()?,
                    &login,
                    &password_hash,
                    UserRole::Client,
                )
                .await?;

                let client_id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO clients
                        (user_id, first_name, last_name, middle_name, passport_series, passport_number,
                         passport_issued_by, date_of_birth, address, phone, email)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    RETURNING id
                    "#,
                )
                .bind(user_id)
                .bind(&request.first_name)
                .bind(&request.last_name)
                .bind(&request.middle_name)
                .bind(&request.passport_series)
                .bind(&request.passport_number)
                .bind(&request.passport_issued_by)
                .bind(request.date_of_birth)
                .bind(&request.address)
                .bind(&request.phone)
                .bind(&request.email)
                .fetch_one(uow.conn()?)
                .await?;

                let entry = AuditEntry::new(
                    Some(actor_user_id),
                    AuditAction::CreateClient,
                    "clients",
                    client_id,
                )
                .detail("login", &login)
                .detail("name", format!("{} {}", request.last_name, request.first_name))
                .detail("email", &request.email);
                audit::record(uow.conn()?, &entry).await;

                uow.commit().await?;

                Ok::<_, ClientError>(ClientCreated {
                    id: client_id,
                    login: login.clone(),
                })
            })
            .await?;

        tracing::info!(client_id = created.id, login = %created.login, "Client registered");

        self.notifier.enqueue(templates::client_welcome(
            &request.email,
            &request.full_name(),
            &login,
            &password,
        ));

        Ok(created)
    }

    pub async fn list(&self) -> Result<Vec<Client>, ClientError> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, user_id, first_name, last_name, middle_name, passport_series, passport_number,
                   passport_issued_by, date_of_birth, address, phone, email, created_at
            FROM clients
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(clients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taken_login_means_taken_passport() {
        let err = ClientError::from(AuthError::LoginTaken("4510123456".to_string()));
        assert!(matches!(err, ClientError::PassportTaken));
    }

    #[test]
    fn test_other_account_errors_pass_through() {
        let err = ClientError::from(AuthError::Hashing("boom".to_string()));
        assert!(matches!(err, ClientError::Account(AuthError::Hashing(_))));
    }
}

//! Authentication service
//!
//! Login, employee registration and the first-admin bootstrap.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnection;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::audit::{self, AuditAction, AuditEntry};
use crate::db::{is_unique_violation, Database, DbError};
use crate::models::UserRole;
use crate::notification::{templates, Notifier};

use super::jwt::{generate_token, JwtError};
use super::password::{hash_password, verify_password};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Login '{0}' is already taken")]
    LoginTaken(String),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Database(DbError::Query(e))
    }
}

pub(crate) fn alphanumeric(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ValidationError::new("alphanumeric"))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub login: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: i64,
    pub role: UserRole,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterEmployeeRequest {
    #[validate(length(min = 4, max = 64), custom = "alphanumeric")]
    pub login: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 2, max = 100))]
    pub first_name: String,
    #[validate(length(min = 2, max = 100))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub position: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeCreated {
    pub id: i64,
    pub user_id: i64,
    pub login: String,
}

#[derive(sqlx::FromRow)]
struct LoginRow {
    id: i64,
    login: String,
    password_hash: String,
    role: UserRole,
    is_active: bool,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
}

/// Insert a user account, mapping a duplicate login to [`AuthError::LoginTaken`]
pub(crate) async fn insert_user(
    conn: &mut PgConnection,
    login: &str,
    password_hash: &str,
    role: UserRole,
) -> Result<i64, AuthError> {
    sqlx::query_scalar(
        r#"
        INSERT INTO users (login, password_hash, role, is_active)
        VALUES ($1, $2, $3, TRUE)
        RETURNING id
        "#,
    )
    .bind(login)
    .bind(password_hash)
    .bind(role)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AuthError::LoginTaken(login.to_string())
        } else {
            AuthError::from(e)
        }
    })
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    jwt_secret: String,
    token_ttl_hours: i64,
    notifier: Notifier,
}

impl AuthService {
    pub fn new(db: Database, jwt_secret: String, token_ttl_hours: i64, notifier: Notifier) -> Self {
        Self {
            db,
            jwt_secret,
            token_ttl_hours,
            notifier,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Check credentials and issue an access token. A sign-in alert is
    /// queued for accounts with an email address.
    pub async fn login(
        &self,
        request: &LoginRequest,
        client_ip: Option<&str>,
    ) -> Result<LoginResponse, AuthError> {
        let row: Option<LoginRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.login, u.password_hash, u.role, u.is_active,
                   COALESCE(e.first_name, c.first_name) AS first_name,
                   COALESCE(e.last_name, c.last_name) AS last_name,
                   COALESCE(e.email, c.email) AS email
            FROM users u
            LEFT JOIN employees e ON e.user_id = u.id
            LEFT JOIN clients c ON c.user_id = u.id
            WHERE u.login = $1
            "#,
        )
        .bind(&request.login)
        .fetch_optional(self.db.pool())
        .await?;

        let row = row.ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &row.password_hash).await? {
            tracing::warn!(login = %request.login, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }
        if !row.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let token = generate_token(row.id, row.role, &self.jwt_secret, self.token_ttl_hours)?;

        let name = match (&row.first_name, &row.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => row.login.clone(),
        };

        if let Some(email) = row.email.as_deref() {
            self.notifier.enqueue(templates::login_alert(
                email,
                &row.login,
                client_ip,
                Utc::now(),
            ));
        }

        tracing::info!(user_id = row.id, role = row.role.as_str(), "User logged in");

        Ok(LoginResponse {
            token,
            user: LoginUser {
                id: row.id,
                role: row.role,
                name,
            },
        })
    }

    /// Create a manager account with its employee profile
    pub async fn register_employee(
        &self,
        actor_user_id: i64,
        request: &RegisterEmployeeRequest,
    ) -> Result<EmployeeCreated, AuthError> {
        let password_hash = hash_password(&request.password).await?;

        self.db
            .with_deadline("register_employee", async {
                let mut uow = self.db.begin("register_employee").await?;

                let user_id = insert_user(
                    uow.conn()?,
                    &request.login,
                    &password_hash,
                    UserRole::Manager,
                )
                .await?;

                let employee_id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO employees (user_id, first_name, last_name, position, email)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(user_id)
                .bind(&request.first_name)
                .bind(&request.last_name)
                .bind(&request.position)
                .bind(&request.email)
                .fetch_one(uow.conn()?)
                .await?;

                let entry = AuditEntry::new(
                    Some(actor_user_id),
                    AuditAction::RegisterEmployee,
                    "employees",
                    employee_id,
                )
                .detail("login", &request.login)
                .detail("role", UserRole::Manager.as_str())
                .detail("name", format!("{} {}", request.first_name, request.last_name));
                audit::record(uow.conn()?, &entry).await;

                uow.commit().await?;

                tracing::info!(employee_id, user_id, login = %request.login, "Employee registered");

                Ok::<_, AuthError>(EmployeeCreated {
                    id: employee_id,
                    user_id,
                    login: request.login.clone(),
                })
            })
            .await
    }

    /// Create the first administrator when none exists. Returns whether an
    /// account was created.
    pub async fn bootstrap_admin(&self, login: &str, password: &str) -> Result<bool, AuthError> {
        let has_admin: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
                .fetch_one(self.db.pool())
                .await?;
        if has_admin {
            return Ok(false);
        }

        let password_hash = hash_password(password).await?;

        let mut uow = self.db.begin("bootstrap_admin").await?;
        let user_id = insert_user(uow.conn()?, login, &password_hash, UserRole::Admin).await?;

        sqlx::query(
            r#"
            INSERT INTO employees (user_id, first_name, last_name, position)
            VALUES ($1, 'System', 'Administrator', 'Administrator')
            "#,
        )
        .bind(user_id)
        .execute(uow.conn()?)
        .await?;

        uow.commit().await?;

        tracing::info!(user_id, login, "Bootstrap administrator created");

        Ok(true)
    }
}

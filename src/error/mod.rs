//! Centralized API error handling
//!
//! Domain errors convert into [`ApiError`], which maps them onto HTTP status
//! codes and a flat JSON body: `{ "error": "<message>", "code": "<CODE>" }`.
//! Internal failures are logged in full and answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::amortization::AmortizationError;
use crate::auth::{AuthError, JwtError};
use crate::backup::BackupError;
use crate::client::ClientError;
use crate::db::DbError;
use crate::loan::LoanError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{0}")]
    BadRequest(String),

    /// Rejected by a business rule (limits, already paid, already closed)
    #[error("{message}")]
    BusinessRule { code: &'static str, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            code: "NOT_FOUND",
            message: message.into(),
        }
    }

    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound { code, .. } => *code,
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::BusinessRule { code, .. } => *code,
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BusinessRule { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to API clients
    fn public_message(&self) -> String {
        match self {
            ApiError::InternalError(_) | ApiError::DatabaseError(_) => {
                "Internal server error".to_string()
            }
            ApiError::ServiceUnavailable(_) => "Service temporarily unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Log server errors
        match &self {
            ApiError::InternalError(_)
            | ApiError::DatabaseError(_)
            | ApiError::ServiceUnavailable(_) => {
                tracing::error!(error = %self, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %self, code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            error: self.public_message(),
            code: error_code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

// Conversions from domain errors

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Timeout(label) => {
                ApiError::ServiceUnavailable(format!("{} exceeded its deadline", label))
            }
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("Resource not found"),
            _ => ApiError::DatabaseError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<AmortizationError> for ApiError {
    fn from(err: AmortizationError) -> Self {
        ApiError::BusinessRule {
            code: "INVALID_LOAN_PARAMETERS",
            message: err.to_string(),
        }
    }
}

impl From<LoanError> for ApiError {
    fn from(err: LoanError) -> Self {
        let code = err.code();
        match err {
            LoanError::ProductNotFound(_)
            | LoanError::ClientNotFound(_)
            | LoanError::EmployeeNotFound
            | LoanError::ContractNotFound(_)
            | LoanError::PaymentNotFound(_) => ApiError::NotFound {
                code,
                message: err.to_string(),
            },
            LoanError::Forbidden => ApiError::Forbidden(err.to_string()),
            LoanError::Database(db) => db.into(),
            _ => ApiError::BusinessRule {
                code,
                message: err.to_string(),
            },
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingFailed(_) => ApiError::InternalError(err.to_string()),
            JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::AccountDisabled => ApiError::Forbidden(err.to_string()),
            AuthError::LoginTaken(_) => ApiError::Conflict(err.to_string()),
            AuthError::Token(jwt) => jwt.into(),
            AuthError::Hashing(_) => ApiError::InternalError(err.to_string()),
            AuthError::Database(db) => db.into(),
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::PassportTaken => ApiError::Conflict(err.to_string()),
            ClientError::Account(auth) => auth.into(),
            ClientError::Database(db) => db.into(),
        }
    }
}

impl From<BackupError> for ApiError {
    fn from(err: BackupError) -> Self {
        match err {
            BackupError::Database(db) => db.into(),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

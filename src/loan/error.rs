//! Loan engine errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::amortization::AmortizationError;
use crate::db::DbError;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("Credit product {0} not found")]
    ProductNotFound(i64),

    #[error("Credit product {0} is not available")]
    ProductInactive(i64),

    #[error("Client {0} not found")]
    ClientNotFound(i64),

    #[error("Employee profile not found")]
    EmployeeNotFound,

    #[error("Amount {amount} is outside the product limits [{min}, {max}]")]
    AmountOutOfRange {
        amount: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Term of {term} months is outside the product limits [{min}, {max}]")]
    TermOutOfRange { term: i32, min: i32, max: i32 },

    #[error("Loan contract {0} not found")]
    ContractNotFound(i64),

    #[error("Scheduled payment {0} not found")]
    PaymentNotFound(i64),

    #[error("The loan belongs to another client")]
    Forbidden,

    #[error("Scheduled payment {0} is already paid")]
    AlreadyPaid(i64),

    #[error("Loan contract {0} is already closed")]
    AlreadyClosed(String),

    #[error("Loan contract {0} has no outstanding balance")]
    NoOutstandingBalance(String),

    #[error("Invalid loan parameters: {0}")]
    Calculation(#[from] AmortizationError),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<sqlx::Error> for LoanError {
    fn from(e: sqlx::Error) -> Self {
        LoanError::Database(DbError::Query(e))
    }
}

impl LoanError {
    /// Machine readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            LoanError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            LoanError::ProductInactive(_) => "PRODUCT_INACTIVE",
            LoanError::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            LoanError::EmployeeNotFound => "EMPLOYEE_NOT_FOUND",
            LoanError::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            LoanError::TermOutOfRange { .. } => "TERM_OUT_OF_RANGE",
            LoanError::ContractNotFound(_) => "CONTRACT_NOT_FOUND",
            LoanError::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            LoanError::Forbidden => "FORBIDDEN",
            LoanError::AlreadyPaid(_) => "ALREADY_PAID",
            LoanError::AlreadyClosed(_) => "ALREADY_CLOSED",
            LoanError::NoOutstandingBalance(_) => "NO_OUTSTANDING_BALANCE",
            LoanError::Calculation(_) => "INVALID_LOAN_PARAMETERS",
            LoanError::Database(DbError::Timeout(_)) => "TIMEOUT",
            LoanError::Database(_) => "DATABASE_ERROR",
        }
    }
}

//! Loan handlers: issuance, repayments and portfolio views

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use super::{AuthenticatedUser, ClientUser, StaffUser};
use crate::amortization::{self, LoanPreview};
use crate::error::ApiError;
use crate::loan::{
    Access, ClientLoan, EarlyRepaymentRequest, IssueLoanRequest, IssuedLoan, LoanService,
    LoanStats, LoanSummary, Operation, PaymentRequest, PreviewRequest, ScheduleItem,
};
use crate::models::UserRole;

fn access_for(user: &AuthenticatedUser) -> Access {
    match user.role {
        UserRole::Admin | UserRole::Manager => Access::Staff,
        UserRole::Client => Access::Client(user.user_id),
    }
}

/// POST /loans - Issue a loan to a client
pub async fn issue_loan(
    StaffUser(user): StaffUser,
    State(service): State<Arc<LoanService>>,
    Json(request): Json<IssueLoanRequest>,
) -> Result<(StatusCode, Json<IssuedLoan>), ApiError> {
    request.validate()?;

    let issued = service.issue(user.user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

pub async fn list_loans(
    _staff: StaffUser,
    State(service): State<Arc<LoanService>>,
) -> Result<Json<Vec<LoanSummary>>, ApiError> {
    Ok(Json(service.list_loans().await?))
}

/// GET /loans/:id/schedule - Staff, or the client owning the contract
pub async fn get_schedule(
    user: AuthenticatedUser,
    State(service): State<Arc<LoanService>>,
    Path(contract_id): Path<i64>,
) -> Result<Json<Vec<ScheduleItem>>, ApiError> {
    Ok(Json(service.schedule(access_for(&user), contract_id).await?))
}

pub async fn get_operations(
    user: AuthenticatedUser,
    State(service): State<Arc<LoanService>>,
    Path(contract_id): Path<i64>,
) -> Result<Json<Vec<Operation>>, ApiError> {
    Ok(Json(
        service.operations(access_for(&user), contract_id).await?,
    ))
}

/// POST /loans/preview - Payment figures without touching the database
pub async fn preview_loan(
    _staff: StaffUser,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<LoanPreview>, ApiError> {
    request.validate()?;

    let term = u32::try_from(request.term_months)
        .map_err(|_| ApiError::BadRequest("termMonths must be positive".to_string()))?;
    Ok(Json(amortization::preview(request.amount, request.rate, term)?))
}

/// GET /my-loans - Contracts of the calling client
pub async fn my_loans(
    ClientUser(user): ClientUser,
    State(service): State<Arc<LoanService>>,
) -> Result<Json<Vec<ClientLoan>>, ApiError> {
    Ok(Json(service.client_loans(user.user_id).await?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub message: String,
    pub contract_closed: bool,
    pub amount: Decimal,
    pub balance: Decimal,
}

/// POST /pay - Pay one scheduled installment
pub async fn pay(
    ClientUser(user): ClientUser,
    State(service): State<Arc<LoanService>>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let receipt = service.pay(user.user_id, request.schedule_id).await?;

    let message = if receipt.contract_closed {
        "Payment accepted, the loan is fully repaid"
    } else {
        "Payment accepted"
    };

    Ok(Json(PaymentResponse {
        message: message.to_string(),
        contract_closed: receipt.contract_closed,
        amount: receipt.amount,
        balance: receipt.balance,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarlyRepaymentResponse {
    pub message: String,
    pub paid_amount: Decimal,
    pub cancelled_installments: u64,
}

/// POST /early-repayment - Repay the whole outstanding balance
pub async fn early_repayment(
    ClientUser(user): ClientUser,
    State(service): State<Arc<LoanService>>,
    Json(request): Json<EarlyRepaymentRequest>,
) -> Result<Json<EarlyRepaymentResponse>, ApiError> {
    let receipt = service.early_repay(user.user_id, request.contract_id).await?;

    Ok(Json(EarlyRepaymentResponse {
        message: "Loan repaid early".to_string(),
        paid_amount: receipt.paid_amount,
        cancelled_installments: receipt.cancelled_installments,
    }))
}

/// GET /stats - Dashboard figures
pub async fn stats(
    _staff: StaffUser,
    State(service): State<Arc<LoanService>>,
) -> Result<Json<LoanStats>, ApiError> {
    Ok(Json(service.stats().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: 17,
            role,
            jti: "jti".to_string(),
        }
    }

    #[test]
    fn test_staff_see_every_contract() {
        assert!(matches!(access_for(&user(UserRole::Admin)), Access::Staff));
        assert!(matches!(access_for(&user(UserRole::Manager)), Access::Staff));
    }

    #[test]
    fn test_clients_are_scoped_to_themselves() {
        assert!(matches!(
            access_for(&user(UserRole::Client)),
            Access::Client(17)
        ));
    }
}

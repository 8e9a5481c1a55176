//! Loan contract, schedule and operation models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Contract lifecycle state. `Closed` is terminal.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "contract_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Active,
    Closed,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "operation_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Issue,
    ScheduledPayment,
    EarlyRepayment,
}

/// Loan contract row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoanContract {
    pub id: i64,
    pub contract_number: String,
    pub client_id: i64,
    pub product_id: i64,
    pub approved_by_employee_id: Option<i64>,
    pub amount: Decimal,
    /// Annual rate copied from the product at issuance
    pub interest_rate: Decimal,
    pub term_months: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Outstanding principal
    pub balance: Decimal,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl LoanContract {
    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }
}

/// One row of a repayment schedule
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub id: i64,
    pub contract_id: i64,
    pub payment_date: NaiveDate,
    pub payment_amount: Decimal,
    pub principal_amount: Decimal,
    pub interest_amount: Decimal,
    pub remaining_balance: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Immutable money movement on a contract
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: i64,
    pub contract_id: i64,
    pub employee_id: Option<i64>,
    pub operation_type: OperationType,
    pub amount: Decimal,
    pub description: String,
    pub operation_date: DateTime<Utc>,
}

/// Contract list entry for staff
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoanSummary {
    pub id: i64,
    pub contract_number: String,
    pub amount: Decimal,
    pub balance: Decimal,
    pub interest_rate: Decimal,
    pub term_months: i32,
    pub status: ContractStatus,
    pub start_date: NaiveDate,
    pub client_name: String,
    pub product_name: String,
}

/// Contract list entry for the owning client
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientLoan {
    pub id: i64,
    pub contract_number: String,
    pub amount: Decimal,
    pub balance: Decimal,
    pub interest_rate: Decimal,
    pub term_months: i32,
    pub status: ContractStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub product_name: String,
}

fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > Decimal::ZERO && amount.scale() <= 2 {
        Ok(())
    } else {
        Err(ValidationError::new("positive_money"))
    }
}

/// Highest annual rate, in percent, accepted for a preview
pub const MAX_PREVIEW_RATE: Decimal = Decimal::ONE_HUNDRED;

fn preview_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(ValidationError::new("non_negative_rate"));
    }
    if *rate > MAX_PREVIEW_RATE {
        return Err(ValidationError::new("rate_too_high"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueLoanRequest {
    pub client_id: i64,
    pub product_id: i64,
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,
    #[validate(range(min = 1, max = 600))]
    pub term_months: i32,
    /// Issuing employee; defaults to the caller's own employee profile
    pub employee_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedLoan {
    pub contract_id: i64,
    pub contract_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub schedule_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub contract_id: i64,
    pub amount: Decimal,
    pub balance: Decimal,
    pub contract_closed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarlyRepaymentRequest {
    pub contract_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarlyRepaymentReceipt {
    pub contract_id: i64,
    pub paid_amount: Decimal,
    /// Unpaid schedule rows removed
    pub cancelled_installments: u64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,
    #[validate(custom = "preview_rate")]
    pub rate: Decimal,
    #[validate(range(min = 1, max = 600))]
    pub term_months: i32,
}

/// Portfolio share of one product
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DistributionSlice {
    pub label: String,
    pub value: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanStats {
    pub total_issued: Decimal,
    pub total_repaid: Decimal,
    pub active_contracts: i64,
    pub closed_contracts: i64,
    pub distribution: Vec<DistributionSlice>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_issue_request_accepts_string_and_number_amounts() {
        let from_string: IssueLoanRequest = serde_json::from_str(
            r#"{"clientId": 1, "productId": 2, "amount": "120000.00", "termMonths": 12}"#,
        )
        .unwrap();
        let from_number: IssueLoanRequest = serde_json::from_str(
            r#"{"clientId": 1, "productId": 2, "amount": 120000, "termMonths": 12}"#,
        )
        .unwrap();

        assert_eq!(from_string.amount, dec!(120000));
        assert_eq!(from_number.amount, dec!(120000));
        assert!(from_string.employee_id.is_none());
    }

    #[test]
    fn test_preview_rate_bounds() {
        let request = |rate| PreviewRequest {
            amount: dec!(1000),
            rate,
            term_months: 600,
        };

        assert!(request(Decimal::ZERO).validate().is_ok());
        assert!(request(dec!(100)).validate().is_ok());
        assert!(request(dec!(100.01)).validate().is_err());
        assert!(request(dec!(1000)).validate().is_err());
        assert!(request(dec!(-0.5)).validate().is_err());
    }

    #[test]
    fn test_issue_request_validation() {
        let valid = IssueLoanRequest {
            client_id: 1,
            product_id: 1,
            amount: dec!(50000),
            term_months: 12,
            employee_id: None,
        };
        assert!(valid.validate().is_ok());

        let negative = IssueLoanRequest {
            amount: dec!(-5),
            ..valid
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_sub_cent_amount_rejected() {
        let request = IssueLoanRequest {
            client_id: 1,
            product_id: 1,
            amount: dec!(100.001),
            term_months: 12,
            employee_id: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_zero_term_rejected() {
        let request = PreviewRequest {
            amount: dec!(1000),
            rate: dec!(10),
            term_months: 0,
        };
        assert!(request.validate().is_err());

        let request = PreviewRequest {
            amount: dec!(1000),
            rate: dec!(-1),
            term_months: 12,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_value(ContractStatus::Closed).unwrap(),
            "closed"
        );
        assert_eq!(
            serde_json::to_value(OperationType::EarlyRepayment).unwrap(),
            "early_repayment"
        );
    }
}

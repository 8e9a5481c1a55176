//! Loan issuance and repayment engine

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::postgres::PgConnection;

use crate::amortization::{self, round_money};
use crate::audit::{self, AuditAction, AuditEntry};
use crate::catalog::find_product;
use crate::db::Database;

use super::error::LoanError;
use super::model::*;
use super::schedule;

/// Balances at or below half a cent count as fully repaid
pub const CLOSURE_EPSILON: Decimal = dec!(0.005);

/// Who is looking at a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Staff,
    /// Client identified by user id; sees only their own contracts
    Client(i64),
}

/// `LN-<YYYYMMDD>-<8 digit sequence>`
pub fn format_contract_number(date: NaiveDate, sequence: i64) -> String {
    format!("LN-{}-{:08}", date.format("%Y%m%d"), sequence)
}

/// Balance left after paying `principal`, and whether that closes the loan
pub fn settle_balance(balance: Decimal, principal: Decimal) -> (Decimal, bool) {
    let remaining = (balance - principal).max(Decimal::ZERO);
    if remaining <= CLOSURE_EPSILON {
        (Decimal::ZERO, true)
    } else {
        (remaining, false)
    }
}

const CONTRACT_COLUMNS: &str = "id, contract_number, client_id, product_id, approved_by_employee_id, \
     amount, interest_rate, term_months, start_date, end_date, balance, status, created_at, closed_at";

async fn lock_contract(
    conn: &mut PgConnection,
    contract_id: i64,
) -> Result<Option<LoanContract>, sqlx::Error> {
    sqlx::query_as::<_, LoanContract>(&format!(
        "SELECT {} FROM loan_contracts WHERE id = $1 FOR UPDATE",
        CONTRACT_COLUMNS
    ))
    .bind(contract_id)
    .fetch_optional(conn)
    .await
}

async fn insert_operation(
    conn: &mut PgConnection,
    contract_id: i64,
    employee_id: Option<i64>,
    operation_type: OperationType,
    amount: Decimal,
    description: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO operations (contract_id, employee_id, operation_type, amount, description, operation_date)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING id
        "#,
    )
    .bind(contract_id)
    .bind(employee_id)
    .bind(operation_type)
    .bind(amount)
    .bind(description)
    .fetch_one(conn)
    .await
}

/// Loan contract service
#[derive(Clone)]
pub struct LoanService {
    db: Database,
}

impl LoanService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Issue a loan: contract, schedule, `issue` operation and audit entry in
    /// one unit of work. Product limits and the client are checked before the
    /// transaction opens.
    pub async fn issue(
        &self,
        actor_user_id: i64,
        request: &IssueLoanRequest,
    ) -> Result<IssuedLoan, LoanError> {
        let product = find_product(self.db.pool(), request.product_id)
            .await?
            .ok_or(LoanError::ProductNotFound(request.product_id))?;

        if !product.is_active {
            return Err(LoanError::ProductInactive(product.id));
        }

        let amount = round_money(request.amount);
        if !product.amount_in_range(amount) {
            return Err(LoanError::AmountOutOfRange {
                amount,
                min: product.min_amount,
                max: product.max_amount,
            });
        }
        if !product.term_in_range(request.term_months) {
            return Err(LoanError::TermOutOfRange {
                term: request.term_months,
                min: product.min_term_months,
                max: product.max_term_months,
            });
        }
        let term = u32::try_from(request.term_months).map_err(|_| LoanError::TermOutOfRange {
            term: request.term_months,
            min: product.min_term_months,
            max: product.max_term_months,
        })?;

        let client_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1)")
                .bind(request.client_id)
                .fetch_one(self.db.pool())
                .await?;
        if !client_exists {
            return Err(LoanError::ClientNotFound(request.client_id));
        }

        let employee_id = self
            .resolve_employee(actor_user_id, request.employee_id)
            .await?;

        let rate = product.interest_rate;
        let start_date = Utc::now().date_naive();
        let end_date = schedule::due_date(start_date, term);

        // Fail on calculator input before any row is written
        amortization::annuity_payment(amount, rate, term)?;

        self.db
            .with_deadline("issue_loan", async {
                let mut uow = self.db.begin("issue_loan").await?;

                let sequence: i64 = sqlx::query_scalar("SELECT nextval('loan_contract_number_seq')")
                    .fetch_one(uow.conn()?)
                    .await?;
                let contract_number = format_contract_number(start_date, sequence);

                let contract_id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO loan_contracts
                        (contract_number, client_id, product_id, approved_by_employee_id, amount,
                         interest_rate, term_months, start_date, end_date, balance, status)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $5, $10)
                    RETURNING id
                    "#,
                )
                .bind(&contract_number)
                .bind(request.client_id)
                .bind(product.id)
                .bind(employee_id)
                .bind(amount)
                .bind(rate)
                .bind(request.term_months)
                .bind(start_date)
                .bind(end_date)
                .bind(ContractStatus::Active)
                .fetch_one(uow.conn()?)
                .await?;

                let rows = schedule::generate(contract_id, amount, rate, term, start_date)?;
                schedule::insert_rows(uow.conn()?, &rows).await?;

                insert_operation(
                    uow.conn()?,
                    contract_id,
                    employee_id,
                    OperationType::Issue,
                    amount,
                    "Loan issued",
                )
                .await?;

                let entry = AuditEntry::new(
                    Some(actor_user_id),
                    AuditAction::IssueLoan,
                    "loan_contracts",
                    contract_id,
                )
                .detail("contract", &contract_number)
                .detail("amount", amount)
                .detail("term", term)
                .detail("rate", rate);
                audit::record(uow.conn()?, &entry).await;

                uow.commit().await?;

                tracing::info!(
                    contract_id,
                    contract_number = %contract_number,
                    client_id = request.client_id,
                    amount = %amount,
                    term_months = term,
                    "Loan issued"
                );

                Ok::<_, LoanError>(IssuedLoan {
                    contract_id,
                    contract_number,
                })
            })
            .await
    }

    async fn resolve_employee(
        &self,
        actor_user_id: i64,
        requested: Option<i64>,
    ) -> Result<Option<i64>, LoanError> {
        match requested {
            Some(employee_id) => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM employees WHERE id = $1)")
                        .bind(employee_id)
                        .fetch_one(self.db.pool())
                        .await?;
                if exists {
                    Ok(Some(employee_id))
                } else {
                    Err(LoanError::EmployeeNotFound)
                }
            }
            None => Ok(
                sqlx::query_scalar("SELECT id FROM employees WHERE user_id = $1")
                    .bind(actor_user_id)
                    .fetch_optional(self.db.pool())
                    .await?,
            ),
        }
    }

    /// Pay one scheduled installment on behalf of its owning client.
    ///
    /// The contract row is locked first, then the schedule row is flipped
    /// with a compare-and-set, so racing payments on the same row or the
    /// same contract serialize and exactly one wins.
    pub async fn pay(
        &self,
        client_user_id: i64,
        schedule_id: i64,
    ) -> Result<PaymentReceipt, LoanError> {
        self.db
            .with_deadline("pay", async {
                let mut uow = self.db.begin("pay").await?;

                let target: Option<(i64, i64)> = sqlx::query_as(
                    r#"
                    SELECT rs.contract_id, c.user_id
                    FROM repayment_schedule rs
                    JOIN loan_contracts lc ON lc.id = rs.contract_id
                    JOIN clients c ON c.id = lc.client_id
                    WHERE rs.id = $1
                    "#,
                )
                .bind(schedule_id)
                .fetch_optional(uow.conn()?)
                .await?;

                let (contract_id, owner_user_id) =
                    target.ok_or(LoanError::PaymentNotFound(schedule_id))?;
                if owner_user_id != client_user_id {
                    return Err(LoanError::Forbidden);
                }

                let contract = lock_contract(uow.conn()?, contract_id)
                    .await?
                    .ok_or(LoanError::ContractNotFound(contract_id))?;

                if !contract.is_active() {
                    return Err(LoanError::AlreadyClosed(contract.contract_number));
                }

                let item = schedule::mark_paid(uow.conn()?, schedule_id)
                    .await?
                    .ok_or(LoanError::AlreadyPaid(schedule_id))?;

                let (balance, closes) = settle_balance(contract.balance, item.principal_amount);

                sqlx::query(
                    r#"
                    UPDATE loan_contracts
                    SET balance = $2,
                        status = $3,
                        closed_at = CASE WHEN $4 THEN NOW() ELSE closed_at END
                    WHERE id = $1
                    "#,
                )
                .bind(contract_id)
                .bind(balance)
                .bind(if closes {
                    ContractStatus::Closed
                } else {
                    ContractStatus::Active
                })
                .bind(closes)
                .execute(uow.conn()?)
                .await?;

                insert_operation(
                    uow.conn()?,
                    contract_id,
                    None,
                    OperationType::ScheduledPayment,
                    item.payment_amount,
                    &format!("Scheduled payment due {}", item.payment_date),
                )
                .await?;

                let entry = AuditEntry::new(
                    Some(client_user_id),
                    AuditAction::Payment,
                    "repayment_schedule",
                    schedule_id,
                )
                .detail("contract", &contract.contract_number)
                .detail("amount", item.payment_amount)
                .detail("principal", item.principal_amount)
                .detail("balance", balance);
                audit::record(uow.conn()?, &entry).await;

                uow.commit().await?;

                tracing::info!(
                    contract_id,
                    schedule_id,
                    amount = %item.payment_amount,
                    balance = %balance,
                    "Scheduled payment applied"
                );
                if closes {
                    tracing::info!(contract_id, "Loan contract closed by final payment");
                }

                Ok::<_, LoanError>(PaymentReceipt {
                    contract_id,
                    amount: item.payment_amount,
                    balance,
                    contract_closed: closes,
                })
            })
            .await
    }

    /// Close a contract by paying its outstanding principal at once. Unpaid
    /// installments are deleted and their interest is waived.
    pub async fn early_repay(
        &self,
        client_user_id: i64,
        contract_id: i64,
    ) -> Result<EarlyRepaymentReceipt, LoanError> {
        self.db
            .with_deadline("early_repayment", async {
                let mut uow = self.db.begin("early_repayment").await?;

                let contract = lock_contract(uow.conn()?, contract_id)
                    .await?
                    .ok_or(LoanError::ContractNotFound(contract_id))?;

                let owner_user_id: i64 =
                    sqlx::query_scalar("SELECT user_id FROM clients WHERE id = $1")
                        .bind(contract.client_id)
                        .fetch_one(uow.conn()?)
                        .await?;
                if owner_user_id != client_user_id {
                    return Err(LoanError::Forbidden);
                }

                if !contract.is_active() {
                    return Err(LoanError::AlreadyClosed(contract.contract_number));
                }
                if contract.balance <= Decimal::ZERO {
                    return Err(LoanError::NoOutstandingBalance(contract.contract_number));
                }

                let paid_amount = contract.balance;

                sqlx::query(
                    "UPDATE loan_contracts SET balance = 0, status = $2, closed_at = NOW() WHERE id = $1",
                )
                .bind(contract_id)
                .bind(ContractStatus::Closed)
                .execute(uow.conn()?)
                .await?;

                let cancelled = schedule::delete_unpaid(uow.conn()?, contract_id).await?;

                insert_operation(
                    uow.conn()?,
                    contract_id,
                    None,
                    OperationType::EarlyRepayment,
                    paid_amount,
                    "Early repayment of outstanding principal",
                )
                .await?;

                let entry = AuditEntry::new(
                    Some(client_user_id),
                    AuditAction::EarlyRepayment,
                    "loan_contracts",
                    contract_id,
                )
                .detail("contract", &contract.contract_number)
                .detail("amount", paid_amount)
                .detail("cancelled_installments", cancelled);
                audit::record(uow.conn()?, &entry).await;

                uow.commit().await?;

                tracing::info!(
                    contract_id,
                    paid_amount = %paid_amount,
                    cancelled_installments = cancelled,
                    "Loan contract closed by early repayment"
                );

                Ok::<_, LoanError>(EarlyRepaymentReceipt {
                    contract_id,
                    paid_amount,
                    cancelled_installments: cancelled,
                })
            })
            .await
    }

    /// Every contract, newest first
    pub async fn list_loans(&self) -> Result<Vec<LoanSummary>, LoanError> {
        let loans = sqlx::query_as::<_, LoanSummary>(
            r#"
            SELECT lc.id, lc.contract_number, lc.amount, lc.balance, lc.interest_rate,
                   lc.term_months, lc.status, lc.start_date,
                   c.last_name || ' ' || c.first_name AS client_name,
                   cp.name AS product_name
            FROM loan_contracts lc
            JOIN clients c ON lc.client_id = c.id
            JOIN credit_products cp ON lc.product_id = cp.id
            ORDER BY lc.created_at DESC, lc.id DESC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(loans)
    }

    /// Contracts owned by the client behind `client_user_id`
    pub async fn client_loans(&self, client_user_id: i64) -> Result<Vec<ClientLoan>, LoanError> {
        let loans = sqlx::query_as::<_, ClientLoan>(
            r#"
            SELECT lc.id, lc.contract_number, lc.amount, lc.balance, lc.interest_rate,
                   lc.term_months, lc.status, lc.start_date, lc.end_date,
                   cp.name AS product_name
            FROM loan_contracts lc
            JOIN clients c ON lc.client_id = c.id
            JOIN credit_products cp ON lc.product_id = cp.id
            WHERE c.user_id = $1
            ORDER BY lc.created_at DESC, lc.id DESC
            "#,
        )
        .bind(client_user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(loans)
    }

    pub async fn get_contract(&self, contract_id: i64) -> Result<LoanContract, LoanError> {
        sqlx::query_as::<_, LoanContract>(&format!(
            "SELECT {} FROM loan_contracts WHERE id = $1",
            CONTRACT_COLUMNS
        ))
        .bind(contract_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(LoanError::ContractNotFound(contract_id))
    }

    async fn ensure_visible(&self, access: Access, contract_id: i64) -> Result<(), LoanError> {
        let owner_user_id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT c.user_id
            FROM loan_contracts lc
            JOIN clients c ON lc.client_id = c.id
            WHERE lc.id = $1
            "#,
        )
        .bind(contract_id)
        .fetch_optional(self.db.pool())
        .await?;

        let owner_user_id = owner_user_id.ok_or(LoanError::ContractNotFound(contract_id))?;

        match access {
            Access::Staff => Ok(()),
            Access::Client(user_id) if user_id == owner_user_id => Ok(()),
            Access::Client(_) => Err(LoanError::Forbidden),
        }
    }

    pub async fn schedule(
        &self,
        access: Access,
        contract_id: i64,
    ) -> Result<Vec<ScheduleItem>, LoanError> {
        self.ensure_visible(access, contract_id).await?;
        Ok(schedule::list(self.db.pool(), contract_id).await?)
    }

    /// Operation history, oldest first
    pub async fn operations(
        &self,
        access: Access,
        contract_id: i64,
    ) -> Result<Vec<Operation>, LoanError> {
        self.ensure_visible(access, contract_id).await?;

        let operations = sqlx::query_as::<_, Operation>(
            r#"
            SELECT id, contract_id, employee_id, operation_type, amount, description, operation_date
            FROM operations
            WHERE contract_id = $1
            ORDER BY operation_date ASC, id ASC
            "#,
        )
        .bind(contract_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(operations)
    }

    /// Portfolio dashboard figures
    pub async fn stats(&self) -> Result<LoanStats, LoanError> {
        let pool = self.db.pool();

        let (total_issued, active_contracts, closed_contracts): (Decimal, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT COALESCE(SUM(amount), 0),
                       COUNT(*) FILTER (WHERE status = 'active'),
                       COUNT(*) FILTER (WHERE status = 'closed')
                FROM loan_contracts
                "#,
            )
            .fetch_one(pool)
            .await?;

        let total_repaid: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM operations
            WHERE operation_type IN ('scheduled_payment', 'early_repayment')
            "#,
        )
        .fetch_one(pool)
        .await?;

        let distribution = sqlx::query_as::<_, DistributionSlice>(
            r#"
            SELECT cp.name AS label, COUNT(lc.id) AS value
            FROM loan_contracts lc
            JOIN credit_products cp ON lc.product_id = cp.id
            GROUP BY cp.name
            ORDER BY value DESC, label ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(LoanStats {
            total_issued,
            total_repaid,
            active_contracts,
            closed_contracts,
            distribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_number_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(format_contract_number(date, 42), "LN-20240309-00000042");
        assert_eq!(
            format_contract_number(date, 123_456_789),
            "LN-20240309-123456789"
        );
    }

    #[test]
    fn test_settle_balance_partial() {
        assert_eq!(
            settle_balance(dec!(120000), dec!(9461.85)),
            (dec!(110538.15), false)
        );
    }

    #[test]
    fn test_settle_balance_final_payment_closes() {
        assert_eq!(
            settle_balance(dec!(10556.35), dec!(10556.35)),
            (Decimal::ZERO, true)
        );
    }

    #[test]
    fn test_settle_balance_within_half_cent_closes() {
        assert_eq!(settle_balance(dec!(100.004), dec!(100)), (Decimal::ZERO, true));
        assert_eq!(settle_balance(dec!(100.005), dec!(100)), (Decimal::ZERO, true));
        assert_eq!(settle_balance(dec!(100.01), dec!(100)), (dec!(0.01), false));
    }

    #[test]
    fn test_settle_balance_never_negative() {
        assert_eq!(settle_balance(dec!(50), dec!(80)), (Decimal::ZERO, true));
    }
}

//! Repayment schedule ledger
//!
//! Rows are generated together with their contract and only ever change by
//! flipping `is_paid`. Early repayment deletes the unpaid remainder; paid rows
//! are never deleted.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use sqlx::postgres::PgConnection;
use sqlx::PgExecutor;

use crate::amortization::{self, AmortizationError};

use super::model::ScheduleItem;

/// Schedule row before it is persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduleItem {
    pub contract_id: i64,
    pub payment_date: NaiveDate,
    pub payment_amount: Decimal,
    pub principal_amount: Decimal,
    pub interest_amount: Decimal,
    pub remaining_balance: Decimal,
}

/// Due date of installment `number`: the start date advanced by that many
/// months, clamped to the end of shorter months.
pub fn due_date(start_date: NaiveDate, number: u32) -> NaiveDate {
    start_date
        .checked_add_months(Months::new(number))
        .unwrap_or(NaiveDate::MAX)
}

/// Build the ordered schedule for a contract
pub fn generate(
    contract_id: i64,
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: u32,
    start_date: NaiveDate,
) -> Result<Vec<NewScheduleItem>, AmortizationError> {
    let plan = amortization::amortize(principal, annual_rate_percent, term_months)?;

    Ok(plan
        .installments
        .into_iter()
        .map(|installment| NewScheduleItem {
            contract_id,
            payment_date: due_date(start_date, installment.number),
            payment_amount: installment.payment,
            principal_amount: installment.principal,
            interest_amount: installment.interest,
            remaining_balance: installment.remaining_balance,
        })
        .collect())
}

/// Insert all rows with a single multi-row statement
pub async fn insert_rows(conn: &mut PgConnection, rows: &[NewScheduleItem]) -> Result<(), sqlx::Error> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new(
        "INSERT INTO repayment_schedule \
         (contract_id, payment_date, payment_amount, principal_amount, interest_amount, remaining_balance) ",
    );

    query_builder.push_values(rows, |mut b, row| {
        b.push_bind(row.contract_id)
            .push_bind(row.payment_date)
            .push_bind(row.payment_amount)
            .push_bind(row.principal_amount)
            .push_bind(row.interest_amount)
            .push_bind(row.remaining_balance);
    });

    query_builder.build().execute(conn).await?;

    Ok(())
}

const SCHEDULE_COLUMNS: &str = "id, contract_id, payment_date, payment_amount, principal_amount, \
     interest_amount, remaining_balance, is_paid, paid_at";

/// Flip an unpaid row to paid.
///
/// Returns `None` when the row is missing or was already paid; concurrent
/// callers racing on one row see exactly one `Some`.
pub async fn mark_paid(conn: &mut PgConnection, row_id: i64) -> Result<Option<ScheduleItem>, sqlx::Error> {
    sqlx::query_as::<_, ScheduleItem>(&format!(
        "UPDATE repayment_schedule SET is_paid = TRUE, paid_at = NOW() \
         WHERE id = $1 AND is_paid = FALSE RETURNING {}",
        SCHEDULE_COLUMNS
    ))
    .bind(row_id)
    .fetch_optional(conn)
    .await
}

/// Remove every unpaid row of a contract, returning how many were removed
pub async fn delete_unpaid(conn: &mut PgConnection, contract_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM repayment_schedule WHERE contract_id = $1 AND is_paid = FALSE")
        .bind(contract_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

/// Rows of a contract ordered by due date
pub async fn list<'e, E>(executor: E, contract_id: i64) -> Result<Vec<ScheduleItem>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ScheduleItem>(&format!(
        "SELECT {} FROM repayment_schedule WHERE contract_id = $1 ORDER BY payment_date ASC, id ASC",
        SCHEDULE_COLUMNS
    ))
    .bind(contract_id)
    .fetch_all(executor)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_due_dates_are_monthly_from_start() {
        let start = date(2024, 1, 15);
        assert_eq!(due_date(start, 1), date(2024, 2, 15));
        assert_eq!(due_date(start, 12), date(2025, 1, 15));
    }

    #[test]
    fn test_due_dates_clamp_to_month_end_without_drift() {
        let start = date(2024, 1, 31);
        assert_eq!(due_date(start, 1), date(2024, 2, 29));
        assert_eq!(due_date(start, 2), date(2024, 3, 31));
        assert_eq!(due_date(start, 3), date(2024, 4, 30));
    }

    #[test]
    fn test_generate_schedule() {
        let rows = generate(7, dec!(120000), dec!(12), 12, date(2024, 3, 1)).unwrap();

        assert_eq!(rows.len(), 12);
        assert!(rows.iter().all(|r| r.contract_id == 7));
        assert_eq!(rows[0].payment_date, date(2024, 4, 1));
        assert_eq!(rows[11].payment_date, date(2025, 3, 1));
        assert_eq!(rows[0].payment_amount, dec!(10661.85));
        assert_eq!(rows[11].remaining_balance, Decimal::ZERO);

        let principal: Decimal = rows.iter().map(|r| r.principal_amount).sum();
        assert_eq!(principal, dec!(120000));
        assert!(rows.windows(2).all(|w| w[0].payment_date < w[1].payment_date));
    }

    #[test]
    fn test_generate_rejects_bad_input() {
        assert!(generate(1, dec!(1000), dec!(10), 0, date(2024, 1, 1)).is_err());
    }
}

//! Annuity amortization calculator
//!
//! Pure computation of a fixed monthly payment and its month-by-month split
//! into interest and principal. Every amount is rounded to the cent (half away
//! from zero), and the final installment absorbs the rounding residue so the
//! principal parts of a schedule always add up to the loan amount.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;

/// Invalid calculator input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmortizationError {
    #[error("Principal must be positive")]
    NonPositivePrincipal,

    #[error("Interest rate cannot be negative")]
    NegativeRate,

    #[error("Term must be at least one month")]
    ZeroTerm,

    #[error("Rate and term are too large to compute a payment")]
    Overflow,
}

/// Round an amount to the currency minor unit (2 decimal places, half up).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert an annual percentage rate into a monthly fraction (12% -> 0.01).
pub fn monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    annual_rate_percent / dec!(12) / dec!(100)
}

/// (1 + rate)^n by repeated multiplication, which stays exact in `Decimal`
/// where `powd` would drift. `None` once the value leaves `Decimal` range.
fn compound(rate: Decimal, n: u32) -> Option<Decimal> {
    let factor = Decimal::ONE.checked_add(rate)?;
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result = result.checked_mul(factor)?;
    }
    Some(result)
}

fn check_inputs(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: u32,
) -> Result<(), AmortizationError> {
    if principal <= Decimal::ZERO {
        return Err(AmortizationError::NonPositivePrincipal);
    }
    if annual_rate_percent < Decimal::ZERO {
        return Err(AmortizationError::NegativeRate);
    }
    if term_months == 0 {
        return Err(AmortizationError::ZeroTerm);
    }
    Ok(())
}

/// Fixed monthly annuity payment, rounded to the cent.
///
/// A zero rate has no annuity factor, so the principal is spread evenly
/// across the term instead.
pub fn annuity_payment(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: u32,
) -> Result<Decimal, AmortizationError> {
    check_inputs(principal, annual_rate_percent, term_months)?;

    let rate = monthly_rate(annual_rate_percent);
    if rate.is_zero() {
        return Ok(round_money(principal / Decimal::from(term_months)));
    }

    let growth = compound(rate, term_months).ok_or(AmortizationError::Overflow)?;
    let denominator = growth - Decimal::ONE;
    if denominator.is_zero() {
        return Ok(round_money(principal / Decimal::from(term_months)));
    }

    rate.checked_mul(growth)
        .and_then(|factor| principal.checked_mul(factor))
        .and_then(|scaled| scaled.checked_div(denominator))
        .map(round_money)
        .ok_or(AmortizationError::Overflow)
}

/// One month of a repayment plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    /// 1-based month number
    pub number: u32,
    pub payment: Decimal,
    pub interest: Decimal,
    pub principal: Decimal,
    /// Outstanding principal after this payment
    pub remaining_balance: Decimal,
}

/// Full repayment plan for a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Amortization {
    pub monthly_payment: Decimal,
    pub installments: Vec<Installment>,
}

impl Amortization {
    /// Sum of all payments, interest included
    pub fn total_payment(&self) -> Decimal {
        self.installments.iter().map(|i| i.payment).sum()
    }

    pub fn total_interest(&self) -> Decimal {
        self.installments.iter().map(|i| i.interest).sum()
    }

    pub fn total_principal(&self) -> Decimal {
        self.installments.iter().map(|i| i.principal).sum()
    }
}

/// Build the month-by-month plan for `principal` at `annual_rate_percent`
/// over `term_months`.
///
/// The last month (or any month whose scheduled principal would overshoot
/// the outstanding balance) pays off exactly the remaining balance, so its
/// payment may differ from the steady-state amount.
pub fn amortize(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: u32,
) -> Result<Amortization, AmortizationError> {
    let monthly_payment = annuity_payment(principal, annual_rate_percent, term_months)?;
    let rate = monthly_rate(annual_rate_percent);

    let mut balance = principal;
    let mut installments = Vec::with_capacity(term_months as usize);

    for number in 1..=term_months {
        let interest = round_money(balance * rate);
        let mut principal_part = monthly_payment - interest;
        let mut payment = monthly_payment;

        if number == term_months || principal_part > balance {
            principal_part = balance;
            payment = principal_part + interest;
        }

        balance = (balance - principal_part).max(Decimal::ZERO);

        installments.push(Installment {
            number,
            payment,
            interest,
            principal: principal_part,
            remaining_balance: balance,
        });
    }

    Ok(Amortization {
        monthly_payment,
        installments,
    })
}

/// Headline figures shown to an employee before a loan is issued
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPreview {
    pub monthly_payment: Decimal,
    pub total_payment: Decimal,
    pub total_interest: Decimal,
}

pub fn preview(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: u32,
) -> Result<LoanPreview, AmortizationError> {
    let plan = amortize(principal, annual_rate_percent, term_months)?;
    Ok(LoanPreview {
        monthly_payment: plan.monthly_payment,
        total_payment: plan.total_payment(),
        total_interest: plan.total_interest(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monthly_rate() {
        assert_eq!(monthly_rate(dec!(12)), dec!(0.01));
        assert_eq!(monthly_rate(dec!(6)), dec!(0.005));
    }

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
        assert_eq!(round_money(dec!(2.675)), dec!(2.68));
    }

    #[test]
    fn test_reference_loan() {
        let plan = amortize(dec!(120000), dec!(12), 12).unwrap();

        assert_eq!(plan.monthly_payment, dec!(10661.85));
        assert_eq!(plan.installments.len(), 12);

        let first = &plan.installments[0];
        assert_eq!(first.interest, dec!(1200.00));
        assert_eq!(first.principal, dec!(9461.85));
        assert_eq!(first.remaining_balance, dec!(110538.15));

        let last = plan.installments.last().unwrap();
        assert_eq!(last.remaining_balance, Decimal::ZERO);
        assert_eq!(last.principal, dec!(10556.35));
        assert_eq!(last.payment, dec!(10661.91));
    }

    #[test]
    fn test_principal_sums_to_amount() {
        let cases = [
            (dec!(120000), dec!(12), 12),
            (dec!(50000), dec!(9.9), 36),
            (dec!(1000000), dec!(7.5), 240),
            (dec!(333.33), dec!(19.99), 7),
            (dec!(15000.01), dec!(0.01), 60),
        ];

        for (principal, rate, term) in cases {
            let plan = amortize(principal, rate, term).unwrap();
            assert_eq!(plan.total_principal(), principal, "{principal} @ {rate} / {term}");
            assert_eq!(
                plan.installments.last().unwrap().remaining_balance,
                Decimal::ZERO
            );
            assert_eq!(plan.installments.len(), term as usize);
        }
    }

    #[test]
    fn test_payment_constant_except_last() {
        let plan = amortize(dec!(250000), dec!(10.5), 48).unwrap();
        let (last, rest) = plan.installments.split_last().unwrap();

        assert!(rest.iter().all(|i| i.payment == plan.monthly_payment));
        assert_eq!(last.payment, last.principal + last.interest);
    }

    #[test]
    fn test_balance_never_increases() {
        let plan = amortize(dec!(80000), dec!(15), 24).unwrap();
        let mut previous = dec!(80000);
        for installment in &plan.installments {
            assert!(installment.remaining_balance <= previous);
            assert!(installment.remaining_balance >= Decimal::ZERO);
            previous = installment.remaining_balance;
        }
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let plan = amortize(dec!(1000), Decimal::ZERO, 3).unwrap();

        assert_eq!(plan.monthly_payment, dec!(333.33));
        assert!(plan.installments.iter().all(|i| i.interest.is_zero()));
        assert_eq!(plan.installments[2].principal, dec!(333.34));
        assert_eq!(plan.total_principal(), dec!(1000));
        assert_eq!(plan.total_interest(), Decimal::ZERO);
    }

    #[test]
    fn test_single_month_term() {
        let plan = amortize(dec!(1000), dec!(12), 1).unwrap();

        assert_eq!(plan.installments.len(), 1);
        assert_eq!(plan.installments[0].interest, dec!(10.00));
        assert_eq!(plan.installments[0].principal, dec!(1000));
        assert_eq!(plan.installments[0].payment, dec!(1010.00));
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(
            amortize(Decimal::ZERO, dec!(12), 12),
            Err(AmortizationError::NonPositivePrincipal)
        );
        assert_eq!(
            amortize(dec!(100), dec!(-1), 12),
            Err(AmortizationError::NegativeRate)
        );
        assert_eq!(
            amortize(dec!(100), dec!(12), 0),
            Err(AmortizationError::ZeroTerm)
        );
    }

    #[test]
    fn test_huge_rate_and_term_overflow_is_an_error() {
        assert_eq!(
            preview(dec!(1000), dec!(1000), 600),
            Err(AmortizationError::Overflow)
        );
        assert_eq!(
            annuity_payment(dec!(1000), dec!(999.99), 600),
            Err(AmortizationError::Overflow)
        );
    }

    #[test]
    fn test_highest_accepted_rate_still_computes() {
        let plan = amortize(dec!(1000), dec!(100), 600).unwrap();
        assert_eq!(plan.installments.len(), 600);
        assert_eq!(plan.total_principal(), dec!(1000));
    }

    #[test]
    fn test_preview_totals() {
        let preview = preview(dec!(120000), dec!(12), 12).unwrap();

        assert_eq!(preview.monthly_payment, dec!(10661.85));
        assert_eq!(preview.total_payment, dec!(127942.26));
        assert_eq!(preview.total_interest, dec!(7942.26));
    }
}

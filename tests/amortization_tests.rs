//! Repayment plan properties over realistic loan shapes

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use rosebank_server::amortization::{amortize, preview, AmortizationError};

    /// The seeded products at their limits plus a few everyday loans
    fn loans() -> Vec<(Decimal, Decimal, u32)> {
        vec![
            (dec!(120000), dec!(12), 12),
            (dec!(10000), dec!(12), 6),
            (dec!(500000), dec!(12), 60),
            (dec!(100000), dec!(9.5), 84),
            (dec!(15000000), dec!(7.5), 360),
            (dec!(1000), dec!(19.9), 1),
            (dec!(33333.33), dec!(19.9), 7),
        ]
    }

    #[test]
    fn test_principal_sums_to_loan_amount() {
        for (principal, rate, term) in loans() {
            let plan = amortize(principal, rate, term).unwrap();
            assert_eq!(plan.total_principal(), principal, "{} @ {}% / {}", principal, rate, term);
        }
    }

    #[test]
    fn test_last_row_clears_balance() {
        for (principal, rate, term) in loans() {
            let plan = amortize(principal, rate, term).unwrap();
            assert_eq!(plan.installments.len(), term as usize);
            let last = plan.installments.last().unwrap();
            assert_eq!(last.remaining_balance, Decimal::ZERO);
            assert_eq!(last.number, term);
        }
    }

    #[test]
    fn test_payment_constant_except_last() {
        for (principal, rate, term) in loans() {
            let plan = amortize(principal, rate, term).unwrap();
            let (last, rest) = plan.installments.split_last().unwrap();
            assert!(rest.iter().all(|i| i.payment == plan.monthly_payment));
            assert_eq!(last.payment, last.principal + last.interest);
        }
    }

    #[test]
    fn test_balances_decrease_monotonically() {
        let plan = amortize(dec!(500000), dec!(12), 60).unwrap();
        let mut previous = dec!(500000);
        for row in &plan.installments {
            assert!(row.remaining_balance < previous);
            assert_eq!(previous - row.principal, row.remaining_balance);
            previous = row.remaining_balance;
        }
    }

    #[test]
    fn test_reference_loan() {
        let plan = amortize(dec!(120000), dec!(12), 12).unwrap();
        assert_eq!(plan.monthly_payment, dec!(10661.85));

        let first = &plan.installments[0];
        assert_eq!(first.interest, dec!(1200.00));
        assert_eq!(first.principal, dec!(9461.85));
        assert_eq!(first.remaining_balance, dec!(110538.15));

        let figures = preview(dec!(120000), dec!(12), 12).unwrap();
        assert_eq!(figures.monthly_payment, dec!(10661.85));
        assert_eq!(figures.total_payment, plan.total_payment());
        assert_eq!(figures.total_interest, figures.total_payment - dec!(120000));
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let plan = amortize(dec!(1200), Decimal::ZERO, 12).unwrap();
        assert_eq!(plan.monthly_payment, dec!(100));
        assert!(plan.installments.iter().all(|i| i.interest.is_zero()));
        assert_eq!(plan.total_payment(), dec!(1200));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            amortize(Decimal::ZERO, dec!(12), 12),
            Err(AmortizationError::NonPositivePrincipal)
        ));
        assert!(matches!(
            amortize(dec!(1000), dec!(-1), 12),
            Err(AmortizationError::NegativeRate)
        ));
        assert!(matches!(
            amortize(dec!(1000), dec!(12), 0),
            Err(AmortizationError::ZeroTerm)
        ));
    }
}

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::input::{checked_div, checked_mul};
use crate::types::{Money, Rate};
use crate::EngineResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceabilityBreakdown {
    pub monthly_income: Money,
    /// Income share available for repayments before expenses.
    pub repayment_allowance: Money,
    pub monthly_expenses: Money,
    /// Allowance net of expenses, floored at zero.
    pub monthly_capacity: Money,
    pub annual_capacity: Money,
    pub max_loan: Money,
}

/// Largest loan the household can service.
///
/// The ceiling is `annual_capacity / annual_rate`, an interest-only proxy
/// rather than an annuity inversion. Published reference figures depend on it.
pub fn max_loan_by_serviceability(
    annual_income: Money,
    monthly_expenses: Money,
    annual_rate: Rate,
    serviceability_ratio: Rate,
) -> EngineResult<Money> {
    serviceability_breakdown(annual_income, monthly_expenses, annual_rate, serviceability_ratio)
        .map(|b| b.max_loan)
}

pub fn serviceability_breakdown(
    annual_income: Money,
    monthly_expenses: Money,
    annual_rate: Rate,
    serviceability_ratio: Rate,
) -> EngineResult<ServiceabilityBreakdown> {
    if annual_income < Decimal::ZERO {
        return Err(EngineError::invalid_numeric(
            "annual_income",
            "cannot be negative",
        ));
    }
    if monthly_expenses < Decimal::ZERO {
        return Err(EngineError::invalid_numeric(
            "monthly_expenses",
            "cannot be negative",
        ));
    }
    if annual_rate <= Decimal::ZERO {
        return Err(EngineError::policy("annual_rate", "must be positive"));
    }
    if serviceability_ratio <= Decimal::ZERO || serviceability_ratio > Decimal::ONE {
        return Err(EngineError::policy(
            "serviceability_ratio",
            "must be in (0, 1]",
        ));
    }

    let monthly_income = annual_income / dec!(12);
    let repayment_allowance = monthly_income * serviceability_ratio;
    let monthly_capacity = (repayment_allowance - monthly_expenses).max(Decimal::ZERO);
    let annual_capacity = checked_mul("annual_income", monthly_capacity, dec!(12))?;
    let max_loan = checked_div("annual_income", annual_capacity, annual_rate)?;

    Ok(ServiceabilityBreakdown {
        monthly_income,
        repayment_allowance,
        monthly_expenses,
        monthly_capacity,
        annual_capacity,
        max_loan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_single_applicant() {
        // 90k/12 = 7500; *0.30 = 2250; -1760 = 490; *12 = 5880; /0.06 = 98,000
        let max = max_loan_by_serviceability(dec!(90_000), dec!(1760), dec!(0.06), dec!(0.30)).unwrap();
        assert_eq!(max, dec!(98_000));
    }

    #[test]
    fn test_breakdown_fields() {
        let b = serviceability_breakdown(dec!(120_000), dec!(1000), dec!(0.05), dec!(0.30)).unwrap();
        assert_eq!(b.monthly_income, dec!(10_000));
        assert_eq!(b.repayment_allowance, dec!(3000));
        assert_eq!(b.monthly_capacity, dec!(2000));
        assert_eq!(b.annual_capacity, dec!(24_000));
        assert_eq!(b.max_loan, dec!(480_000));
    }

    #[test]
    fn test_expenses_exceeding_allowance_floor_at_zero() {
        let max = max_loan_by_serviceability(dec!(30_000), dec!(2000), dec!(0.06), dec!(0.30)).unwrap();
        assert_eq!(max, Decimal::ZERO);
    }

    #[test]
    fn test_zero_income_is_zero() {
        let max = max_loan_by_serviceability(Decimal::ZERO, Decimal::ZERO, dec!(0.06), dec!(0.30)).unwrap();
        assert_eq!(max, Decimal::ZERO);
    }

    #[test]
    fn test_zero_rate_is_policy_error() {
        let err = max_loan_by_serviceability(dec!(90_000), dec!(1000), Decimal::ZERO, dec!(0.30)).unwrap_err();
        assert!(matches!(err, EngineError::PolicyMisconfiguration { .. }));
    }

    #[test]
    fn test_tiny_rate_overflow_is_an_error() {
        let tiny_rate = dec!(0.0000000000000000000000000001);
        let err = max_loan_by_serviceability(dec!(1_000_000_000_000), Decimal::ZERO, tiny_rate, dec!(0.30))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidNumericInput { .. }), "got {err:?}");
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(max_loan_by_serviceability(dec!(90_000), dec!(0), dec!(0.06), dec!(1.5)).is_err());
        assert!(max_loan_by_serviceability(dec!(90_000), dec!(0), dec!(0.06), Decimal::ZERO).is_err());
        assert!(max_loan_by_serviceability(dec!(90_000), dec!(0), dec!(0.06), Decimal::ONE).is_ok());
    }
}

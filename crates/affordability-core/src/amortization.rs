use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::input::{checked_div, checked_mul};
use crate::policy::MAX_TERM_YEARS;
use crate::types::{Money, Rate, Years};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Term selection
// ---------------------------------------------------------------------------

/// Repayment preference stated by the borrower in the wizard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepaymentPreference {
    LowestRepayment,
    FastestPayoff,
    Flexibility,
    LowestRate,
    #[default]
    NoPreference,
}

impl RepaymentPreference {
    pub fn describe(self, term_years: Years) -> String {
        match self {
            RepaymentPreference::LowestRepayment => {
                format!("{term_years}-year term for lowest monthly payment")
            }
            RepaymentPreference::FastestPayoff => format!("{term_years}-year term for faster payoff"),
            RepaymentPreference::Flexibility => {
                format!("{term_years}-year term for balanced flexibility")
            }
            RepaymentPreference::LowestRate => format!("{term_years}-year term for competitive rate"),
            RepaymentPreference::NoPreference => format!("{term_years}-year standard term"),
        }
    }
}

/// Loan term for a stated preference. A pure lookup.
pub fn term_for_preference(preference: RepaymentPreference, default_term: Years) -> Years {
    match preference {
        RepaymentPreference::LowestRepayment | RepaymentPreference::LowestRate => 30,
        RepaymentPreference::FastestPayoff => 15,
        RepaymentPreference::Flexibility => 25,
        RepaymentPreference::NoPreference => default_term,
    }
}

// ---------------------------------------------------------------------------
// Repayments
// ---------------------------------------------------------------------------

/// Fixed-rate monthly repayment: P * r(1+r)^n / ((1+r)^n - 1), r = rate/12, n = years*12.
pub fn monthly_repayment(principal: Money, annual_rate: Rate, term_years: Years) -> EngineResult<Money> {
    let (monthly_rate, months) = validate_terms(principal, annual_rate, term_years)?;

    if monthly_rate.is_zero() {
        return Ok(principal / Decimal::from(months));
    }

    let compound = compound_factor(monthly_rate, months)?;
    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        return Err(EngineError::policy(
            "annual_rate",
            "rate too small to amortise over this term",
        ));
    }
    let interest = checked_mul("principal", principal, monthly_rate)?;
    let numerator = checked_mul("principal", interest, compound)?;
    checked_div("principal", numerator, denominator)
}

/// Inverse annuity: the principal a monthly repayment retires over the term.
pub fn principal_from_repayment(
    repayment: Money,
    annual_rate: Rate,
    term_years: Years,
) -> EngineResult<Money> {
    let (monthly_rate, months) = validate_terms(repayment, annual_rate, term_years)?;

    if monthly_rate.is_zero() {
        return checked_mul("repayment", repayment, Decimal::from(months));
    }

    let compound = compound_factor(monthly_rate, months)?;
    let numerator = checked_mul("repayment", repayment, compound - Decimal::ONE)?;
    let denominator = checked_mul("annual_rate", monthly_rate, compound)?;
    checked_div("repayment", numerator, denominator)
}

/// Interest paid over the life of the loan.
pub fn total_interest(principal: Money, annual_rate: Rate, term_years: Years) -> EngineResult<Money> {
    let pmt = monthly_repayment(principal, annual_rate, term_years)?;
    let paid = checked_mul("principal", pmt, Decimal::from(term_years * 12))?;
    Ok(paid - principal)
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleYear {
    pub year: Years,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

/// Year-by-year amortisation summary.
pub fn amortization_schedule(
    principal: Money,
    annual_rate: Rate,
    term_years: Years,
) -> EngineResult<Vec<ScheduleYear>> {
    let pmt = monthly_repayment(principal, annual_rate, term_years)?;
    let monthly_rate = annual_rate / dec!(12);
    let total_months = term_years * 12;

    let mut balance = principal;
    let mut years = Vec::with_capacity(term_years as usize);
    for year in 1..=term_years {
        let opening_balance = balance;
        let mut interest = Decimal::ZERO;
        let mut repaid = Decimal::ZERO;
        for month in 1..=12 {
            let month_interest = balance * monthly_rate;
            let mut month_principal = pmt - month_interest;
            // Last payment clears the residue left by rounding.
            if (year - 1) * 12 + month == total_months || month_principal > balance {
                month_principal = balance;
            }
            interest += month_interest;
            repaid += month_principal;
            balance -= month_principal;
        }
        years.push(ScheduleYear {
            year,
            opening_balance,
            interest,
            principal: repaid,
            closing_balance: balance,
        });
    }
    Ok(years)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_terms(amount: Money, annual_rate: Rate, term_years: Years) -> EngineResult<(Rate, u32)> {
    if term_years == 0 || term_years > MAX_TERM_YEARS {
        return Err(EngineError::policy(
            "term_years",
            format!("must be between 1 and {MAX_TERM_YEARS}, got {term_years}"),
        ));
    }
    if annual_rate < Decimal::ZERO {
        return Err(EngineError::policy("annual_rate", "cannot be negative"));
    }
    if amount < Decimal::ZERO {
        return Err(EngineError::invalid_numeric("principal", "cannot be negative"));
    }
    Ok((annual_rate / dec!(12), term_years * 12))
}

/// (1 + r)^n via iterative multiplication
fn compound_factor(monthly_rate: Rate, months: u32) -> EngineResult<Decimal> {
    let step = Decimal::ONE + monthly_rate;
    let mut compound = Decimal::ONE;
    for _ in 0..months {
        compound = match compound.checked_mul(step) {
            Some(next) => next,
            None => {
                return Err(EngineError::policy(
                    "annual_rate",
                    "compounding overflows over this term",
                ))
            }
        };
    }
    Ok(compound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_decision_table() {
        assert_eq!(term_for_preference(RepaymentPreference::LowestRepayment, 30), 30);
        assert_eq!(term_for_preference(RepaymentPreference::FastestPayoff, 30), 15);
        assert_eq!(term_for_preference(RepaymentPreference::Flexibility, 30), 25);
        assert_eq!(term_for_preference(RepaymentPreference::LowestRate, 30), 30);
        assert_eq!(term_for_preference(RepaymentPreference::NoPreference, 28), 28);
    }

    #[test]
    fn test_known_repayment() {
        // 500k at 6% over 30y: ~2997.75/month
        let pmt = monthly_repayment(dec!(500_000), dec!(0.06), 30).unwrap();
        assert!((pmt - dec!(2997.75)).abs() < dec!(0.01), "got {pmt}");
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let pmt = monthly_repayment(dec!(120_000), Decimal::ZERO, 10).unwrap();
        assert_eq!(pmt, dec!(120_000) / dec!(120));
        assert_eq!(pmt, dec!(1000));
    }

    #[test]
    fn test_zero_term_rejected() {
        let err = monthly_repayment(dec!(100_000), dec!(0.06), 0).unwrap_err();
        assert!(matches!(err, EngineError::PolicyMisconfiguration { .. }));
    }

    #[test]
    fn test_term_beyond_limit_rejected() {
        match monthly_repayment(dec!(500_000), dec!(0.065), 1000).unwrap_err() {
            EngineError::PolicyMisconfiguration { field, .. } => assert_eq!(field, "term_years"),
            other => panic!("Expected PolicyMisconfiguration, got {other:?}"),
        }
        assert!(total_interest(dec!(500_000), dec!(0.065), 1000).is_err());
    }

    #[test]
    fn test_overflowing_repayment_is_an_error() {
        let err = monthly_repayment(dec!(1_000_000_000_000), Decimal::ONE, 50).unwrap_err();
        assert!(matches!(err, EngineError::InvalidNumericInput { .. }), "got {err:?}");
    }

    #[test]
    fn test_zero_principal() {
        assert_eq!(monthly_repayment(Decimal::ZERO, dec!(0.06), 30).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_inverse_round_trip() {
        let principal = dec!(650_000);
        let pmt = monthly_repayment(principal, dec!(0.0598), 25).unwrap();
        let back = principal_from_repayment(pmt, dec!(0.0598), 25).unwrap();
        assert!((back - principal).abs() < dec!(0.0001), "got {back}");
    }

    #[test]
    fn test_total_interest_positive() {
        let interest = total_interest(dec!(300_000), dec!(0.05), 30).unwrap();
        assert!(interest > dec!(270_000) && interest < dec!(280_000), "got {interest}");
    }

    #[test]
    fn test_schedule_pays_off() {
        let schedule = amortization_schedule(dec!(200_000), dec!(0.06), 15).unwrap();
        assert_eq!(schedule.len(), 15);
        assert_eq!(schedule[0].opening_balance, dec!(200_000));
        assert_eq!(schedule.last().unwrap().closing_balance, Decimal::ZERO);
        let repaid: Money = schedule.iter().map(|y| y.principal).sum();
        assert!((repaid - dec!(200_000)).abs() < dec!(0.000001), "got {repaid}");
        // Interest share falls as the balance amortises.
        assert!(schedule[0].interest > schedule[14].interest);
    }

    #[test]
    fn test_preference_deserializes_kebab_case() {
        let p: RepaymentPreference = serde_json::from_str("\"fastest-payoff\"").unwrap();
        assert_eq!(p, RepaymentPreference::FastestPayoff);
        assert_eq!(p.describe(15), "15-year term for faster payoff");
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amortization::monthly_repayment;
use crate::deposit::{effective_lvr, max_loan_by_deposit};
use crate::error::Diagnostics;
use crate::policy::{AssessmentSettings, LendingPolicy};
use crate::serviceability::max_loan_by_serviceability;
use crate::types::{Money, Rate, Years};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which ceiling limits the loan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingConstraint {
    Serviceability,
    #[default]
    Deposit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCeiling {
    pub serviceability_max: Money,
    pub deposit_max: Money,
    pub max_loan_amount: Money,
    pub max_property_value: Money,
    pub binding_constraint: BindingConstraint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffordabilityResult {
    pub max_loan_amount: Money,
    pub max_property_value: Money,
    pub monthly_repayment: Money,
    pub binding_constraint: BindingConstraint,
    pub serviceability_max: Money,
    pub deposit_max: Money,
    pub deposit: Money,
    pub annual_rate: Rate,
    pub term_years: Years,
    /// Loan / property value at the maximum; absent when nothing can be bought.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lvr: Option<Rate>,
}

impl AffordabilityResult {
    /// All-zero result for a rejected calculation.
    pub fn zero(deposit: Money, policy: &LendingPolicy) -> Self {
        AffordabilityResult {
            deposit,
            annual_rate: policy.annual_rate,
            term_years: policy.term_years,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Take the lower of the two ceilings. Ties report the deposit constraint.
pub fn resolve(serviceability_max: Money, deposit_max: Money, deposit: Money) -> ResolvedCeiling {
    let serviceability_max = serviceability_max.max(Decimal::ZERO);
    let deposit_max = deposit_max.max(Decimal::ZERO);

    let (max_loan_amount, binding_constraint) = if serviceability_max < deposit_max {
        (serviceability_max, BindingConstraint::Serviceability)
    } else {
        (deposit_max, BindingConstraint::Deposit)
    };

    ResolvedCeiling {
        serviceability_max,
        deposit_max,
        max_loan_amount,
        max_property_value: max_loan_amount.saturating_add(deposit.max(Decimal::ZERO)),
        binding_constraint,
    }
}

/// Run both ceilings, the resolver and the amortisation for one policy.
pub fn affordability(
    annual_income: Money,
    monthly_expenses: Money,
    deposit: Money,
    policy: &LendingPolicy,
    settings: &AssessmentSettings,
) -> EngineResult<AffordabilityResult> {
    policy.validate()?;

    let serviceability_max = max_loan_by_serviceability(
        annual_income,
        monthly_expenses,
        policy.annual_rate,
        settings.serviceability_ratio,
    )?;
    let deposit_max = max_loan_by_deposit(deposit, policy.max_lvr)?;

    let ceiling = resolve(serviceability_max, deposit_max, deposit);
    let repayment = monthly_repayment(ceiling.max_loan_amount, policy.annual_rate, policy.term_years)?;

    tracing::debug!(
        policy = %policy.label(),
        serviceability_max = %ceiling.serviceability_max,
        deposit_max = %ceiling.deposit_max,
        binding = ?ceiling.binding_constraint,
        "resolved affordability ceiling"
    );

    Ok(AffordabilityResult {
        max_loan_amount: ceiling.max_loan_amount,
        max_property_value: ceiling.max_property_value,
        monthly_repayment: repayment,
        binding_constraint: ceiling.binding_constraint,
        serviceability_max: ceiling.serviceability_max,
        deposit_max: ceiling.deposit_max,
        deposit,
        annual_rate: policy.annual_rate,
        term_years: policy.term_years,
        lvr: effective_lvr(ceiling.max_loan_amount, ceiling.max_property_value),
    })
}

/// As [`affordability`], but a failure is flagged on `diag` and yields a zero result.
pub fn assess_affordability(
    annual_income: Money,
    monthly_expenses: Money,
    deposit: Money,
    policy: &LendingPolicy,
    settings: &AssessmentSettings,
    diag: &mut Diagnostics,
) -> AffordabilityResult {
    match affordability(annual_income, monthly_expenses, deposit, policy, settings) {
        Ok(result) => result,
        Err(e) => {
            diag.flag(e);
            AffordabilityResult::zero(deposit, policy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyPreset;
    use rust_decimal_macros::dec;

    #[test]
    fn test_serviceability_binds() {
        let r = resolve(dec!(98_000), dec!(1_960_000), dec!(40_000));
        assert_eq!(r.max_loan_amount, dec!(98_000));
        assert_eq!(r.binding_constraint, BindingConstraint::Serviceability);
        assert_eq!(r.max_property_value, dec!(138_000));
    }

    #[test]
    fn test_deposit_binds() {
        let r = resolve(dec!(900_000), dec!(400_000), dec!(100_000));
        assert_eq!(r.max_loan_amount, dec!(400_000));
        assert_eq!(r.binding_constraint, BindingConstraint::Deposit);
        assert_eq!(r.max_property_value, dec!(500_000));
    }

    #[test]
    fn test_tie_reports_deposit() {
        let r = resolve(dec!(500_000), dec!(500_000), dec!(10_000));
        assert_eq!(r.binding_constraint, BindingConstraint::Deposit);
    }

    #[test]
    fn test_assess_reference_scenario() {
        let policy = LendingPolicy::new("subject", dec!(0.98), dec!(0.06), 30);
        let mut diag = Diagnostics::new();
        let r = assess_affordability(
            dec!(90_000),
            dec!(1760),
            dec!(40_000),
            &policy,
            &AssessmentSettings::default(),
            &mut diag,
        );
        assert_eq!(r.deposit_max, dec!(1_960_000));
        assert_eq!(r.serviceability_max, dec!(98_000));
        assert_eq!(r.max_loan_amount, dec!(98_000));
        assert_eq!(r.binding_constraint, BindingConstraint::Serviceability);
        assert!(r.monthly_repayment > Decimal::ZERO);
        assert!(diag.issues().is_empty());
    }

    #[test]
    fn test_assess_rejects_bad_policy_with_zero() {
        let policy = LendingPolicy::new("broken", Decimal::ONE, dec!(0.06), 30);
        let mut diag = Diagnostics::new();
        let r = assess_affordability(
            dec!(90_000),
            dec!(1760),
            dec!(40_000),
            &policy,
            &AssessmentSettings::default(),
            &mut diag,
        );
        assert_eq!(r.max_loan_amount, Decimal::ZERO);
        assert_eq!(r.max_property_value, Decimal::ZERO);
        assert!(diag.has_fatal());
    }

    #[test]
    fn test_assess_with_preset_has_lvr() {
        let mut diag = Diagnostics::new();
        // 300k income services ~1.10m; 20k deposit caps the loan at 980k
        let r = assess_affordability(
            dec!(300_000),
            dec!(2000),
            dec!(20_000),
            &PolicyPreset::SubjectStandard.policy(),
            &AssessmentSettings::default(),
            &mut diag,
        );
        assert_eq!(r.binding_constraint, BindingConstraint::Deposit);
        assert!((r.lvr.unwrap() - dec!(0.98)).abs() < dec!(0.0000001));
    }
}

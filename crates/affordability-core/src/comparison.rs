use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::Diagnostics;
use crate::input::{checked_div, checked_mul};
use crate::policy::{AssessmentSettings, LendingPolicy, PolicyPreset};
use crate::resolver::{affordability, AffordabilityResult};
use crate::types::*;
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Mortgage insurance the reference lender would charge at its maximum loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceDisclosure {
    pub lvr: Rate,
    pub threshold_lvr: Rate,
    pub premium_rate: Rate,
    /// One-off premium, typically capitalised onto the loan.
    pub premium: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub subject_loan: Money,
    pub reference_loan: Money,
    /// subject_loan - reference_loan, unrounded.
    pub delta: Money,
    /// delta / reference_loan as a decimal fraction; absent when the reference loan is zero.
    pub percent_delta: Option<Rate>,
    pub subject: AffordabilityResult,
    pub reference: AffordabilityResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_insurance: Option<InsuranceDisclosure>,
    pub subject_policy: String,
    pub reference_policy: String,
}

/// Stand-alone comparison request used by the CLI and the bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonInput {
    pub annual_income: Money,
    pub monthly_expenses: Money,
    pub deposit: Money,
    #[serde(default = "default_subject")]
    pub subject: LendingPolicy,
    #[serde(default = "default_reference")]
    pub reference: LendingPolicy,
    #[serde(default)]
    pub settings: AssessmentSettings,
}

fn default_subject() -> LendingPolicy {
    PolicyPreset::SubjectStandard.policy()
}

fn default_reference() -> LendingPolicy {
    PolicyPreset::Conventional.policy()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the affordability pipeline under both policies with the household held fixed.
pub fn compare(
    annual_income: Money,
    monthly_expenses: Money,
    deposit: Money,
    subject: &LendingPolicy,
    reference: &LendingPolicy,
    settings: &AssessmentSettings,
) -> EngineResult<ComparisonResult> {
    let subject_result = affordability(annual_income, monthly_expenses, deposit, subject, settings)?;
    let reference_result =
        affordability(annual_income, monthly_expenses, deposit, reference, settings)?;

    let delta = subject_result.max_loan_amount - reference_result.max_loan_amount;
    let percent_delta = if reference_result.max_loan_amount.is_zero() {
        None
    } else {
        Some(checked_div("percent_delta", delta, reference_result.max_loan_amount)?)
    };
    let reference_insurance = disclose_insurance(&reference_result, reference, settings)?;

    Ok(ComparisonResult {
        subject_loan: subject_result.max_loan_amount,
        reference_loan: reference_result.max_loan_amount,
        delta,
        percent_delta,
        reference_insurance,
        subject: subject_result,
        reference: reference_result,
        subject_policy: subject.label(),
        reference_policy: reference.label(),
    })
}

/// Insurance line item when the result's LVR is above the policy threshold.
pub fn disclose_insurance(
    result: &AffordabilityResult,
    policy: &LendingPolicy,
    settings: &AssessmentSettings,
) -> EngineResult<Option<InsuranceDisclosure>> {
    let (Some(threshold_lvr), Some(lvr)) = (policy.insurance_threshold_lvr, result.lvr) else {
        return Ok(None);
    };
    if !policy.requires_insurance(lvr) || result.max_loan_amount <= Decimal::ZERO {
        return Ok(None);
    }
    let premium_rate = settings.insurance.premium_rate(lvr);
    Ok(Some(InsuranceDisclosure {
        lvr,
        threshold_lvr,
        premium_rate,
        premium: checked_mul("insurance.premium_rate", result.max_loan_amount, premium_rate)?,
    }))
}

/// Envelope-returning comparison for callers outside the wizard pipeline.
pub fn compare_offers(input: &ComparisonInput) -> ComputationOutput<ComparisonResult> {
    let start = Instant::now();
    let mut diag = Diagnostics::new();

    let result = match compare(
        input.annual_income,
        input.monthly_expenses,
        input.deposit,
        &input.subject,
        &input.reference,
        &input.settings,
    ) {
        Ok(r) => r,
        Err(e) => {
            diag.flag(e);
            ComparisonResult {
                subject_policy: input.subject.label(),
                reference_policy: input.reference.label(),
                ..Default::default()
            }
        }
    };

    if let Some(ins) = &result.reference_insurance {
        diag.warn(format!(
            "Reference lender charges mortgage insurance of {} at {} LVR; not included in the loan figure.",
            ins.premium.round_dp(2),
            ins.lvr.round_dp(4)
        ));
    }

    let (issues, warnings) = diag.into_parts();
    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Two-ceiling affordability under subject and reference lending policies",
        &serde_json::json!({
            "subject_policy": input.subject,
            "reference_policy": input.reference,
            "serviceability_ratio": input.settings.serviceability_ratio.to_string(),
        }),
        issues,
        warnings,
        elapsed,
        result,
    )
}

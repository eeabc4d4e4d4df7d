//! Loan-purpose selection and the `calculate` entry point.
//!
//! The wizard's loan-goal and buying-reason answers pick one of three
//! scenarios. Each scenario runs both affordability ceilings; they differ in
//! which policy applies and what is reported on top.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::amortization::{monthly_repayment, term_for_preference, RepaymentPreference};
use crate::comparison::{compare, ComparisonResult};
use crate::deposit::{effective_lvr, resolve_deposit, Deposit, DepositInput};
use crate::error::{Diagnostics, EngineError};
use crate::expenses::{estimate_expenses_with, ExpenseOverride, ExpenseProfile, Household};
use crate::income::{normalize_income, IncomeEntry, IncomeSummary};
use crate::input::{checked_div, checked_mul, parse_amount, parse_rate, parse_years, AmountField};
use crate::policy::{AssessmentSettings, LendingPolicy, PolicySet, MAX_TERM_YEARS};
use crate::resolver::AffordabilityResult;
use crate::serviceability::max_loan_by_serviceability;
use crate::types::*;
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Wizard answers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanGoal {
    #[default]
    Buying,
    Refinancing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuyingReason {
    #[default]
    ToLive,
    ToInvest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    House,
    Unit,
    Townhouse,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    #[default]
    Purchase,
    Refinance,
    Investment,
}

impl ScenarioKind {
    pub fn from_answers(goal: LoanGoal, reason: Option<BuyingReason>) -> Self {
        match (goal, reason) {
            (LoanGoal::Refinancing, _) => ScenarioKind::Refinance,
            (LoanGoal::Buying, Some(BuyingReason::ToInvest)) => ScenarioKind::Investment,
            (LoanGoal::Buying, _) => ScenarioKind::Purchase,
        }
    }

    fn methodology(self) -> &'static str {
        match self {
            ScenarioKind::Purchase => {
                "Owner-occupier purchase: min(serviceability, deposit/LVR) ceiling, annuity repayment"
            }
            ScenarioKind::Refinance => {
                "Refinance: repayment at current vs subject rate over the remaining term, equity at reference LVR"
            }
            ScenarioKind::Investment => {
                "Investment purchase: two-ceiling affordability at investor rate with rental cash flow"
            }
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScenarioKind::Purchase => "purchase",
            ScenarioKind::Refinance => "refinance",
            ScenarioKind::Investment => "investment",
        };
        f.write_str(s)
    }
}

/// Existing-loan answers for a refinance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinanceDetails {
    #[serde(default)]
    pub current_balance: Option<AmountField>,
    /// Percentage points ("6.5") or a decimal (0.065).
    #[serde(default)]
    pub current_rate: Option<AmountField>,
    /// Whole years, as a number or text ("25").
    #[serde(default)]
    pub remaining_term_years: Option<AmountField>,
    #[serde(default)]
    pub property_value: Option<AmountField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentDetails {
    #[serde(default)]
    pub expected_weekly_rent: Option<AmountField>,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
}

/// Immutable snapshot of everything the wizard has collected so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSnapshot {
    #[serde(default)]
    pub loan_goal: LoanGoal,
    #[serde(default)]
    pub buying_reason: Option<BuyingReason>,
    #[serde(default)]
    pub incomes: Vec<IncomeEntry>,
    #[serde(default)]
    pub household: Household,
    #[serde(default)]
    pub expense_override: Option<ExpenseOverride>,
    #[serde(default)]
    pub deposit: DepositInput,
    #[serde(default)]
    pub preference: RepaymentPreference,
    #[serde(default)]
    pub refinance: Option<RefinanceDetails>,
    #[serde(default)]
    pub investment: Option<InvestmentDetails>,
    /// Eligibility of the chosen location, as reported by the lookup collaborator.
    #[serde(default)]
    pub location_eligible: Option<bool>,
    #[serde(default)]
    pub policies: PolicySet,
    #[serde(default)]
    pub settings: AssessmentSettings,
}

impl ApplicationSnapshot {
    pub fn kind(&self) -> ScenarioKind {
        ScenarioKind::from_answers(self.loan_goal, self.buying_reason)
    }
}

/// Strongly-typed purpose with every scenario-specific field present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoanPurpose {
    Purchase,
    Refinance {
        current_balance: Money,
        current_rate: Rate,
        remaining_term_years: Years,
        property_value: Money,
    },
    Investment {
        expected_weekly_rent: Money,
        property_type: Option<PropertyType>,
    },
}

impl LoanPurpose {
    pub fn kind(&self) -> ScenarioKind {
        match self {
            LoanPurpose::Purchase => ScenarioKind::Purchase,
            LoanPurpose::Refinance { .. } => ScenarioKind::Refinance,
            LoanPurpose::Investment { .. } => ScenarioKind::Investment,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub affordability: AffordabilityResult,
    pub comparison: ComparisonResult,
    pub income: IncomeSummary,
    pub expenses: ExpenseProfile,
    pub deposit: Deposit,
    pub term_years: Years,
    pub term_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinanceOutcome {
    pub current_balance: Money,
    pub current_rate: Rate,
    pub new_rate: Rate,
    pub remaining_term_years: Years,
    pub current_repayment: Money,
    pub new_repayment: Money,
    pub monthly_savings: Money,
    /// monthly_savings over the remaining term.
    pub total_savings: Money,
    pub property_value: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_lvr: Option<Rate>,
    pub equity_available: Money,
    pub serviceability_max: Money,
    /// Equity the household can also service.
    pub accessible_equity: Money,
    pub income: IncomeSummary,
    pub expenses: ExpenseProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentOutcome {
    #[serde(flatten)]
    pub purchase: PurchaseOutcome,
    pub property_type: Option<PropertyType>,
    pub expected_weekly_rent: Money,
    pub monthly_rent: Money,
    pub annual_rent: Money,
    /// Rent less the loan repayment; negative when negatively geared.
    pub net_monthly_cash_flow: Money,
    pub gross_yield: Option<Rate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scenario", rename_all = "snake_case")]
pub enum CalculationOutcome {
    Purchase(PurchaseOutcome),
    Refinance(RefinanceOutcome),
    Investment(InvestmentOutcome),
}

impl CalculationOutcome {
    /// Zero-valued outcome of the given shape, returned for rejected requests.
    pub fn zero(kind: ScenarioKind) -> Self {
        match kind {
            ScenarioKind::Purchase => CalculationOutcome::Purchase(PurchaseOutcome::default()),
            ScenarioKind::Refinance => CalculationOutcome::Refinance(RefinanceOutcome::default()),
            ScenarioKind::Investment => {
                CalculationOutcome::Investment(InvestmentOutcome::default())
            }
        }
    }

    pub fn kind(&self) -> ScenarioKind {
        match self {
            CalculationOutcome::Purchase(_) => ScenarioKind::Purchase,
            CalculationOutcome::Refinance(_) => ScenarioKind::Refinance,
            CalculationOutcome::Investment(_) => ScenarioKind::Investment,
        }
    }

    /// Affordability under the subject policy, for purchase-shaped outcomes.
    pub fn affordability(&self) -> Option<&AffordabilityResult> {
        match self {
            CalculationOutcome::Purchase(p) => Some(&p.affordability),
            CalculationOutcome::Investment(i) => Some(&i.purchase.affordability),
            CalculationOutcome::Refinance(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the typed purpose, rejecting a scenario whose required answers are
/// missing, malformed or not positive. No defaults are substituted.
pub fn select_scenario(snapshot: &ApplicationSnapshot) -> EngineResult<LoanPurpose> {
    let kind = snapshot.kind();
    match kind {
        ScenarioKind::Purchase => Ok(LoanPurpose::Purchase),
        ScenarioKind::Refinance => {
            let details = snapshot.refinance.clone().unwrap_or_default();
            let term_field = "refinance.remaining_term_years";
            let remaining_term_years = details
                .remaining_term_years
                .as_ref()
                .and_then(|v| parse_years(term_field, v, MAX_TERM_YEARS).ok())
                .ok_or_else(|| EngineError::incomplete(kind.to_string(), term_field))?;
            Ok(LoanPurpose::Refinance {
                current_balance: required(
                    kind,
                    "refinance.current_balance",
                    details.current_balance.as_ref(),
                    parse_amount,
                )?,
                current_rate: required(
                    kind,
                    "refinance.current_rate",
                    details.current_rate.as_ref(),
                    parse_rate,
                )?,
                remaining_term_years,
                property_value: required(
                    kind,
                    "refinance.property_value",
                    details.property_value.as_ref(),
                    parse_amount,
                )?,
            })
        }
        ScenarioKind::Investment => {
            let details = snapshot.investment.clone().unwrap_or_default();
            Ok(LoanPurpose::Investment {
                expected_weekly_rent: required(
                    kind,
                    "investment.expected_weekly_rent",
                    details.expected_weekly_rent.as_ref(),
                    parse_amount,
                )?,
                property_type: details.property_type,
            })
        }
    }
}

/// Run the full pipeline for a snapshot.
///
/// Never fails: problems are reported as issues and the envelope status.
pub fn calculate(snapshot: &ApplicationSnapshot) -> ComputationOutput<CalculationOutcome> {
    let start = Instant::now();
    let kind = snapshot.kind();
    let span = tracing::debug_span!("calculate", scenario = %kind);
    let _enter = span.enter();

    let mut diag = Diagnostics::new();
    if snapshot.incomes.len() > 2 {
        diag.warn(format!(
            "{} incomes supplied; the wizard collects at most two. All are included.",
            snapshot.incomes.len()
        ));
    }
    if snapshot.location_eligible == Some(false) {
        diag.warn("Selected location is outside the lending area; figures are indicative only.");
    }

    let policies = &snapshot.policies;
    let term_years = term_for_preference(snapshot.preference, policies.subject_for(kind).term_years);

    let outcome = match select_scenario(snapshot) {
        Err(e) => {
            diag.flag(e);
            CalculationOutcome::zero(kind)
        }
        Ok(_) if !policies.validate_for(kind, &mut diag) => CalculationOutcome::zero(kind),
        Ok(LoanPurpose::Purchase) => CalculationOutcome::Purchase(run_purchase(
            snapshot,
            policies.subject_for(kind),
            policies.reference_for(kind),
            &mut diag,
        )),
        Ok(LoanPurpose::Refinance {
            current_balance,
            current_rate,
            remaining_term_years,
            property_value,
        }) => CalculationOutcome::Refinance(run_refinance(
            snapshot,
            RefinanceTerms {
                current_balance,
                current_rate,
                remaining_term_years,
                property_value,
            },
            &mut diag,
        )),
        Ok(LoanPurpose::Investment {
            expected_weekly_rent,
            property_type,
        }) => {
            let purchase = run_purchase(
                snapshot,
                policies.subject_for(kind),
                policies.reference_for(kind),
                &mut diag,
            );
            CalculationOutcome::Investment(investment_cash_flow(
                purchase,
                expected_weekly_rent,
                property_type,
                &mut diag,
            ))
        }
    };

    let assumptions = serde_json::json!({
        "scenario": kind,
        "subject_policy": policies.subject_for(kind).label(),
        "reference_policy": policies.reference_for(kind).label(),
        "serviceability_ratio": snapshot.settings.serviceability_ratio.to_string(),
        "preference": snapshot.preference,
        "term_years": term_years,
    });

    let (issues, warnings) = diag.into_parts();
    let elapsed = start.elapsed().as_micros() as u64;
    tracing::debug!(issues = issues.len(), elapsed_us = elapsed, "calculation finished");
    with_metadata(kind.methodology(), &assumptions, issues, warnings, elapsed, outcome)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn required(
    kind: ScenarioKind,
    field: &str,
    value: Option<&AmountField>,
    parse: fn(&str, &AmountField) -> EngineResult<Money>,
) -> EngineResult<Money> {
    value
        .and_then(|v| parse(field, v).ok())
        .filter(|v| *v > Decimal::ZERO)
        .ok_or_else(|| EngineError::incomplete(kind.to_string(), field))
}

struct RefinanceTerms {
    current_balance: Money,
    current_rate: Rate,
    remaining_term_years: Years,
    property_value: Money,
}

fn household_inputs(
    snapshot: &ApplicationSnapshot,
    diag: &mut Diagnostics,
) -> (IncomeSummary, ExpenseProfile) {
    let income = normalize_income(&snapshot.incomes, diag);
    let household = snapshot.household.normalised(diag);
    let expenses = estimate_expenses_with(
        &snapshot.settings.benchmark,
        &household,
        snapshot.expense_override.as_ref(),
        diag,
    );
    (income, expenses)
}

fn run_purchase(
    snapshot: &ApplicationSnapshot,
    subject: &LendingPolicy,
    reference: &LendingPolicy,
    diag: &mut Diagnostics,
) -> PurchaseOutcome {
    let (income, expenses) = household_inputs(snapshot, diag);
    let deposit = resolve_deposit(&snapshot.deposit, diag);

    let term_years = term_for_preference(snapshot.preference, subject.term_years);
    let subject = subject.clone().with_term(term_years);
    let reference = reference
        .clone()
        .with_term(term_for_preference(snapshot.preference, reference.term_years));

    let comparison = match compare(
        income.annual_total,
        expenses.monthly_amount,
        deposit.amount,
        &subject,
        &reference,
        &snapshot.settings,
    ) {
        Ok(c) => c,
        Err(e) => {
            diag.flag(e);
            ComparisonResult {
                subject: AffordabilityResult::zero(deposit.amount, &subject),
                reference: AffordabilityResult::zero(deposit.amount, &reference),
                subject_policy: subject.label(),
                reference_policy: reference.label(),
                ..Default::default()
            }
        }
    };

    PurchaseOutcome {
        affordability: comparison.subject.clone(),
        comparison,
        income,
        expenses,
        deposit,
        term_years,
        term_description: snapshot.preference.describe(term_years),
    }
}

fn run_refinance(
    snapshot: &ApplicationSnapshot,
    terms: RefinanceTerms,
    diag: &mut Diagnostics,
) -> RefinanceOutcome {
    let subject = snapshot.policies.subject_for(ScenarioKind::Refinance);
    let reference = snapshot.policies.reference_for(ScenarioKind::Refinance);
    let (income, expenses) = household_inputs(snapshot, diag);

    let RefinanceTerms {
        current_balance,
        current_rate,
        remaining_term_years,
        property_value,
    } = terms;

    let current_repayment = diag.money_or_zero(monthly_repayment(
        current_balance,
        current_rate,
        remaining_term_years,
    ));
    let new_repayment = diag.money_or_zero(monthly_repayment(
        current_balance,
        subject.annual_rate,
        remaining_term_years,
    ));
    let monthly_savings = current_repayment - new_repayment;
    if monthly_savings <= Decimal::ZERO {
        diag.warn("Current rate is at or below the new rate; refinancing does not lower repayments.");
    }

    let lendable = diag.money_or_zero(checked_mul("refinance.property_value", property_value, reference.max_lvr));
    let equity_available = (lendable - current_balance).max(Decimal::ZERO);
    let serviceability_max = diag.money_or_zero(max_loan_by_serviceability(
        income.annual_total,
        expenses.monthly_amount,
        subject.annual_rate,
        snapshot.settings.serviceability_ratio,
    ));
    let accessible_equity =
        equity_available.min((serviceability_max - current_balance).max(Decimal::ZERO));

    let total_savings = diag.money_or_zero(checked_mul(
        "refinance.remaining_term_years",
        monthly_savings,
        Decimal::from(remaining_term_years * 12),
    ));

    tracing::debug!(
        %monthly_savings,
        %equity_available,
        %accessible_equity,
        "refinance assessed"
    );

    RefinanceOutcome {
        current_balance,
        current_rate,
        new_rate: subject.annual_rate,
        remaining_term_years,
        current_repayment,
        new_repayment,
        monthly_savings,
        total_savings,
        property_value,
        current_lvr: effective_lvr(current_balance, property_value),
        equity_available,
        serviceability_max,
        accessible_equity,
        income,
        expenses,
    }
}

fn investment_cash_flow(
    purchase: PurchaseOutcome,
    expected_weekly_rent: Money,
    property_type: Option<PropertyType>,
    diag: &mut Diagnostics,
) -> InvestmentOutcome {
    let rent_field = "investment.expected_weekly_rent";
    let annual_rent = diag.money_or_zero(checked_mul(rent_field, expected_weekly_rent, dec!(52)));
    let monthly_rent = annual_rent / dec!(12);
    let net_monthly_cash_flow = monthly_rent - purchase.affordability.monthly_repayment;
    let max_property_value = purchase.affordability.max_property_value;
    let gross_yield = if max_property_value > Decimal::ZERO {
        match checked_div(rent_field, annual_rent, max_property_value) {
            Ok(y) => Some(y),
            Err(e) => {
                diag.flag(e);
                None
            }
        }
    } else {
        None
    };
    if net_monthly_cash_flow < Decimal::ZERO {
        diag.warn("Rent does not cover the repayment at the maximum loan; the property is negatively geared.");
    }

    InvestmentOutcome {
        purchase,
        property_type,
        expected_weekly_rent,
        monthly_rent,
        annual_rent,
        net_monthly_cash_flow,
        gross_yield,
    }
}

use affordability_core::amortization::RepaymentPreference;
use affordability_core::expenses::{ExpenseOverride, ExpenseSource, Household, LocationClass};
use affordability_core::income::{Frequency, IncomeEntry};
use affordability_core::policy::{LendingPolicy, PolicyPreset, PolicySet};
use affordability_core::resolver::BindingConstraint;
use affordability_core::scenario::{
    calculate, ApplicationSnapshot, BuyingReason, CalculationOutcome, InvestmentDetails,
    LoanGoal, RefinanceDetails, ScenarioKind,
};
use affordability_core::session::Session;
use affordability_core::{CalculationStatus, IssueCode};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Purchase
// ===========================================================================

fn couple_in_melbourne() -> ApplicationSnapshot {
    serde_json::from_value(serde_json::json!({
        "loan_goal": "buying",
        "buying_reason": "to-live",
        "incomes": [
            {"amount": "$95,000", "frequency": "annual"},
            {"amount": "1,200", "frequency": "weekly"}
        ],
        "household": {"adult_count": 2, "dependant_count": 1, "location": "Melbourne VIC 3000"},
        "deposit": {"amount": "85000", "includes_gift": true, "gift_amount": "20000"},
        "preference": "flexibility"
    }))
    .unwrap()
}

#[test]
fn test_reference_single_applicant_at_six_percent() {
    let snapshot = ApplicationSnapshot {
        incomes: vec![IncomeEntry::new(dec!(90_000), Frequency::Annual)],
        deposit: affordability_core::deposit::DepositInput::new(dec!(40_000)),
        policies: PolicySet {
            subject: LendingPolicy::new("subject", dec!(0.98), dec!(0.06), 30),
            reference: LendingPolicy::new("reference", dec!(0.80), dec!(0.06), 30),
            ..PolicySet::default()
        },
        ..Default::default()
    };

    let out = calculate(&snapshot);
    let CalculationOutcome::Purchase(p) = &out.result else {
        panic!("Expected purchase outcome, got {:?}", out.result);
    };

    assert_eq!(p.affordability.deposit_max, dec!(1_960_000));
    assert_eq!(p.affordability.serviceability_max, dec!(98_000));
    assert_eq!(p.affordability.binding_constraint, BindingConstraint::Serviceability);
    assert_eq!(p.comparison.reference.deposit_max, dec!(160_000));
    assert_eq!(p.comparison.subject_loan, p.comparison.reference_loan);
}

#[test]
fn test_couple_with_dependant() {
    let out = calculate(&couple_in_melbourne());
    assert_eq!(out.status, CalculationStatus::Complete);

    let CalculationOutcome::Purchase(p) = &out.result else {
        panic!("Expected purchase outcome, got {:?}", out.result);
    };

    // 95,000 + 1,200 * 52
    assert_eq!(p.income.annual_total, dec!(157_400));
    // (2,900 + 450) * 1.10
    assert_eq!(p.expenses.monthly_amount, dec!(3685));
    assert_eq!(p.expenses.source, ExpenseSource::Benchmark);
    assert_eq!(p.expenses.benchmark.location_class, LocationClass::Capital);
    assert_eq!(p.deposit.genuine_savings(), dec!(65_000));
    assert_eq!(p.term_years, 25);

    // 157,400 / 12 * 0.30 = 3,935; less 3,685 = 250; * 12 / 0.0598
    let expected = dec!(3000) / dec!(0.0598);
    let a = &p.affordability;
    assert!((a.max_loan_amount - expected).abs() < dec!(0.0001), "got {}", a.max_loan_amount);
    assert_eq!(a.max_property_value, a.max_loan_amount + dec!(85_000));
}

#[test]
fn test_equity_from_existing_property() {
    let mut snapshot = couple_in_melbourne();
    snapshot.deposit.equity_amount = Some("$40,000".into());
    let out = calculate(&snapshot);
    assert_eq!(out.status, CalculationStatus::Complete);
    let CalculationOutcome::Purchase(p) = &out.result else {
        panic!("Expected purchase outcome, got {:?}", out.result);
    };
    assert_eq!(p.deposit.amount, dec!(125_000));
    assert_eq!(p.deposit.equity_amount, dec!(40_000));
    assert_eq!(p.deposit.genuine_savings(), dec!(65_000));
    let a = &p.affordability;
    assert_eq!(a.max_property_value, a.max_loan_amount + dec!(125_000));
}

#[test]
fn test_absurd_weekly_income_degrades_to_partial() {
    let mut snapshot = couple_in_melbourne();
    snapshot.incomes[1].amount = Some("9999999999999999999999999999".into());
    let out = calculate(&snapshot);
    assert_eq!(out.status, CalculationStatus::Partial);
    assert_eq!(out.issues[0].field.as_deref(), Some("incomes[1].amount"));
    let CalculationOutcome::Purchase(p) = &out.result else {
        panic!("Expected purchase outcome, got {:?}", out.result);
    };
    assert_eq!(p.income.annual_total, dec!(95_000));
}

#[test]
fn test_expense_override_wins() {
    let mut snapshot = couple_in_melbourne();
    snapshot.expense_override = Some(ExpenseOverride::monthly(dec!(5000)));
    let out = calculate(&snapshot);
    let CalculationOutcome::Purchase(p) = &out.result else {
        panic!("Expected purchase outcome");
    };
    assert_eq!(p.expenses.source, ExpenseSource::Override);
    assert_eq!(p.expenses.monthly_amount, dec!(5000));
    assert_eq!(p.affordability.max_loan_amount, Decimal::ZERO);
}

#[test]
fn test_blank_form_is_partial_not_an_error() {
    let out = calculate(&ApplicationSnapshot::default());
    assert_eq!(out.status, CalculationStatus::Partial);
    assert_eq!(out.issues.len(), 1);
    assert_eq!(out.issues[0].code, IssueCode::InvalidNumericInput);
    assert_eq!(out.issues[0].field.as_deref(), Some("deposit.amount"));
    assert_eq!(
        out.result.affordability().map(|a| a.max_loan_amount),
        Some(Decimal::ZERO)
    );
}

#[test]
fn test_conventional_preset_discloses_insurance() {
    let snapshot = ApplicationSnapshot {
        incomes: vec![IncomeEntry::new(dec!(16_000), Frequency::Monthly)],
        household: Household::new(1, 0, Some("Orange NSW 2800")),
        deposit: affordability_core::deposit::DepositInput::new(dec!(30_000)),
        preference: RepaymentPreference::LowestRepayment,
        ..Default::default()
    };
    let out = calculate(&snapshot);
    let CalculationOutcome::Purchase(p) = &out.result else {
        panic!("Expected purchase outcome");
    };
    assert_eq!(p.expenses.benchmark.location_class, LocationClass::Regional);
    assert_eq!(p.comparison.reference_policy, PolicyPreset::Conventional.to_string());
    // Deposit binds the conventional lender at its 95% cap.
    assert_eq!(p.comparison.reference.binding_constraint, BindingConstraint::Deposit);
    assert_eq!(p.comparison.reference_loan, dec!(570_000));
    let ins = p.comparison.reference_insurance.as_ref().unwrap();
    assert_eq!(ins.premium_rate, dec!(0.035));
    assert!(p.comparison.delta > Decimal::ZERO);
}

// ===========================================================================
// Refinance and investment
// ===========================================================================

#[test]
fn test_refinance_from_wizard_strings() {
    let snapshot: ApplicationSnapshot = serde_json::from_value(serde_json::json!({
        "loan_goal": "refinancing",
        "incomes": [{"amount": 140000}],
        "refinance": {
            "current_balance": "$500,000",
            "current_rate": "6.5%",
            "remaining_term_years": 25,
            "property_value": "750000"
        }
    }))
    .unwrap();

    let out = calculate(&snapshot);
    assert_eq!(out.status, CalculationStatus::Complete);
    let CalculationOutcome::Refinance(r) = &out.result else {
        panic!("Expected refinance outcome, got {:?}", out.result);
    };
    // 500k over 25y: 3376.04 at 6.5%, 3215.40 at 5.98%
    assert!((r.current_repayment - dec!(3376.04)).abs() < dec!(0.01), "got {}", r.current_repayment);
    assert!((r.new_repayment - dec!(3215.40)).abs() < dec!(0.01), "got {}", r.new_repayment);
    assert!((r.monthly_savings - dec!(160.64)).abs() < dec!(0.01), "got {}", r.monthly_savings);
    assert_eq!(r.monthly_savings, r.current_repayment - r.new_repayment);
    // 750k * 0.80 - 500k
    assert_eq!(r.equity_available, dec!(100_000));
    assert_eq!(r.current_lvr, Some(dec!(500_000) / dec!(750_000)));
}

fn refinance_answers(current_rate: &str, remaining_term_years: serde_json::Value) -> ApplicationSnapshot {
    serde_json::from_value(serde_json::json!({
        "loan_goal": "refinancing",
        "incomes": [{"amount": 140000}],
        "refinance": {
            "current_balance": "500000",
            "current_rate": current_rate,
            "remaining_term_years": remaining_term_years,
            "property_value": "750000"
        }
    }))
    .unwrap()
}

#[test]
fn test_refinance_term_typed_as_text() {
    let out = calculate(&refinance_answers("6.5", serde_json::json!("25")));
    assert_eq!(out.status, CalculationStatus::Complete, "{:?}", out.issues);
    let CalculationOutcome::Refinance(r) = &out.result else {
        panic!("Expected refinance outcome, got {:?}", out.result);
    };
    assert_eq!(r.remaining_term_years, 25);
}

#[test]
fn test_refinance_sub_one_percent_text_rate() {
    let out = calculate(&refinance_answers("0.99", serde_json::json!(25)));
    let CalculationOutcome::Refinance(r) = &out.result else {
        panic!("Expected refinance outcome, got {:?}", out.result);
    };
    assert_eq!(r.current_rate, dec!(0.0099));
    assert!(r.monthly_savings < Decimal::ZERO);
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn test_refinance_millennium_term_is_rejected() {
    let out = calculate(&refinance_answers("6.5", serde_json::json!(1000)));
    assert_eq!(out.status, CalculationStatus::Rejected);
    assert_eq!(out.issues[0].code, IssueCode::IncompleteScenario);
    assert_eq!(out.issues[0].field.as_deref(), Some("refinance.remaining_term_years"));
}

#[test]
fn test_refinance_without_details_is_rejected() {
    let snapshot = ApplicationSnapshot {
        loan_goal: LoanGoal::Refinancing,
        refinance: Some(RefinanceDetails::default()),
        ..Default::default()
    };
    let out = calculate(&snapshot);
    assert_eq!(out.status, CalculationStatus::Rejected);
    assert_eq!(out.issues[0].code, IssueCode::IncompleteScenario);
    assert_eq!(out.result, CalculationOutcome::zero(ScenarioKind::Refinance));
}

#[test]
fn test_investment_uses_investor_rate() {
    let mut snapshot = couple_in_melbourne();
    snapshot.buying_reason = Some(BuyingReason::ToInvest);
    snapshot.investment = Some(InvestmentDetails {
        expected_weekly_rent: Some("650".into()),
        property_type: None,
    });

    let out = calculate(&snapshot);
    let CalculationOutcome::Investment(i) = &out.result else {
        panic!("Expected investment outcome, got {:?}", out.result);
    };
    assert_eq!(i.purchase.affordability.annual_rate, dec!(0.0648));
    assert_eq!(i.monthly_rent, dec!(650) * dec!(52) / dec!(12));
    assert!(i.gross_yield.is_some());
}

#[test]
fn test_outcome_serializes_with_scenario_tag() {
    let out = calculate(&couple_in_melbourne());
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["status"], "complete");
    assert_eq!(json["result"]["scenario"], "purchase");
    assert_eq!(
        json["result"]["affordability"]["binding_constraint"],
        "serviceability"
    );
    assert_eq!(json["metadata"]["precision"], "rust_decimal_128bit");
}

#[test]
fn test_session_restarts_on_purpose_change() {
    let mut session = Session::new();
    session.recalculate(&couple_in_melbourne());
    assert_eq!(session.generation(), 0);

    let mut refi = couple_in_melbourne();
    refi.loan_goal = LoanGoal::Refinancing;
    let out = session.recalculate(&refi);
    assert!(out.is_rejected());
    assert_eq!(session.generation(), 1);
    assert_eq!(session.kind(), Some(ScenarioKind::Refinance));
}

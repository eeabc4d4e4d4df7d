use affordability_core::amortization::{monthly_repayment, principal_from_repayment};
use affordability_core::comparison::compare;
use affordability_core::deposit::max_loan_by_deposit;
use affordability_core::income::{normalize_income, Frequency, IncomeEntry};
use affordability_core::policy::{AssessmentSettings, LendingPolicy};
use affordability_core::resolver::resolve;
use affordability_core::scenario::{calculate, ApplicationSnapshot, CalculationOutcome};
use affordability_core::Diagnostics;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn frequency(i: u8) -> Frequency {
    match i % 4 {
        0 => Frequency::Weekly,
        1 => Frequency::Fortnightly,
        2 => Frequency::Monthly,
        _ => Frequency::Annual,
    }
}

fn bp(v: u32) -> Decimal {
    Decimal::from(v) / dec!(10_000)
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(64))]

    #[test]
    fn prop_income_is_linear_and_order_free(
        amounts in proptest::collection::vec((0u32..250_000, any::<u8>()), 0..5),
        k in 1u32..5
    ) {
        let entries: Vec<IncomeEntry> = amounts
            .iter()
            .map(|(a, f)| IncomeEntry::new(Decimal::from(*a), frequency(*f)))
            .collect();
        let scaled: Vec<IncomeEntry> = amounts
            .iter()
            .map(|(a, f)| IncomeEntry::new(Decimal::from(*a) * Decimal::from(k), frequency(*f)))
            .collect();
        let mut reversed = entries.clone();
        reversed.reverse();

        let mut diag = Diagnostics::new();
        let base = normalize_income(&entries, &mut diag).annual_total;
        let times_k = normalize_income(&scaled, &mut diag).annual_total;
        let permuted = normalize_income(&reversed, &mut diag).annual_total;

        prop_assert_eq!(times_k, base * Decimal::from(k));
        prop_assert_eq!(permuted, base);
        prop_assert!(diag.issues().is_empty());
    }

    #[test]
    fn prop_deposit_ceiling_matches_formula_and_is_monotone(
        deposit in 0u32..500_000,
        extra in 0u32..100_000,
        lvr_bp in 100u32..9_900,
        lvr_step in 0u32..50
    ) {
        let deposit = Decimal::from(deposit);
        let lvr = bp(lvr_bp);
        let ceiling = max_loan_by_deposit(deposit, lvr).unwrap();
        prop_assert_eq!(ceiling, deposit * lvr / (Decimal::ONE - lvr));

        let more_deposit = max_loan_by_deposit(deposit + Decimal::from(extra), lvr).unwrap();
        prop_assert!(more_deposit >= ceiling);

        let higher_lvr = bp((lvr_bp + lvr_step).min(9_899));
        if higher_lvr >= lvr {
            prop_assert!(max_loan_by_deposit(deposit, higher_lvr).unwrap() >= ceiling);
        }
    }

    #[test]
    fn prop_resolved_loan_respects_both_ceilings(
        serviceability in 0u32..3_000_000,
        deposit_ceiling in 0u32..3_000_000,
        deposit in 0u32..500_000
    ) {
        let s = Decimal::from(serviceability);
        let d = Decimal::from(deposit_ceiling);
        let r = resolve(s, d, Decimal::from(deposit));
        prop_assert!(r.max_loan_amount <= s);
        prop_assert!(r.max_loan_amount <= d);
        prop_assert_eq!(r.max_loan_amount, s.min(d));
        prop_assert_eq!(r.max_property_value, r.max_loan_amount + Decimal::from(deposit));
    }

    #[test]
    fn prop_annuity_round_trip(
        principal in 1_000u32..2_000_000,
        rate_bp in 1u32..1_500,
        term in 1u32..41
    ) {
        let principal = Decimal::from(principal);
        let rate = bp(rate_bp);
        let pmt = monthly_repayment(principal, rate, term).unwrap();
        let back = principal_from_repayment(pmt, rate, term).unwrap();
        prop_assert!((back - principal).abs() < dec!(0.01), "principal {} came back as {}", principal, back);
    }

    #[test]
    fn prop_zero_rate_divides_exactly(principal in 0u32..2_000_000, term in 1u32..41) {
        let principal = Decimal::from(principal);
        let pmt = monthly_repayment(principal, Decimal::ZERO, term).unwrap();
        prop_assert_eq!(pmt, principal / Decimal::from(12 * term));
    }

    #[test]
    fn prop_higher_lvr_never_lends_less(
        income in 0u32..400_000,
        expenses in 0u32..6_000,
        deposit in 0u32..300_000,
        rate_bp in 200u32..1_200
    ) {
        let rate = bp(rate_bp);
        let subject = LendingPolicy::new("subject", dec!(0.98), rate, 30);
        let reference = LendingPolicy::new("reference", dec!(0.80), rate, 30);
        let r = compare(
            Decimal::from(income),
            Decimal::from(expenses),
            Decimal::from(deposit),
            &subject,
            &reference,
            &AssessmentSettings::default(),
        )
        .unwrap();
        prop_assert!(r.subject_loan >= r.reference_loan);
        prop_assert!(r.delta >= Decimal::ZERO);
    }

    #[test]
    fn prop_refinance_never_panics_on_term_or_income(
        term in any::<u32>(),
        weekly in "[0-9]{1,29}"
    ) {
        let snapshot: ApplicationSnapshot = serde_json::from_value(serde_json::json!({
            "loan_goal": "refinancing",
            "incomes": [{"amount": weekly, "frequency": "weekly"}],
            "refinance": {
                "current_balance": 400000,
                "current_rate": "6.2",
                "remaining_term_years": term,
                "property_value": 700000
            }
        }))
        .unwrap();
        let out = calculate(&snapshot);
        if term == 0 || term > 50 {
            prop_assert!(out.is_rejected());
        } else {
            let is_refinance = matches!(out.result, CalculationOutcome::Refinance(_));
            prop_assert!(is_refinance);
            prop_assert!(!out.is_rejected());
        }
    }
}

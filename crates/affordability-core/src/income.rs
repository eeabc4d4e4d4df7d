use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::Diagnostics;
use crate::input::{checked_add, checked_mul, parse_optional_amount, AmountField};
use crate::types::Money;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How often an income or expense figure recurs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Fortnightly,
    Monthly,
    #[default]
    #[serde(alias = "yearly", alias = "annually")]
    Annual,
}

impl Frequency {
    pub fn periods_per_year(self) -> Decimal {
        match self {
            Frequency::Weekly => dec!(52),
            Frequency::Fortnightly => dec!(26),
            Frequency::Monthly => dec!(12),
            Frequency::Annual => Decimal::ONE,
        }
    }

    pub fn annualise(self, amount: Money) -> Money {
        amount * self.periods_per_year()
    }

    pub fn to_monthly(self, amount: Money) -> Money {
        match self {
            Frequency::Monthly => amount,
            other => other.annualise(amount) / dec!(12),
        }
    }
}

/// One applicant's income as entered in the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeEntry {
    #[serde(default)]
    pub amount: Option<AmountField>,
    #[serde(default)]
    pub frequency: Frequency,
}

impl IncomeEntry {
    pub fn new(amount: Money, frequency: Frequency) -> Self {
        IncomeEntry {
            amount: Some(AmountField::Number(amount)),
            frequency,
        }
    }
}

/// Household income on a canonical annual basis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeSummary {
    pub annual_total: Money,
    pub monthly_total: Money,
    /// Annualised contribution of each entry, in input order.
    pub annualised_entries: Vec<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Annualise and sum every applicant's income.
///
/// Missing or unparseable entries contribute zero and are flagged on `diag`
/// so the figure stays usable while the form is incomplete.
pub fn normalize_income(entries: &[IncomeEntry], diag: &mut Diagnostics) -> IncomeSummary {
    let annualised_entries: Vec<Money> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let field = format!("incomes[{i}].amount");
            let annualised = parse_optional_amount(&field, entry.amount.as_ref())
                .and_then(|amount| checked_mul(&field, amount, entry.frequency.periods_per_year()));
            diag.money_or_zero(annualised)
        })
        .collect();

    let annual_total = annualised_entries
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| checked_add("incomes", acc, *v));
    let annual_total = diag.money_or_zero(annual_total);

    IncomeSummary {
        annual_total,
        monthly_total: annual_total / dec!(12),
        annualised_entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssueCode;

    #[test]
    fn test_frequency_multipliers() {
        assert_eq!(Frequency::Weekly.annualise(dec!(1000)), dec!(52000));
        assert_eq!(Frequency::Fortnightly.annualise(dec!(1000)), dec!(26000));
        assert_eq!(Frequency::Monthly.annualise(dec!(1000)), dec!(12000));
        assert_eq!(Frequency::Annual.annualise(dec!(1000)), dec!(1000));
    }

    #[test]
    fn test_weekly_to_monthly() {
        // 600/wk * 52 / 12
        assert_eq!(Frequency::Weekly.to_monthly(dec!(600)), dec!(2600));
        assert_eq!(Frequency::Monthly.to_monthly(dec!(600)), dec!(600));
    }

    #[test]
    fn test_joint_applicants_summed() {
        let entries = vec![
            IncomeEntry::new(dec!(90_000), Frequency::Annual),
            IncomeEntry::new(dec!(2_000), Frequency::Fortnightly),
        ];
        let mut diag = Diagnostics::new();
        let summary = normalize_income(&entries, &mut diag);
        assert_eq!(summary.annual_total, dec!(142_000));
        assert_eq!(summary.annualised_entries, vec![dec!(90_000), dec!(52_000)]);
        assert!(diag.issues().is_empty());
    }

    #[test]
    fn test_missing_entry_contributes_zero_and_flags() {
        let entries = vec![
            IncomeEntry::new(dec!(60_000), Frequency::Annual),
            IncomeEntry {
                amount: None,
                frequency: Frequency::Annual,
            },
            IncomeEntry {
                amount: Some(AmountField::from("n/a")),
                frequency: Frequency::Weekly,
            },
        ];
        let mut diag = Diagnostics::new();
        let summary = normalize_income(&entries, &mut diag);
        assert_eq!(summary.annual_total, dec!(60_000));
        assert_eq!(diag.issues().len(), 2);
        assert!(diag
            .issues()
            .iter()
            .all(|i| i.code == IssueCode::InvalidNumericInput));
        assert_eq!(diag.issues()[1].field.as_deref(), Some("incomes[2].amount"));
    }

    #[test]
    fn test_oversized_weekly_income_flagged_not_panicking() {
        let entries = vec![
            IncomeEntry::new(dec!(80_000), Frequency::Annual),
            IncomeEntry {
                amount: Some(AmountField::from("9999999999999999999999999999")),
                frequency: Frequency::Weekly,
            },
        ];
        let mut diag = Diagnostics::new();
        let summary = normalize_income(&entries, &mut diag);
        assert_eq!(summary.annual_total, dec!(80_000));
        assert_eq!(diag.issues().len(), 1);
        assert_eq!(diag.issues()[0].code, IssueCode::InvalidNumericInput);
        assert_eq!(diag.issues()[0].field.as_deref(), Some("incomes[1].amount"));
    }

    #[test]
    fn test_empty_list_is_zero() {
        let mut diag = Diagnostics::new();
        let summary = normalize_income(&[], &mut diag);
        assert_eq!(summary.annual_total, Decimal::ZERO);
        assert_eq!(summary.monthly_total, Decimal::ZERO);
    }

    #[test]
    fn test_frequency_deserializes_from_wizard_values() {
        let f: Frequency = serde_json::from_str("\"weekly\"").unwrap();
        assert_eq!(f, Frequency::Weekly);
        let f: Frequency = serde_json::from_str("\"yearly\"").unwrap();
        assert_eq!(f, Frequency::Annual);
        let entry: IncomeEntry = serde_json::from_str(r#"{"amount": "85000"}"#).unwrap();
        assert_eq!(entry.frequency, Frequency::Annual);
    }
}

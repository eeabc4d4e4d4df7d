use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::Diagnostics;
use crate::income::Frequency;
use crate::input::{parse_amount, AmountField};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};

pub const MAX_DEPENDANTS: u32 = 10;

const CAPITAL_CITIES: [&str; 8] = [
    "sydney",
    "melbourne",
    "brisbane",
    "perth",
    "adelaide",
    "hobart",
    "darwin",
    "canberra",
];

/// Words dropped before matching a locality against `CAPITAL_CITIES`.
const LOCALITY_NOISE: [&str; 10] = [
    "nsw", "vic", "qld", "wa", "sa", "tas", "nt", "act", "city", "cbd",
];

/// Inclusive postcode ranges of the capital-city metropolitan areas.
const CAPITAL_POSTCODES: [(u16, u16); 8] = [
    (2000, 2234), // Sydney
    (2600, 2618), // Canberra
    (3000, 3207), // Melbourne
    (4000, 4207), // Brisbane
    (5000, 5199), // Adelaide
    (6000, 6199), // Perth
    (7000, 7099), // Hobart
    (800, 832),   // Darwin
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Household {
    #[serde(default = "default_adults")]
    pub adult_count: u32,
    #[serde(default)]
    pub dependant_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

fn default_adults() -> u32 {
    1
}

impl Default for Household {
    fn default() -> Self {
        Household {
            adult_count: 1,
            dependant_count: 0,
            location: None,
        }
    }
}

impl Household {
    pub fn new(adult_count: u32, dependant_count: u32, location: Option<&str>) -> Self {
        Household {
            adult_count,
            dependant_count,
            location: location.map(str::to_string),
        }
    }

    pub fn tier(&self) -> HouseholdTier {
        if self.dependant_count > 0 {
            HouseholdTier::Family
        } else if self.adult_count >= 2 {
            HouseholdTier::Couple
        } else {
            HouseholdTier::Single
        }
    }

    /// Clamp counts into the supported range, warning about each adjustment.
    pub fn normalised(&self, diag: &mut Diagnostics) -> Household {
        let mut out = self.clone();
        if out.adult_count == 0 {
            diag.warn("Household must include at least one adult; assuming one.");
            out.adult_count = 1;
        }
        if out.dependant_count > MAX_DEPENDANTS {
            diag.warn(format!(
                "{} dependants exceeds the supported maximum; capped at {MAX_DEPENDANTS}.",
                out.dependant_count
            ));
            out.dependant_count = MAX_DEPENDANTS;
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseholdTier {
    #[default]
    Single,
    Couple,
    Family,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationClass {
    Capital,
    Regional,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseSource {
    #[default]
    Benchmark,
    Override,
}

/// Living expenses the applicant entered themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseOverride {
    pub amount: AmountField,
    /// Defaults to monthly when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
}

impl ExpenseOverride {
    pub fn monthly(amount: Money) -> Self {
        ExpenseOverride {
            amount: AmountField::Number(amount),
            frequency: Some(Frequency::Monthly),
        }
    }
}

/// How the benchmark figure was built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkBreakdown {
    pub tier: HouseholdTier,
    pub base: Money,
    pub dependant_loading: Money,
    pub location_class: LocationClass,
    pub location_multiplier: Rate,
    pub monthly_amount: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseProfile {
    pub monthly_amount: Money,
    pub source: ExpenseSource,
    pub benchmark: BenchmarkBreakdown,
}

/// Household-expenditure benchmark keyed by household composition and location.
pub trait ExpenseBenchmark {
    fn monthly_benchmark(&self, household: &Household) -> BenchmarkBreakdown;
}

/// Coarse three-tier benchmark table (monthly amounts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTable {
    pub single: Money,
    pub couple: Money,
    pub family: Money,
    pub per_dependant: Money,
    pub capital_multiplier: Rate,
    pub regional_multiplier: Rate,
}

impl Default for BenchmarkTable {
    fn default() -> Self {
        BenchmarkTable {
            single: dec!(1600),
            couple: dec!(2400),
            family: dec!(2900),
            per_dependant: dec!(450),
            capital_multiplier: dec!(1.10),
            regional_multiplier: dec!(1.00),
        }
    }
}

impl ExpenseBenchmark for BenchmarkTable {
    fn monthly_benchmark(&self, household: &Household) -> BenchmarkBreakdown {
        let tier = household.tier();
        let base = match tier {
            HouseholdTier::Single => self.single,
            HouseholdTier::Couple => self.couple,
            HouseholdTier::Family => self.family,
        };
        let dependant_loading = self.per_dependant * Decimal::from(household.dependant_count);
        let location_class = classify_location(household.location.as_deref());
        // Unknown locations take the capital loading.
        let location_multiplier = match location_class {
            LocationClass::Capital | LocationClass::Unknown => self.capital_multiplier,
            LocationClass::Regional => self.regional_multiplier,
        };

        BenchmarkBreakdown {
            tier,
            base,
            dependant_loading,
            location_class,
            location_multiplier,
            monthly_amount: (base + dependant_loading) * location_multiplier,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Classify free-text location as capital-city metro or regional.
///
/// A postcode decides when present. Otherwise the locality, stripped of state
/// codes and "city"/"cbd", must be exactly a capital's name.
pub fn classify_location(location: Option<&str>) -> LocationClass {
    let Some(text) = location.map(str::trim).filter(|t| !t.is_empty()) else {
        return LocationClass::Unknown;
    };

    if let Some(pc) = extract_postcode(text) {
        return if CAPITAL_POSTCODES.iter().any(|(lo, hi)| (*lo..=*hi).contains(&pc)) {
            LocationClass::Capital
        } else {
            LocationClass::Regional
        };
    }

    let lower = text.to_lowercase();
    let locality: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !LOCALITY_NOISE.contains(w))
        .collect();
    if let [name] = locality.as_slice() {
        if CAPITAL_CITIES.contains(name) {
            return LocationClass::Capital;
        }
    }
    LocationClass::Regional
}

/// Estimate monthly living expenses using the default benchmark table.
pub fn estimate_expenses(
    household: &Household,
    expense_override: Option<&ExpenseOverride>,
    diag: &mut Diagnostics,
) -> ExpenseProfile {
    estimate_expenses_with(&BenchmarkTable::default(), household, expense_override, diag)
}

/// Estimate monthly living expenses against a supplied benchmark.
///
/// A positive override wins verbatim; otherwise the benchmark applies.
pub fn estimate_expenses_with(
    benchmark: &impl ExpenseBenchmark,
    household: &Household,
    expense_override: Option<&ExpenseOverride>,
    diag: &mut Diagnostics,
) -> ExpenseProfile {
    let household = household.normalised(diag);
    let breakdown = benchmark.monthly_benchmark(&household);

    let declared = expense_override.map(|o| {
        let amount = diag.money_or_zero(parse_amount("expense_override.amount", &o.amount));
        o.frequency.unwrap_or(Frequency::Monthly).to_monthly(amount)
    });

    match declared {
        Some(monthly) if monthly > Decimal::ZERO => {
            if monthly < breakdown.monthly_amount {
                diag.warn(format!(
                    "Declared expenses ({}) are below the household benchmark ({}); lenders may assess at the benchmark.",
                    monthly.round_dp(2),
                    breakdown.monthly_amount.round_dp(2)
                ));
            }
            ExpenseProfile {
                monthly_amount: monthly,
                source: ExpenseSource::Override,
                benchmark: breakdown,
            }
        }
        _ => ExpenseProfile {
            monthly_amount: breakdown.monthly_amount,
            source: ExpenseSource::Benchmark,
            benchmark: breakdown,
        },
    }
}

/// Stand-alone expense request used by the CLI and the bindings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseRequest {
    #[serde(default)]
    pub household: Household,
    #[serde(default)]
    pub expense_override: Option<ExpenseOverride>,
    #[serde(default)]
    pub benchmark: BenchmarkTable,
}

pub fn assess_expenses(request: &ExpenseRequest) -> ComputationOutput<ExpenseProfile> {
    let start = Instant::now();
    let mut diag = Diagnostics::new();
    let profile = estimate_expenses_with(
        &request.benchmark,
        &request.household,
        request.expense_override.as_ref(),
        &mut diag,
    );
    let (issues, warnings) = diag.into_parts();
    with_metadata(
        "Household expenditure benchmark by composition and location",
        &request.benchmark,
        issues,
        warnings,
        start.elapsed().as_micros() as u64,
        profile,
    )
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Last four-digit run in the text, e.g. "Bondi, NSW 2026" -> 2026.
fn extract_postcode(text: &str) -> Option<u16> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|tok| tok.len() == 4)
        .last()
        .and_then(|tok| tok.parse().ok())
}

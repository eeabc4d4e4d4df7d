use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::Instant;

use affordability_core::amortization::{self, RepaymentPreference};
use affordability_core::deposit::{effective_lvr, max_loan_by_deposit};
use affordability_core::expenses::{self, ExpenseOverride, ExpenseRequest, Household};
use affordability_core::income::Frequency;
use affordability_core::policy::{PolicyPreset, DEFAULT_TERM_YEARS};
use affordability_core::serviceability::serviceability_breakdown;
use affordability_core::types::with_metadata;

use super::rate_flag;
use crate::config::PolicyFile;
use crate::input;

/// Arguments for the expense benchmark
#[derive(Args)]
pub struct ExpensesArgs {
    /// Path to JSON expense request (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Adults in the household
    #[arg(long, default_value_t = 1)]
    pub adults: u32,

    /// Dependent children
    #[arg(long, default_value_t = 0)]
    pub dependants: u32,

    /// Suburb, city or postcode
    #[arg(long)]
    pub location: Option<String>,

    /// Declared living expenses (replaces the benchmark when positive)
    #[arg(long)]
    pub declared: Option<Decimal>,

    /// Frequency of --declared
    #[arg(long, default_value = "monthly")]
    pub declared_frequency: String,
}

/// Arguments for the serviceability ceiling
#[derive(Args)]
pub struct ServiceabilityArgs {
    /// Gross annual household income
    #[arg(long)]
    pub annual_income: Decimal,

    /// Monthly living expenses
    #[arg(long)]
    pub monthly_expenses: Decimal,

    /// Assessment rate; defaults to the subject policy rate
    #[arg(long)]
    pub rate: Option<String>,

    /// Share of gross income available for repayments; defaults to the configured ratio
    #[arg(long)]
    pub ratio: Option<Decimal>,
}

/// Arguments for the deposit/LVR ceiling
#[derive(Args)]
pub struct DepositCeilingArgs {
    /// Deposit available
    #[arg(long)]
    pub deposit: Decimal,

    /// Maximum loan-to-value ratio (e.g. 0.95)
    #[arg(long, conflicts_with = "preset")]
    pub max_lvr: Option<Decimal>,

    /// Policy preset to take the LVR from (e.g. conventional@2024.1)
    #[arg(long)]
    pub preset: Option<String>,
}

/// Arguments shared by `repayment` and `schedule`
#[derive(Args)]
pub struct RepaymentArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Decimal,

    /// Annual rate ("6.5", "6.5%" or "0.065")
    #[arg(long)]
    pub rate: String,

    /// Term in years; overrides --preference
    #[arg(long)]
    pub term: Option<u32>,

    /// Repayment preference used to pick the term
    #[arg(long)]
    pub preference: Option<String>,
}

pub type ScheduleArgs = RepaymentArgs;

pub fn run_expenses(args: ExpensesArgs, policy: &PolicyFile) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ExpenseRequest = match input::read_input(args.input.as_deref())? {
        Some(r) => r,
        None => {
            let expense_override = match args.declared {
                Some(amount) => {
                    let frequency: Frequency =
                        serde_json::from_value(Value::String(args.declared_frequency.clone()))
                            .map_err(|_| {
                                format!("unknown --declared-frequency '{}'", args.declared_frequency)
                            })?;
                    Some(ExpenseOverride {
                        amount: amount.into(),
                        frequency: Some(frequency),
                    })
                }
                None => None,
            };
            ExpenseRequest {
                household: Household::new(args.adults, args.dependants, args.location.as_deref()),
                expense_override,
                benchmark: policy.settings().benchmark,
            }
        }
    };
    let result = expenses::assess_expenses(&request);
    Ok(serde_json::to_value(result)?)
}

pub fn run_serviceability(
    args: ServiceabilityArgs,
    policy: &PolicyFile,
) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let annual_rate = match args.rate.as_deref() {
        Some(raw) => rate_flag("rate", raw)?,
        None => policy.policies().subject.annual_rate,
    };
    let ratio = args.ratio.unwrap_or(policy.settings().serviceability_ratio);

    let breakdown = serviceability_breakdown(args.annual_income, args.monthly_expenses, annual_rate, ratio)?;
    let result = with_metadata(
        "Serviceability: (income/12 x ratio - expenses) x 12 / rate",
        &json!({
            "annual_rate": annual_rate.to_string(),
            "serviceability_ratio": ratio.to_string(),
        }),
        Vec::new(),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        breakdown,
    );
    Ok(serde_json::to_value(result)?)
}

pub fn run_deposit_ceiling(
    args: DepositCeilingArgs,
    policy: &PolicyFile,
) -> Result<Value, Box<dyn std::error::Error>> {
    let (max_lvr, source) = match (args.max_lvr, args.preset.as_deref()) {
        (Some(lvr), _) => (lvr, "--max-lvr".to_string()),
        (None, Some(id)) => {
            let preset = PolicyPreset::from_id(id).ok_or_else(|| format!("unknown preset '{id}'"))?;
            (preset.policy().max_lvr, preset.to_string())
        }
        (None, None) => {
            let subject = policy.policies().subject;
            (subject.max_lvr, subject.label())
        }
    };

    let max_loan = max_loan_by_deposit(args.deposit, max_lvr)?;
    let max_property_value = max_loan + args.deposit;
    Ok(json!({
        "deposit": args.deposit,
        "max_lvr": max_lvr,
        "lvr_source": source,
        "max_loan": max_loan,
        "max_property_value": max_property_value,
        "effective_lvr": effective_lvr(max_loan, max_property_value),
    }))
}

pub fn run_repayment(args: RepaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (annual_rate, term_years) = repayment_terms(&args)?;
    let monthly = amortization::monthly_repayment(args.principal, annual_rate, term_years)?;
    let interest = amortization::total_interest(args.principal, annual_rate, term_years)?;
    Ok(json!({
        "principal": args.principal,
        "annual_rate": annual_rate,
        "term_years": term_years,
        "monthly_repayment": monthly.round_dp(2),
        "total_interest": interest.round_dp(2),
        "total_repaid": (args.principal + interest).round_dp(2),
    }))
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (annual_rate, term_years) = repayment_terms(&args)?;
    let schedule = amortization::amortization_schedule(args.principal, annual_rate, term_years)?;
    let rows: Vec<Value> = schedule
        .iter()
        .map(|y| {
            json!({
                "year": y.year,
                "opening_balance": y.opening_balance.round_dp(2),
                "interest": y.interest.round_dp(2),
                "principal": y.principal.round_dp(2),
                "closing_balance": y.closing_balance.round_dp(2),
            })
        })
        .collect();
    Ok(Value::Array(rows))
}

fn repayment_terms(args: &RepaymentArgs) -> Result<(Decimal, u32), Box<dyn std::error::Error>> {
    let annual_rate = rate_flag("rate", &args.rate)?;
    let term_years = match (args.term, args.preference.as_deref()) {
        (Some(term), _) => term,
        (None, Some(raw)) => {
            let preference: RepaymentPreference = serde_json::from_value(Value::String(raw.to_string()))
                .map_err(|_| format!("unknown --preference '{raw}'"))?;
            amortization::term_for_preference(preference, DEFAULT_TERM_YEARS)
        }
        (None, None) => DEFAULT_TERM_YEARS,
    };
    Ok((annual_rate, term_years))
}
